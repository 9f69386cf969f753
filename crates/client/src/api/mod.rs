//! Typed, record-kind-specific events the UI drives: New/Get/Edit/Delete
//! per kind, plus the auth events that open and close the local store.

use std::path::Path;
use std::sync::Arc;

use common::types::{Binary, Card, DataType, LocalMetaItem, Password, Text};
use common::KeeperError;

use crate::store::LocalStore;
use crate::transport::ServerTransport;

pub struct ClientApi {
    store: LocalStore,
    transport: Arc<dyn ServerTransport>,
    token: Option<String>,
}

impl ClientApi {
    pub fn new(store: LocalStore, transport: Arc<dyn ServerTransport>) -> Self {
        Self {
            store,
            transport,
            token: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn store_mut(&mut self) -> &mut LocalStore {
        &mut self.store
    }

    pub async fn registration(
        &self,
        login: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<(), KeeperError> {
        if password != password_confirm {
            return Err(KeeperError::PasswordInvalid);
        }
        self.transport.register(login, password).await
    }

    /// On success, opens the local store under `login`.
    pub async fn authorization(&mut self, login: &str, password: &str) -> Result<(), KeeperError> {
        let token = self.transport.login(login, password).await?;
        self.store.open(login)?;
        self.token = Some(token);
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), KeeperError> {
        if self.token.is_none() {
            return Ok(());
        }
        self.store.close()?;
        self.token = None;
        Ok(())
    }

    pub fn get_meta_datas(&self) -> &[LocalMetaItem] {
        self.store.get_all()
    }

    fn bump(&mut self, local_id: i64, title: String) -> Result<LocalMetaItem, KeeperError> {
        let mut meta = self.store.get(local_id)?.clone();
        meta.title = title;
        meta.update_dt = chrono::Utc::now().timestamp();
        Ok(meta)
    }

    fn delete(&mut self, local_id: i64) -> Result<(), KeeperError> {
        self.store.del_data(local_id)
    }

    // -- Card --

    pub fn new_card(&mut self, title: &str, card: &Card) -> Result<LocalMetaItem, KeeperError> {
        let body = serde_json::to_vec(card).map_err(|e| KeeperError::CorruptRecord(e.to_string()))?;
        self.store
            .new_data(0, 0, title.to_string(), DataType::Card, String::new(), &body)
    }

    pub fn get_card(&self, local_id: i64) -> Result<Card, KeeperError> {
        let (_, data) = self.store.get_data(local_id)?;
        serde_json::from_slice(&data).map_err(|e| KeeperError::CorruptRecord(e.to_string()))
    }

    pub fn edit_card(&mut self, local_id: i64, title: &str, card: &Card) -> Result<(), KeeperError> {
        let meta = self.bump(local_id, title.to_string())?;
        let body = serde_json::to_vec(card).map_err(|e| KeeperError::CorruptRecord(e.to_string()))?;
        self.store.edit_data(meta, &body)
    }

    pub fn delete_card(&mut self, local_id: i64) -> Result<(), KeeperError> {
        self.delete(local_id)
    }

    // -- Text --

    pub fn new_text(&mut self, title: &str, text: &Text) -> Result<LocalMetaItem, KeeperError> {
        let body = serde_json::to_vec(text).map_err(|e| KeeperError::CorruptRecord(e.to_string()))?;
        self.store
            .new_data(0, 0, title.to_string(), DataType::Text, String::new(), &body)
    }

    pub fn get_text(&self, local_id: i64) -> Result<Text, KeeperError> {
        let (_, data) = self.store.get_data(local_id)?;
        serde_json::from_slice(&data).map_err(|e| KeeperError::CorruptRecord(e.to_string()))
    }

    pub fn edit_text(&mut self, local_id: i64, title: &str, text: &Text) -> Result<(), KeeperError> {
        let meta = self.bump(local_id, title.to_string())?;
        let body = serde_json::to_vec(text).map_err(|e| KeeperError::CorruptRecord(e.to_string()))?;
        self.store.edit_data(meta, &body)
    }

    pub fn delete_text(&mut self, local_id: i64) -> Result<(), KeeperError> {
        self.delete(local_id)
    }

    // -- Password --

    pub fn new_password(&mut self, title: &str, password: &Password) -> Result<LocalMetaItem, KeeperError> {
        let body =
            serde_json::to_vec(password).map_err(|e| KeeperError::CorruptRecord(e.to_string()))?;
        self.store
            .new_data(0, 0, title.to_string(), DataType::Password, String::new(), &body)
    }

    pub fn get_password(&self, local_id: i64) -> Result<Password, KeeperError> {
        let (_, data) = self.store.get_data(local_id)?;
        serde_json::from_slice(&data).map_err(|e| KeeperError::CorruptRecord(e.to_string()))
    }

    pub fn edit_password(
        &mut self,
        local_id: i64,
        title: &str,
        password: &Password,
    ) -> Result<(), KeeperError> {
        let meta = self.bump(local_id, title.to_string())?;
        let body =
            serde_json::to_vec(password).map_err(|e| KeeperError::CorruptRecord(e.to_string()))?;
        self.store.edit_data(meta, &body)
    }

    pub fn delete_password(&mut self, local_id: i64) -> Result<(), KeeperError> {
        self.delete(local_id)
    }

    // -- Binary (file) --

    pub fn new_file(
        &mut self,
        title: &str,
        source_path: &Path,
        file_max_size: u64,
    ) -> Result<LocalMetaItem, KeeperError> {
        let metadata =
            std::fs::metadata(source_path).map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        if metadata.len() > file_max_size {
            return Err(KeeperError::FileTooLarge);
        }
        let data = std::fs::read(source_path).map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        let filename = source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        self.store
            .new_data(0, 0, title.to_string(), DataType::Binary, filename, &data)
    }

    pub fn get_file(&self, local_id: i64) -> Result<Binary, KeeperError> {
        let meta = self.store.get(local_id)?;
        Ok(Binary {
            title: meta.title.clone(),
            filename: meta.filename.clone(),
        })
    }

    pub fn edit_file(
        &mut self,
        local_id: i64,
        title: &str,
        source_path: &Path,
        file_max_size: u64,
    ) -> Result<(), KeeperError> {
        let metadata =
            std::fs::metadata(source_path).map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        if metadata.len() > file_max_size {
            return Err(KeeperError::FileTooLarge);
        }
        let data = std::fs::read(source_path).map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        let filename = source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut meta = self.bump(local_id, title.to_string())?;
        meta.filename = filename;
        self.store.edit_data(meta, &data)
    }

    pub fn upload_file(&self, local_id: i64, target_dir: &Path) -> Result<(), KeeperError> {
        self.store.upload_file_to_path(local_id, target_dir)
    }

    pub fn delete_file(&mut self, local_id: i64) -> Result<(), KeeperError> {
        self.delete(local_id)
    }
}
