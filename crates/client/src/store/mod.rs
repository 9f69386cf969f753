//! Per-user local file store: one JSON index file and one blob file per
//! record, under a single directory. The index is only persisted on
//! [`LocalStore::close`] — a crash between open and close loses the tail
//! of mutations (see design notes on crash safety).

use std::path::{Path, PathBuf};

use common::crypto::{md5_hex, random_string};
use common::types::{DataType, LocalMetaItem};
use common::KeeperError;

const BLOB_SUFFIX_LEN: usize = 20;

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

pub struct LocalStore {
    dir: PathBuf,
    index_filename: String,
    items: Vec<LocalMetaItem>,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            index_filename: String::new(),
            items: Vec::new(),
        }
    }

    fn full_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Ensure the store directory exists, then load (or initialize) the
    /// index for `login`.
    pub fn open(&mut self, login: &str) -> Result<(), KeeperError> {
        self.index_filename = md5_hex(login);
        self.items = Vec::new();

        match std::fs::create_dir(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(KeeperError::StoreFailure(e.to_string())),
        }
        set_mode(&self.dir, 0o755).map_err(|e| KeeperError::StoreFailure(e.to_string()))?;

        let index_path = self.full_path(&self.index_filename);
        if !index_path.exists() {
            std::fs::write(&index_path, b"").map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        }
        set_mode(&index_path, 0o600).map_err(|e| KeeperError::StoreFailure(e.to_string()))?;

        let raw = std::fs::read(&index_path).map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        if raw.is_empty() {
            return Ok(());
        }
        self.items =
            serde_json::from_slice(&raw).map_err(|e| KeeperError::CorruptIndex(e.to_string()))?;
        Ok(())
    }

    /// Persist the in-memory index, then clear it. This is the only point
    /// at which the index file is rewritten.
    pub fn close(&mut self) -> Result<(), KeeperError> {
        self.save()?;
        self.items.clear();
        Ok(())
    }

    fn save(&self) -> Result<(), KeeperError> {
        let bytes = serde_json::to_vec(&self.items)
            .map_err(|e| KeeperError::CorruptIndex(e.to_string()))?;
        let index_path = self.full_path(&self.index_filename);
        std::fs::write(&index_path, bytes).map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        set_mode(&index_path, 0o600).map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        Ok(())
    }

    pub fn get(&self, local_id: i64) -> Result<&LocalMetaItem, KeeperError> {
        self.items
            .iter()
            .find(|m| m.local_id == local_id)
            .ok_or(KeeperError::NotFound)
    }

    pub fn get_all(&self) -> &[LocalMetaItem] {
        &self.items
    }

    pub fn get_data(&self, local_id: i64) -> Result<(LocalMetaItem, Vec<u8>), KeeperError> {
        let meta = self.get(local_id)?.clone();
        let data = self.open_data(&meta.original_path)?;
        Ok((meta, data))
    }

    fn open_data(&self, original_path: &str) -> Result<Vec<u8>, KeeperError> {
        std::fs::read(self.full_path(original_path)).map_err(|e| KeeperError::StoreFailure(e.to_string()))
    }

    fn write_file(&self, filename: &str, data: &[u8]) -> Result<(), KeeperError> {
        let path = self.full_path(filename);
        std::fs::write(&path, data).map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        set_mode(&path, 0o600).map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        Ok(())
    }

    /// Mint a new local record: local id is current microseconds since
    /// epoch, blob filename is the index filename plus a random suffix.
    pub fn new_data(
        &mut self,
        external_id: i64,
        update_dt: i64,
        title: String,
        data_type: DataType,
        filename: String,
        data: &[u8],
    ) -> Result<LocalMetaItem, KeeperError> {
        let original_path = format!("{}{}", self.index_filename, random_string(BLOB_SUFFIX_LEN));
        let local_id = now_micros();
        let update_dt = if update_dt > 0 {
            update_dt
        } else {
            chrono::Utc::now().timestamp()
        };

        self.write_file(&original_path, data)?;

        let meta = LocalMetaItem {
            local_id,
            external_id,
            title,
            data_type,
            original_path,
            filename,
            update_dt,
            is_deleted: false,
            is_updated: false,
        };
        self.items.push(meta.clone());
        Ok(meta)
    }

    /// Rewrite the blob in place and replace the matching metadata entry.
    /// The caller owns bumping `meta.update_dt`.
    pub fn edit_data(&mut self, meta: LocalMetaItem, data: &[u8]) -> Result<(), KeeperError> {
        self.write_file(&meta.original_path, data)?;
        self.upd_meta(meta)
    }

    pub fn upd_meta(&mut self, meta: LocalMetaItem) -> Result<(), KeeperError> {
        match self.items.iter_mut().find(|m| m.local_id == meta.local_id) {
            Some(slot) => {
                *slot = meta;
                Ok(())
            }
            None => Err(KeeperError::NotFound),
        }
    }

    /// Remove the blob file and tombstone the metadata entry; the entry
    /// itself stays in the index so the deletion can be replicated.
    pub fn del_data(&mut self, local_id: i64) -> Result<(), KeeperError> {
        let mut meta = self.get(local_id)?.clone();
        let path = self.full_path(&meta.original_path);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        }
        meta.is_deleted = true;
        self.upd_meta(meta)
    }

    /// Copy a BINARY record's blob out to `target_dir/<filename>`.
    pub fn upload_file_to_path(&self, local_id: i64, target_dir: &Path) -> Result<(), KeeperError> {
        let meta = self.get(local_id)?;
        let src = self.full_path(&meta.original_path);
        let dest = target_dir.join(&meta.filename);
        std::fs::copy(&src, &dest).map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        Ok(())
    }
}

fn now_micros() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}
