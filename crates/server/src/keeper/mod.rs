//! The server core: validates credentials, orchestrates auth, and
//! encrypts/decrypts secret payloads around the storage adapter.

use std::sync::Arc;

use chrono::Utc;
use common::types::{DataType, MetaDataItem, Secret, User};
use common::{crypto, KeeperError};

use crate::storage::Storage;

#[derive(Clone)]
pub struct Keeper {
    storage: Arc<Storage>,
    encrypt_key: Vec<u8>,
}

impl Keeper {
    pub fn new(storage: Arc<Storage>, encrypt_key: Vec<u8>) -> Self {
        Self {
            storage,
            encrypt_key,
        }
    }

    /// Hash `password` on a blocking-pool task so CPU-bound bcrypt work
    /// never runs inline on the request dispatcher.
    pub async fn registration(&self, login: String, password: String) -> Result<i64, KeeperError> {
        if login.is_empty() {
            return Err(KeeperError::LoginInvalid);
        }
        if password.is_empty() {
            return Err(KeeperError::PasswordInvalid);
        }

        let hash = tokio::task::spawn_blocking(move || crypto::hash_password(&password))
            .await
            .map_err(|e| KeeperError::StoreFailure(e.to_string()))??;

        self.storage.register(&login, &hash)
    }

    pub async fn login(&self, login: String, password: String) -> Result<User, KeeperError> {
        if login.is_empty() {
            return Err(KeeperError::LoginInvalid);
        }
        if password.is_empty() {
            return Err(KeeperError::PasswordInvalid);
        }

        let user = match self.storage.get_user_by_login(&login) {
            Ok(user) => user,
            Err(KeeperError::NotFound) => return Err(KeeperError::AuthFailed),
            Err(e) => return Err(e),
        };

        let hash = user.password_hash.clone();
        let ok = tokio::task::spawn_blocking(move || crypto::verify_password(&password, &hash))
            .await
            .map_err(|e| KeeperError::StoreFailure(e.to_string()))?;

        if !ok {
            return Err(KeeperError::AuthFailed);
        }
        Ok(user)
    }

    pub fn list_metadata(&self, user_id: i64) -> Result<Vec<MetaDataItem>, KeeperError> {
        let secrets = self.storage.list_secrets_by_user(user_id)?;
        Ok(secrets
            .into_iter()
            .map(|s| MetaDataItem {
                id: s.id,
                title: s.title,
                data_type: s.data_type,
                update_dt: s.update_dt,
                is_deleted: s.is_deleted,
            })
            .collect())
    }

    /// Fetch a secret and decrypt its payload. Decryption failure is fatal
    /// for the request: it indicates key mismatch or on-disk corruption.
    pub fn get_secret(&self, id: i64, user_id: i64) -> Result<Secret, KeeperError> {
        let mut secret = self.storage.get_secret(id)?;
        if secret.user_id != user_id {
            return Err(KeeperError::NotFound);
        }
        if !secret.is_deleted {
            secret.data = crypto::decrypt(&self.encrypt_key, &secret.data)?;
        }
        Ok(secret)
    }

    pub fn create_secret(
        &self,
        user_id: i64,
        title: String,
        data_type: DataType,
        payload: Vec<u8>,
        update_dt: i64,
    ) -> Result<Secret, KeeperError> {
        let update_dt = if update_dt == 0 {
            Utc::now().timestamp()
        } else {
            update_dt
        };
        let ciphertext = crypto::encrypt(&self.encrypt_key, &payload)?;
        let secret = Secret {
            id: 0,
            user_id,
            title,
            data_type,
            data: ciphertext,
            update_dt,
            is_deleted: false,
        };
        self.storage.create_secret(secret)
    }

    /// `update_dt` is taken as given from the caller, with no server
    /// clamp — this is load-bearing for last-writer-wins conflict
    /// resolution on the client.
    pub fn update_secret(
        &self,
        id: i64,
        user_id: i64,
        title: String,
        data_type: DataType,
        payload: Vec<u8>,
        update_dt: i64,
    ) -> Result<(), KeeperError> {
        let existing = self.storage.get_secret(id)?;
        if existing.user_id != user_id {
            return Err(KeeperError::NotFound);
        }
        let ciphertext = crypto::encrypt(&self.encrypt_key, &payload)?;
        let secret = Secret {
            id,
            user_id,
            title,
            data_type,
            data: ciphertext,
            update_dt,
            is_deleted: false,
        };
        self.storage.update_secret(&secret)
    }

    /// Idempotent for the caller: deleting an already-deleted record
    /// still succeeds.
    pub fn delete_secret(&self, id: i64, user_id: i64) -> Result<(), KeeperError> {
        let existing = self.storage.get_secret(id)?;
        if existing.user_id != user_id {
            return Err(KeeperError::NotFound);
        }
        self.storage.delete_secret(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keeper() -> Keeper {
        let storage = Arc::new(Storage::in_memory().unwrap());
        Keeper::new(storage, b"0123456789abcdef".to_vec())
    }

    #[tokio::test]
    async fn registration_and_login_round_trip() {
        let keeper = keeper();
        let uid = keeper
            .registration("alice".into(), "correct horse".into())
            .await
            .unwrap();
        let user = keeper
            .login("alice".into(), "correct horse".into())
            .await
            .unwrap();
        assert_eq!(user.id, uid);
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_auth_failed() {
        let keeper = keeper();
        keeper
            .registration("alice".into(), "correct horse".into())
            .await
            .unwrap();
        let err = keeper
            .login("alice".into(), "wrong".into())
            .await
            .unwrap_err();
        assert!(matches!(err, KeeperError::AuthFailed));
    }

    #[tokio::test]
    async fn login_with_unknown_user_is_auth_failed_not_not_found() {
        let keeper = keeper();
        let err = keeper
            .login("nobody".into(), "whatever".into())
            .await
            .unwrap_err();
        assert!(matches!(err, KeeperError::AuthFailed));
    }

    #[tokio::test]
    async fn duplicate_registration_is_login_taken() {
        let keeper = keeper();
        keeper.registration("alice".into(), "pw".into()).await.unwrap();
        let err = keeper
            .registration("alice".into(), "pw2".into())
            .await
            .unwrap_err();
        assert!(matches!(err, KeeperError::LoginTaken));
    }

    #[tokio::test]
    async fn create_and_get_secret_round_trips_plaintext() {
        let keeper = keeper();
        let uid = keeper.registration("alice".into(), "pw".into()).await.unwrap();
        let created = keeper
            .create_secret(uid, "visa".into(), DataType::Card, b"plaintext".to_vec(), 0)
            .unwrap();
        assert!(created.update_dt > 0);

        let fetched = keeper.get_secret(created.id, uid).unwrap();
        assert_eq!(fetched.data, b"plaintext");
    }

    #[tokio::test]
    async fn delete_then_get_returns_tombstone_not_not_found() {
        let keeper = keeper();
        let uid = keeper.registration("alice".into(), "pw".into()).await.unwrap();
        let created = keeper
            .create_secret(uid, "visa".into(), DataType::Card, b"plaintext".to_vec(), 0)
            .unwrap();

        keeper.delete_secret(created.id, uid).unwrap();
        let fetched = keeper.get_secret(created.id, uid).unwrap();
        assert!(fetched.is_deleted);
        assert!(fetched.data.is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let keeper = keeper();
        let uid = keeper.registration("alice".into(), "pw".into()).await.unwrap();
        let created = keeper
            .create_secret(uid, "visa".into(), DataType::Card, b"plaintext".to_vec(), 0)
            .unwrap();

        keeper.delete_secret(created.id, uid).unwrap();
        keeper.delete_secret(created.id, uid).unwrap();
    }

    #[tokio::test]
    async fn secret_owned_by_another_user_is_not_found() {
        let keeper = keeper();
        let uid = keeper.registration("alice".into(), "pw".into()).await.unwrap();
        let other = keeper.registration("bob".into(), "pw".into()).await.unwrap();
        let created = keeper
            .create_secret(uid, "visa".into(), DataType::Card, b"plaintext".to_vec(), 0)
            .unwrap();

        let err = keeper.get_secret(created.id, other).unwrap_err();
        assert!(matches!(err, KeeperError::NotFound));
    }
}
