//! SQLite-backed storage adapter: users and secrets tables, idempotent
//! migrations, soft-delete mutation.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use common::types::{DataType, Secret, User};
use common::KeeperError;
use rusqlite::{params, Connection, OptionalExtension};

pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open (or create) the database at `path`, creating the schema if
    /// this is the first run.
    pub fn open(path: &Path) -> Result<Self, KeeperError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                login TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS secrets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                data_type TEXT NOT NULL,
                data BLOB NOT NULL,
                update_dt INTEGER NOT NULL,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .map_err(|e| KeeperError::StoreFailure(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, KeeperError> {
        let conn =
            Connection::open_in_memory().map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        conn.execute_batch(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                login TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE secrets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                data_type TEXT NOT NULL,
                data BLOB NOT NULL,
                update_dt INTEGER NOT NULL,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn register(&self, login: &str, password_hash: &str) -> Result<i64, KeeperError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let result = conn.execute(
            "INSERT INTO users (login, password_hash, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![login, password_hash, now],
        );
        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(KeeperError::LoginTaken)
            }
            Err(e) => Err(KeeperError::StoreFailure(e.to_string())),
        }
    }

    pub fn get_user_by_login(&self, login: &str) -> Result<User, KeeperError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, login, password_hash FROM users WHERE login = ?1",
            params![login],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    login: row.get(1)?,
                    password_hash: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(|e| KeeperError::StoreFailure(e.to_string()))?
        .ok_or(KeeperError::NotFound)
    }

    pub fn list_secrets_by_user(&self, user_id: i64) -> Result<Vec<Secret>, KeeperError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, title, data_type, data, update_dt, is_deleted
                 FROM secrets WHERE user_id = ?1",
            )
            .map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        let rows = stmt
            .query_map(params![user_id], row_to_secret)
            .map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| KeeperError::StoreFailure(e.to_string()))
    }

    pub fn create_secret(&self, mut secret: Secret) -> Result<Secret, KeeperError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO secrets (user_id, title, data_type, data, update_dt, is_deleted, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                secret.user_id,
                secret.title,
                secret.data_type.as_str(),
                secret.data,
                secret.update_dt,
                secret.is_deleted as i64,
                now,
            ],
        )
        .map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        secret.id = conn.last_insert_rowid();
        Ok(secret)
    }

    pub fn get_secret(&self, id: i64) -> Result<Secret, KeeperError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, user_id, title, data_type, data, update_dt, is_deleted
             FROM secrets WHERE id = ?1",
            params![id],
            row_to_secret,
        )
        .optional()
        .map_err(|e| KeeperError::StoreFailure(e.to_string()))?
        .ok_or(KeeperError::NotFound)
    }

    pub fn update_secret(&self, secret: &Secret) -> Result<(), KeeperError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let affected = conn
            .execute(
                "UPDATE secrets SET title = ?1, data_type = ?2, data = ?3, update_dt = ?4,
                 is_deleted = ?5, updated_at = ?6 WHERE id = ?7",
                params![
                    secret.title,
                    secret.data_type.as_str(),
                    secret.data,
                    secret.update_dt,
                    secret.is_deleted as i64,
                    now,
                    secret.id,
                ],
            )
            .map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        if affected == 0 {
            return Err(KeeperError::NotFound);
        }
        Ok(())
    }

    /// Soft-delete: clears the payload, sets the tombstone flag, keeps
    /// the id and title so the record can still be listed and replicated.
    pub fn delete_secret(&self, id: i64) -> Result<(), KeeperError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let affected = conn
            .execute(
                "UPDATE secrets SET data = x'', is_deleted = 1, updated_at = ?1 WHERE id = ?2",
                params![now, id],
            )
            .map_err(|e| KeeperError::StoreFailure(e.to_string()))?;
        if affected == 0 {
            return Err(KeeperError::NotFound);
        }
        Ok(())
    }
}

fn row_to_secret(row: &rusqlite::Row<'_>) -> rusqlite::Result<Secret> {
    let data_type_str: String = row.get(3)?;
    let data_type = parse_data_type(&data_type_str);
    Ok(Secret {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        data_type,
        data: row.get(4)?,
        update_dt: row.get(5)?,
        is_deleted: row.get::<_, i64>(6)? != 0,
    })
}

fn parse_data_type(s: &str) -> DataType {
    match s {
        "CARD" => DataType::Card,
        "PASSWORD" => DataType::Password,
        "TEXT" => DataType::Text,
        _ => DataType::Binary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(user_id: i64, update_dt: i64) -> Secret {
        Secret {
            id: 0,
            user_id,
            title: "visa".into(),
            data_type: DataType::Card,
            data: b"ciphertext".to_vec(),
            update_dt,
            is_deleted: false,
        }
    }

    #[test]
    fn register_and_fetch_user() {
        let storage = Storage::in_memory().unwrap();
        let id = storage.register("alice", "hash").unwrap();
        let user = storage.get_user_by_login("alice").unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.login, "alice");
    }

    #[test]
    fn duplicate_login_rejected() {
        let storage = Storage::in_memory().unwrap();
        storage.register("alice", "hash").unwrap();
        let err = storage.register("alice", "hash2").unwrap_err();
        assert!(matches!(err, KeeperError::LoginTaken));
    }

    #[test]
    fn missing_user_is_not_found() {
        let storage = Storage::in_memory().unwrap();
        let err = storage.get_user_by_login("nobody").unwrap_err();
        assert!(matches!(err, KeeperError::NotFound));
    }

    #[test]
    fn create_list_and_get_secret() {
        let storage = Storage::in_memory().unwrap();
        let uid = storage.register("alice", "hash").unwrap();
        let created = storage.create_secret(secret(uid, 100)).unwrap();
        assert!(created.id > 0);

        let listed = storage.list_secrets_by_user(uid).unwrap();
        assert_eq!(listed.len(), 1);

        let fetched = storage.get_secret(created.id).unwrap();
        assert_eq!(fetched.title, "visa");
    }

    #[test]
    fn delete_secret_is_a_soft_delete() {
        let storage = Storage::in_memory().unwrap();
        let uid = storage.register("alice", "hash").unwrap();
        let created = storage.create_secret(secret(uid, 100)).unwrap();

        storage.delete_secret(created.id).unwrap();
        let fetched = storage.get_secret(created.id).unwrap();
        assert!(fetched.is_deleted);
        assert!(fetched.data.is_empty());
    }

    #[test]
    fn delete_missing_secret_is_not_found() {
        let storage = Storage::in_memory().unwrap();
        let err = storage.delete_secret(999).unwrap_err();
        assert!(matches!(err, KeeperError::NotFound));
    }

    #[test]
    fn list_includes_tombstones() {
        let storage = Storage::in_memory().unwrap();
        let uid = storage.register("alice", "hash").unwrap();
        let created = storage.create_secret(secret(uid, 100)).unwrap();
        storage.delete_secret(created.id).unwrap();

        let listed = storage.list_secrets_by_user(uid).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_deleted);
    }
}
