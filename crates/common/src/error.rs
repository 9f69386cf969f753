//! Shared error taxonomy for the keeper.
//!
//! One variant per named error kind from the spec's error taxonomy, so
//! callers (the REST layer, the synchronizer) can match on kind instead
//! of string-sniffing.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeeperError {
    // -- Validation --
    #[error("login is invalid")]
    LoginInvalid,
    #[error("password is invalid")]
    PasswordInvalid,
    #[error("record id is not valid")]
    BadId,
    #[error("payload too large")]
    PayloadTooLarge,

    // -- Auth --
    #[error("authentication failed")]
    AuthFailed,
    #[error("token is invalid")]
    TokenInvalid,
    #[error("token has expired")]
    TokenExpired,

    // -- Conflict --
    #[error("login already taken")]
    LoginTaken,

    // -- Not found --
    #[error("record not found")]
    NotFound,

    // -- Crypto --
    #[error("encryption key has the wrong length")]
    BadKey,
    #[error("ciphertext is shorter than the IV")]
    CiphertextTooShort,
    #[error("ciphertext is corrupt")]
    CorruptCiphertext,
    #[error("failed to draw random bytes")]
    CsprngFailure,
    #[error("password exceeds the maximum length")]
    PasswordTooLong,

    // -- Serialization --
    #[error("record is corrupt: {0}")]
    CorruptRecord(String),
    #[error("local index is corrupt: {0}")]
    CorruptIndex(String),
    #[error("token claim value is not a string")]
    NonStringClaim,

    // -- IO --
    #[error("store operation failed: {0}")]
    StoreFailure(String),
    #[error("network request failed: {0}")]
    NetworkFailure(String),
    #[error("file exceeds maximum upload size")]
    FileTooLarge,

    // -- Cancelled --
    #[error("operation was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, KeeperError>;
