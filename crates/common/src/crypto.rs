//! Password hashing, record encryption, and the small hashing/randomness
//! helpers the rest of the keeper leans on.
//!
//! Record encryption intentionally uses AES in CFB (stream) mode over a
//! base64-encoded plaintext with a random 16-byte IV prepended to the
//! ciphertext — this on-disk shape predates this crate and is kept for
//! compatibility rather than chosen fresh.
//!
//! Rejections are logged at `warn` (kind only, never the secret bytes) and
//! the transient base64 buffer is wiped with `zeroize` once decrypt is done
//! with it.

use aes::{Aes128, Aes192, Aes256};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use cfb_mode::{Decryptor, Encryptor};
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use zeroize::Zeroize;

use crate::error::KeeperError;

const IV_LEN: usize = 16;
const BCRYPT_COST: u32 = 14;
/// bcrypt silently ignores bytes past 72; we reject instead of truncating.
const BCRYPT_MAX_PASSWORD_BYTES: usize = 72;

/// Hash a password with bcrypt at cost 14. The returned string is
/// self-describing ($2b$14$<salt><hash>) and verify-only.
pub fn hash_password(password: &str) -> Result<String, KeeperError> {
    if password.as_bytes().len() > BCRYPT_MAX_PASSWORD_BYTES {
        tracing::warn!(len = password.len(), "rejected password exceeding max length");
        return Err(KeeperError::PasswordTooLong);
    }
    bcrypt::hash(password, BCRYPT_COST).map_err(|_| {
        tracing::warn!("bcrypt hash failed");
        KeeperError::StoreFailure("bcrypt hash failed".into())
    })
}

/// Verify a password against a bcrypt hash in constant time.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Encrypt `plaintext` under `key` (16/24/32 bytes). Returns IV || stream(base64(plaintext)).
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, KeeperError> {
    let mut iv = [0u8; IV_LEN];
    rand::rngs::OsRng.try_fill_bytes(&mut iv).map_err(|_| {
        tracing::warn!("CSPRNG failed to fill IV");
        KeeperError::CsprngFailure
    })?;

    let mut body = STANDARD.encode(plaintext).into_bytes();
    apply_cfb(key, &iv, &mut body, true)?;

    let mut out = Vec::with_capacity(IV_LEN + body.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decrypt ciphertext produced by [`encrypt`].
pub fn decrypt(key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, KeeperError> {
    if ciphertext.len() < IV_LEN {
        tracing::warn!(len = ciphertext.len(), "ciphertext shorter than IV");
        return Err(KeeperError::CiphertextTooShort);
    }
    let (iv, body) = ciphertext.split_at(IV_LEN);
    let mut body = body.to_vec();
    apply_cfb(key, iv, &mut body, false)?;

    let decoded = STANDARD.decode(&body).map_err(|_| {
        tracing::warn!("ciphertext failed to decode to base64 after CFB decryption");
        KeeperError::CorruptCiphertext
    });
    body.zeroize();
    decoded
}

fn apply_cfb(key: &[u8], iv: &[u8], buf: &mut [u8], encrypt: bool) -> Result<(), KeeperError> {
    macro_rules! run {
        ($cipher:ty) => {{
            if encrypt {
                let enc = Encryptor::<$cipher>::new_from_slices(key, iv).map_err(|_| KeeperError::BadKey)?;
                enc.encrypt(buf);
            } else {
                let dec = Decryptor::<$cipher>::new_from_slices(key, iv).map_err(|_| KeeperError::BadKey)?;
                dec.decrypt(buf);
            }
        }};
    }

    match key.len() {
        16 => run!(Aes128),
        24 => run!(Aes192),
        32 => run!(Aes256),
        _ => {
            tracing::warn!(len = key.len(), "rejected key of unsupported length");
            return Err(KeeperError::BadKey);
        }
    }
    Ok(())
}

/// Hex MD5 digest, used only to derive a filename from a login.
pub fn md5_hex(text: &str) -> String {
    use md5::{Digest, Md5};
    let mut hasher = Md5::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Uniform random alphanumeric string of length `n`.
pub fn random_string(n: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(n)
        .map(char::from)
        .collect()
}
