//! Compact three-segment signed tokens carrying a flat string→string claim
//! map. This is deliberately a small hand-rolled HMAC scheme rather than a
//! full JWT implementation: the only shape the keeper needs is "sign a
//! claim map, verify it later, reject anything not HMAC-signed."

use std::collections::HashMap;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

use crate::error::KeeperError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            alg: "HS256".into(),
            typ: "JWT".into(),
        }
    }
}

/// Signs and verifies claim-map tokens with a single shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: Vec<u8>,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Sign `claims` and return a compact `header.payload.signature` token.
    pub fn create(&self, claims: &HashMap<String, String>) -> Result<String, KeeperError> {
        let header_b64 = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&Header::default())
                .map_err(|e| KeeperError::CorruptRecord(e.to_string()))?,
        );
        let payload_b64 = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(claims).map_err(|e| KeeperError::CorruptRecord(e.to_string()))?,
        );
        let signing_input = format!("{header_b64}.{payload_b64}");
        let signature = self.sign(signing_input.as_bytes())?;
        let sig_b64 = URL_SAFE_NO_PAD.encode(signature);
        Ok(format!("{signing_input}.{sig_b64}"))
    }

    /// Verify a token's signature and header. Never panics on malformed input.
    pub fn verify(&self, token: &str) -> bool {
        self.split_and_check(token).is_ok()
    }

    /// Verify a token and return its claim map. Every claim value must be a
    /// JSON string or this fails with [`KeeperError::NonStringClaim`].
    pub fn get_params(&self, token: &str) -> Result<HashMap<String, String>, KeeperError> {
        let (_, payload_b64) = self.split_and_check(token)?;
        let payload_bytes = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| KeeperError::TokenInvalid)?;
        let raw: HashMap<String, Value> =
            serde_json::from_slice(&payload_bytes).map_err(|_| KeeperError::TokenInvalid)?;

        let mut claims = HashMap::with_capacity(raw.len());
        for (k, v) in raw {
            match v {
                Value::String(s) => {
                    claims.insert(k, s);
                }
                _ => return Err(KeeperError::NonStringClaim),
            }
        }
        Ok(claims)
    }

    fn split_and_check<'a>(&self, token: &'a str) -> Result<(&'a str, &'a str), KeeperError> {
        let mut parts = token.trim().splitn(3, '.');
        let header_b64 = parts.next().ok_or(KeeperError::TokenInvalid)?;
        let payload_b64 = parts.next().ok_or(KeeperError::TokenInvalid)?;
        let sig_b64 = parts.next().ok_or(KeeperError::TokenInvalid)?;

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| KeeperError::TokenInvalid)?;
        let header: Header =
            serde_json::from_slice(&header_bytes).map_err(|_| KeeperError::TokenInvalid)?;
        if header.alg != "HS256" {
            return Err(KeeperError::TokenInvalid);
        }

        let signing_input = format!("{header_b64}.{payload_b64}");
        let expected = self.sign(signing_input.as_bytes())?;
        let actual = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| KeeperError::TokenInvalid)?;

        // `Mac::verify_slice` is constant-time in the MAC length.
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| KeeperError::TokenInvalid)?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&actual).map_err(|_| KeeperError::TokenInvalid)?;
        let _ = expected; // computed above for clarity; verify_slice does the real check

        Ok((header_b64, payload_b64))
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, KeeperError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| KeeperError::TokenInvalid)?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}
