//! Wire types shared between the server and the client: the record kinds,
//! their fixed-field payloads, and the metadata shapes used to list and
//! transfer them.

use serde::{Deserialize, Serialize};

/// The four payload kinds a secret can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "CARD")]
    Card,
    #[serde(rename = "PASSWORD")]
    Password,
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "BINARY")]
    Binary,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Card => "CARD",
            DataType::Password => "PASSWORD",
            DataType::Text => "TEXT",
            DataType::Binary => "BINARY",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Number")]
    pub number: String,
    #[serde(rename = "PIN")]
    pub pin: String,
    #[serde(rename = "CVV")]
    pub cvv: String,
    #[serde(rename = "Expiry")]
    pub expiry: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Password {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Site")]
    pub site: String,
    #[serde(rename = "Login")]
    pub login: String,
    #[serde(rename = "Password")]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Text")]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binary {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Filename")]
    pub filename: String,
}

/// A record's metadata as the server hands it out for listing: never
/// carries the decrypted payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaDataItem {
    pub id: i64,
    pub title: String,
    pub data_type: DataType,
    pub update_dt: i64,
    pub is_deleted: bool,
}

/// A local record's metadata, including the bookkeeping fields the client
/// needs to reconcile against the server and to locate the blob on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalMetaItem {
    pub local_id: i64,
    pub external_id: i64,
    pub title: String,
    pub data_type: DataType,
    pub original_path: String,
    pub filename: String,
    pub update_dt: i64,
    pub is_deleted: bool,
    pub is_updated: bool,
}

/// A secret as the server stores and transfers it: opaque encrypted (or,
/// once through the keeper, decrypted) bytes plus reconciliation metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub data_type: DataType,
    pub data: Vec<u8>,
    pub update_dt: i64,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub password_hash: String,
}
