//! Request/response bodies for the `/api/v0` surface.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::types::DataType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub status: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ResultErrorResponse {
    pub status: bool,
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: bool,
    pub message: String,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserInfoResponse {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct MetaDataDto {
    pub id: i64,
    pub title: String,
    pub data_type: DataType,
    pub update_dt: i64,
    pub is_deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct GetDatasResponse {
    pub status: bool,
    pub data: Vec<MetaDataDto>,
}

#[derive(Debug, Serialize)]
pub struct SecretDataDto {
    pub id: i64,
    pub title: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    pub data_type: DataType,
    pub update_dt: i64,
}

#[derive(Debug, Serialize)]
pub struct GetDataResponse {
    pub status: bool,
    pub data: SecretDataDto,
}

#[derive(Debug, Deserialize)]
pub struct NewDataRequest {
    pub title: String,
    pub data_type: DataType,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    pub update_dt: i64,
}

#[derive(Debug, Serialize)]
pub struct NewDataDto {
    pub id: i64,
    pub title: String,
    pub data_type: DataType,
    pub update_dt: i64,
}

#[derive(Debug, Serialize)]
pub struct NewDataResponse {
    pub status: bool,
    pub data: NewDataDto,
}

#[derive(Debug, Deserialize)]
pub struct UpdDataRequest {
    pub title: String,
    pub data_type: DataType,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    pub update_dt: i64,
}

mod base64_bytes {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
