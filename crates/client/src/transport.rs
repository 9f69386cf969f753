//! Abstraction over the server's REST surface. The reconciler and the
//! typed-event API both go through this trait, so reconciliation logic can
//! be tested against an in-memory fake instead of a live HTTP server.

use async_trait::async_trait;
use common::types::DataType;
use common::KeeperError;

#[derive(Debug, Clone)]
pub struct ExternalMeta {
    pub id: i64,
    pub title: String,
    pub data_type: DataType,
    pub update_dt: i64,
    pub is_deleted: bool,
}

#[derive(Debug, Clone)]
pub struct ExternalSecret {
    pub id: i64,
    pub title: String,
    pub data_type: DataType,
    pub data: Vec<u8>,
    pub update_dt: i64,
}

#[async_trait]
pub trait ServerTransport: Send + Sync {
    async fn register(&self, login: &str, password: &str) -> Result<(), KeeperError>;
    async fn login(&self, login: &str, password: &str) -> Result<String, KeeperError>;
    async fn get_metadata(&self, token: &str) -> Result<Vec<ExternalMeta>, KeeperError>;
    async fn get_secret(&self, token: &str, id: i64) -> Result<Option<ExternalSecret>, KeeperError>;
    async fn create_secret(
        &self,
        token: &str,
        title: String,
        data_type: DataType,
        data: Vec<u8>,
        update_dt: i64,
    ) -> Result<ExternalMeta, KeeperError>;
    async fn update_secret(
        &self,
        token: &str,
        id: i64,
        title: String,
        data_type: DataType,
        data: Vec<u8>,
        update_dt: i64,
    ) -> Result<(), KeeperError>;
    async fn delete_secret(&self, token: &str, id: i64) -> Result<(), KeeperError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .danger_accept_invalid_certs(true)
                .build()
                .expect("failed to build http client"),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(serde::Deserialize)]
struct ResultEnvelope {
    status: bool,
}

#[derive(serde::Deserialize)]
struct LoginResponse {
    access_token: String,
}

#[derive(serde::Deserialize)]
struct MetaDataDto {
    id: i64,
    title: String,
    data_type: DataType,
    update_dt: i64,
    is_deleted: bool,
}

#[derive(serde::Deserialize)]
struct GetDatasResponse {
    data: Vec<MetaDataDto>,
}

#[derive(serde::Deserialize)]
struct SecretDataDto {
    id: i64,
    title: String,
    #[serde(with = "base64_field")]
    data: Vec<u8>,
    data_type: DataType,
    update_dt: i64,
}

#[derive(serde::Deserialize)]
struct GetDataResponse {
    data: SecretDataDto,
}

#[derive(serde::Serialize)]
struct NewDataRequest {
    title: String,
    data_type: DataType,
    #[serde(with = "base64_field")]
    data: Vec<u8>,
    update_dt: i64,
}

#[derive(serde::Deserialize)]
struct NewDataDto {
    id: i64,
    title: String,
    data_type: DataType,
    update_dt: i64,
}

#[derive(serde::Deserialize)]
struct NewDataResponse {
    data: NewDataDto,
}

mod base64_field {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
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


fn network_err(e: reqwest::Error) -> KeeperError {
    KeeperError::NetworkFailure(e.to_string())
}

#[async_trait]
impl ServerTransport for HttpTransport {
    async fn register(&self, login: &str, password: &str) -> Result<(), KeeperError> {
        let resp = self
            .client
            .post(self.url("/api/v0/auth/registration"))
            .json(&serde_json::json!({"login": login, "password": password}))
            .send()
            .await
            .map_err(network_err)?;
        match resp.status().as_u16() {
            201 => Ok(()),
            409 => Err(KeeperError::LoginTaken),
            400 => Err(KeeperError::LoginInvalid),
            _ => Err(KeeperError::NetworkFailure("registration failed".into())),
        }
    }

    async fn login(&self, login: &str, password: &str) -> Result<String, KeeperError> {
        let resp = self
            .client
            .post(self.url("/api/v0/auth/login"))
            .json(&serde_json::json!({"login": login, "password": password}))
            .send()
            .await
            .map_err(network_err)?;
        if resp.status().as_u16() == 401 {
            return Err(KeeperError::AuthFailed);
        }
        let body: LoginResponse = resp.json().await.map_err(network_err)?;
        Ok(body.access_token)
    }

    async fn get_metadata(&self, token: &str) -> Result<Vec<ExternalMeta>, KeeperError> {
        let resp = self
            .client
            .get(self.url("/api/v0/user/data"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(network_err)?;
        if resp.status().as_u16() == 401 {
            return Err(KeeperError::AuthFailed);
        }
        let body: GetDatasResponse = resp.json().await.map_err(network_err)?;
        Ok(body
            .data
            .into_iter()
            .map(|d| ExternalMeta {
                id: d.id,
                title: d.title,
                data_type: d.data_type,
                update_dt: d.update_dt,
                is_deleted: d.is_deleted,
            })
            .collect())
    }

    async fn get_secret(&self, token: &str, id: i64) -> Result<Option<ExternalSecret>, KeeperError> {
        let resp = self
            .client
            .get(self.url(&format!("/api/v0/user/data/{id}")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(network_err)?;
        match resp.status().as_u16() {
            204 => Ok(None),
            401 => Err(KeeperError::AuthFailed),
            _ => {
                let body: GetDataResponse = resp.json().await.map_err(network_err)?;
                Ok(Some(ExternalSecret {
                    id: body.data.id,
                    title: body.data.title,
                    data_type: body.data.data_type,
                    data: body.data.data,
                    update_dt: body.data.update_dt,
                }))
            }
        }
    }

    async fn create_secret(
        &self,
        token: &str,
        title: String,
        data_type: DataType,
        data: Vec<u8>,
        update_dt: i64,
    ) -> Result<ExternalMeta, KeeperError> {
        let resp = self
            .client
            .post(self.url("/api/v0/user/data"))
            .bearer_auth(token)
            .json(&NewDataRequest {
                title,
                data_type,
                data,
                update_dt,
            })
            .send()
            .await
            .map_err(network_err)?;
        if resp.status().as_u16() == 401 {
            return Err(KeeperError::AuthFailed);
        }
        let body: NewDataResponse = resp.json().await.map_err(network_err)?;
        Ok(ExternalMeta {
            id: body.data.id,
            title: body.data.title,
            data_type: body.data.data_type,
            update_dt: body.data.update_dt,
            is_deleted: false,
        })
    }

    async fn update_secret(
        &self,
        token: &str,
        id: i64,
        title: String,
        data_type: DataType,
        data: Vec<u8>,
        update_dt: i64,
    ) -> Result<(), KeeperError> {
        let resp = self
            .client
            .put(self.url(&format!("/api/v0/user/data/{id}")))
            .bearer_auth(token)
            .json(&NewDataRequest {
                title,
                data_type,
                data,
                update_dt,
            })
            .send()
            .await
            .map_err(network_err)?;
        if resp.status().as_u16() == 401 {
            return Err(KeeperError::AuthFailed);
        }
        let _body: ResultEnvelope = resp.json().await.map_err(network_err)?;
        Ok(())
    }

    async fn delete_secret(&self, token: &str, id: i64) -> Result<(), KeeperError> {
        let resp = self
            .client
            .delete(self.url(&format!("/api/v0/user/data/{id}")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(network_err)?;
        if resp.status().as_u16() == 401 {
            return Err(KeeperError::AuthFailed);
        }
        Ok(())
    }
}
