//! Server configuration, loaded from the environment with a `.env` file
//! consulted first if present.

#[derive(Debug, Clone)]
pub struct Config {
    pub rest_address: String,
    pub ssl_enable: bool,
    pub secret_key: String,
    pub encrypt_key: Vec<u8>,
    pub database_path: String,
    pub log_level: String,
    pub log_path: Option<String>,
    pub tls_cert_path: String,
    pub tls_key_path: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let rest_address =
            std::env::var("REST_ADDRESS").unwrap_or_else(|_| "127.0.0.1:8443".to_string());
        let ssl_enable = std::env::var("SSL_ENABLE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let secret_key = std::env::var("SECRET_KEY")
            .unwrap_or_else(|_| "dev-secret-change-me".to_string());
        let encrypt_key = std::env::var("ENCRYPT_KEY")
            .unwrap_or_else(|_| "0123456789abcdef".to_string())
            .into_bytes();
        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/keeper.db".to_string());
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_path = std::env::var("LOG_PATH").ok();
        let tls_cert_path =
            std::env::var("TLS_CERT_PATH").unwrap_or_else(|_| "./cert/server.crt".to_string());
        let tls_key_path =
            std::env::var("TLS_KEY_PATH").unwrap_or_else(|_| "./cert/server.key".to_string());

        Ok(Self {
            rest_address,
            ssl_enable,
            secret_key,
            encrypt_key,
            database_path,
            log_level,
            log_path,
            tls_cert_path,
            tls_key_path,
        })
    }
}
