//! Client configuration, loaded from `.env.client` if present.

#[derive(Debug, Clone)]
pub struct Config {
    pub api_address: String,
    pub file_max_size: u64,
    pub log_level: String,
    pub log_path: Option<String>,
    pub data_dir: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::from_filename(".env.client").ok();
        dotenvy::dotenv().ok();

        let api_address =
            std::env::var("API_ADDRESS").unwrap_or_else(|_| "https://127.0.0.1:8443".to_string());
        let file_max_size = std::env::var("FILE_MAX_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(819_200);
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_path = std::env::var("LOG_PATH").ok();
        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        Ok(Self {
            api_address,
            file_max_size,
            log_level,
            log_path,
            data_dir,
        })
    }
}
