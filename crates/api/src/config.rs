use std::path::PathBuf;
use std::time::Duration;

use decora_core::billing::GENERATION_TIMEOUT;
use decora_genai::GenAiConfig;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except secrets have sensible defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `90`, above the provider's
    /// 60s generation deadline so the middleware never races it).
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
    /// Generation provider connection settings.
    pub provider: GenAiConfig,
    /// Image storage settings.
    pub storage: StorageConfig,
}

/// Local image storage settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Filesystem root for stored and uploaded images.
    pub root: PathBuf,
    /// Public base URL under which stored images are served.
    pub public_base_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Required | Default                                       |
    /// |------------------------|----------|-----------------------------------------------|
    /// | `HOST`                 | no       | `0.0.0.0`                                     |
    /// | `PORT`                 | no       | `3000`                                        |
    /// | `CORS_ORIGINS`         | no       | `http://localhost:5173`                       |
    /// | `REQUEST_TIMEOUT_SECS` | no       | `90`                                          |
    /// | `JWT_SECRET`           | **yes**  | --                                            |
    /// | `GENAI_API_KEY`        | **yes**  | --                                            |
    /// | `GENAI_API_URL`        | no       | `https://generativelanguage.googleapis.com`   |
    /// | `GENAI_MODEL`          | no       | `gemini-2.5-flash-image`                      |
    /// | `GENAI_MAX_RETRIES`    | no       | `1`                                           |
    /// | `GENAI_TEMPERATURE`    | no       | `0.4`                                         |
    /// | `STORAGE_ROOT`         | no       | `./data/images`                               |
    /// | `PUBLIC_BASE_URL`      | no       | `http://localhost:3000`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "90".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            provider: provider_from_env(),
            storage: storage_from_env(),
        }
    }
}

fn provider_from_env() -> GenAiConfig {
    let api_key =
        std::env::var("GENAI_API_KEY").expect("GENAI_API_KEY must be set in the environment");

    let api_url = std::env::var("GENAI_API_URL")
        .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".into());

    let model =
        std::env::var("GENAI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash-image".into());

    let max_retries: u32 = std::env::var("GENAI_MAX_RETRIES")
        .unwrap_or_else(|_| "1".into())
        .parse()
        .expect("GENAI_MAX_RETRIES must be a valid u32");

    let temperature: f64 = std::env::var("GENAI_TEMPERATURE")
        .unwrap_or_else(|_| "0.4".into())
        .parse()
        .expect("GENAI_TEMPERATURE must be a valid f64");

    let timeout = std::env::var("GENAI_TIMEOUT_SECS")
        .ok()
        .map(|v| {
            Duration::from_secs(v.parse().expect("GENAI_TIMEOUT_SECS must be a valid u64"))
        })
        .unwrap_or(GENERATION_TIMEOUT);

    GenAiConfig {
        api_url,
        api_key,
        model,
        timeout,
        max_retries,
        temperature,
    }
}

fn storage_from_env() -> StorageConfig {
    let root = std::env::var("STORAGE_ROOT").unwrap_or_else(|_| "./data/images".into());
    let public_base_url =
        std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".into());
    StorageConfig {
        root: PathBuf::from(root),
        public_base_url,
    }
}
