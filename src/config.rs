//! read configuration from a file or the environment

use std::path::PathBuf;

use crate::errors::Error;

pub enum ConfigLocation {
    File(String),
    Env,
}

#[derive(Clone, serde::Deserialize)]
pub struct Config {
    pub base_url: String,
    pub storage_path: PathBuf,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn from_values(
        base_url: &str,
        storage_path: impl Into<PathBuf>,
        request_timeout_secs: Option<u64>,
    ) -> Self {
        Self {
            base_url: base_url.to_string(),
            storage_path: storage_path.into(),
            request_timeout_secs,
        }
    }

    pub async fn load(loc: ConfigLocation) -> Result<Config, Error> {
        match loc {
            ConfigLocation::File(path) => Self::from_file(&path).await,
            ConfigLocation::Env => Self::from_env(),
        }
    }

    pub async fn from_file(path: &str) -> Result<Config, Error> {
        let contents = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn from_env() -> Result<Config, Error> {
        Ok(Config {
            base_url: std::env::var("FORMFLOW_URL")
                .map_err(|_| Error::Config("Missing FORMFLOW_URL env var".to_string()))?,
            storage_path: std::env::var("FORMFLOW_STORAGE_PATH")
                .map_err(|_| Error::Config("Missing FORMFLOW_STORAGE_PATH env var".to_string()))?
                .into(),
            request_timeout_secs: std::env::var("FORMFLOW_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok()),
        })
    }

    /// Base URL with an https scheme applied when none was given, validated
    /// before any network call is made with it.
    pub(crate) fn normalized_base_url(&self) -> Result<String, Error> {
        let base = if self.base_url.starts_with("http") {
            self.base_url.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", self.base_url.trim_end_matches('/'))
        };
        let _ = reqwest::Url::parse(&base)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", base, e)))?;
        Ok(base)
    }
}
