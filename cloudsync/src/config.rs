use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{config_bail, config_error};

/// Default endpoint of the disk REST API
pub const DEFAULT_API_URL: &str = "https://cloud-api.yandex.net/v1/disk";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// OAuth token of the disk account
    pub token: String,
    /// Local folder to mirror
    pub local_path: Utf8PathBuf,
    /// Folder on the disk, e.g. `disk:/Backup`
    pub cloud_path: String,
    /// Seconds between two sync cycles
    pub period: u64,
    /// File that receives the diagnostic output
    pub log_path: Utf8PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<Url>,
}

impl Config {
    pub async fn load_from_file(path: &Utf8Path) -> crate::Result<Self> {
        let config_json = tokio::fs::read(&path)
            .await
            .map_err(|err| config_error!("Failed to read config from {path}: {err}"))?;
        let config_json = std::str::from_utf8(&config_json)
            .map_err(|err| config_error!("{path} is not UTF-8: {err}"))?;
        let config = Self::from_json(config_json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the config without checking its values.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|err| config_error!("Invalid config: {err}"))
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.token.trim().is_empty() {
            config_bail!("'token' must not be empty");
        }
        if self.cloud_path.trim().is_empty() {
            config_bail!("'cloud_path' must not be empty");
        }
        if self.period == 0 {
            config_bail!("'period' must be a positive number of seconds");
        }
        if !self.local_path.is_dir() {
            config_bail!("'local_path' is not a directory: {}", self.local_path);
        }
        if self.log_path.as_str().is_empty() || self.log_path.is_dir() {
            config_bail!("'log_path' must point to a file: {}", self.log_path);
        }
        if let Some(parent) = self.log_path.parent() {
            if !parent.as_str().is_empty() && !parent.is_dir() {
                config_bail!("No such folder for 'log_path': {parent}");
            }
        }
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period)
    }

    pub fn api_url(&self) -> Url {
        self.api_url
            .clone()
            .unwrap_or_else(|| Url::parse(DEFAULT_API_URL).expect("valid default URL"))
    }
}
