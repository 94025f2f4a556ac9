//! Browser configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CoreError;
use crate::Result;

/// How server certificates are trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertPolicy {
    /// Pin the first certificate seen per host and refuse changes
    Tofu,
    /// Accept whatever the server presents
    AcceptAny,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Page opened in the first tab
    pub homepage: String,
    /// Follow redirects without asking
    pub auto_redirect: bool,
    /// Redirects followed automatically before asking
    pub max_redirects: u8,
    pub cert_policy: CertPolicy,
    pub connect_timeout_secs: u64,
    /// 0 waits forever
    pub read_timeout_secs: u64,
    /// Path to the database file
    pub database_path: PathBuf,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            homepage: "gemini://geminiprotocol.net/".to_string(),
            auto_redirect: true,
            max_redirects: 5,
            cert_policy: CertPolicy::Tofu,
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
            database_path: data_dir.join("gemlet.db"),
        }
    }

    /// Read a JSON config file. Fields it leaves out keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;

        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_secs == 0 {
            return Err(CoreError::Config(
                "connect_timeout_secs must be positive".to_string(),
            ));
        }
        if url::Url::parse(&self.homepage).is_err() {
            return Err(CoreError::Config(format!(
                "homepage is not a URL: {}",
                self.homepage
            )));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_secs > 0).then(|| Duration::from_secs(self.read_timeout_secs))
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("gemlet"))
            .unwrap_or_else(|| PathBuf::from(".gemlet"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

// Platform data directory lookup
mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .filter(|d| !d.is_empty())
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
