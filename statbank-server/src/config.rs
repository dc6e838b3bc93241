// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use statbank_core::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_LANG};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Statbank Server Configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP listen address (e.g., "0.0.0.0:8000")
    #[serde(default = "default_http_addr")]
    pub listen_addr: String,

    /// Inbound request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Enable CORS
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_http_addr(),
            request_timeout_secs: default_request_timeout(),
            enable_cors: default_enable_cors(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Statbank API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upstream timeout in seconds (unset = no client-side timeout)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
            user_agent: default_user_agent(),
        }
    }
}

impl UpstreamConfig {
    pub fn client_config(&self) -> ClientConfig {
        let mut config =
            ClientConfig::new(self.base_url.clone()).with_user_agent(self.user_agent.clone());
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DefaultsConfig {
    /// Language used when a caller omits `lang`
    #[serde(default = "default_lang")]
    pub lang: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            lang: default_lang(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable ones
    #[serde(default)]
    pub json: bool,

    /// Filter directives, used when RUST_LOG is not set
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            filter: default_log_filter(),
        }
    }
}

// Default values
fn default_http_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_enable_cors() -> bool {
    true
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    concat!("statbank-mcp/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_lang() -> String {
    DEFAULT_LANG.to_string()
}

fn default_log_filter() -> String {
    "statbank_server=info,statbank_core=info,tower_http=info".to_string()
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with priority: env > file > defaults.
    ///
    /// Runs before logging is set up, so problems are returned, not logged.
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let config = match config_file {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Self::from_file(&path)
                    .with_context(|| format!("Failed to load config file {}", path.display()))?
            }
            None => Self::default(),
        };

        config.merge_env()
    }

    /// Override with environment variables that are explicitly set.
    ///
    /// Supported environment variables:
    /// - STATBANK_HTTP_ADDR: HTTP listen address (default: 0.0.0.0:8000)
    /// - PORT: listen port only, the host part is kept
    /// - STATBANK_BASE_URL: upstream base URL
    /// - STATBANK_TIMEOUT_SECS: upstream timeout in seconds
    /// - STATBANK_DEFAULT_LANG: default language code
    /// - STATBANK_LOG_JSON: emit JSON logs (default: false)
    pub fn merge_env(mut self) -> Result<Self> {
        if let Ok(addr) = std::env::var("STATBANK_HTTP_ADDR") {
            self.server.listen_addr = addr;
        } else if let Ok(port) = std::env::var("PORT") {
            let port: u16 = port
                .parse()
                .with_context(|| format!("Invalid PORT value: {:?}", port))?;
            self.server.listen_addr = with_port(&self.server.listen_addr, port);
        }

        if let Ok(base_url) = std::env::var("STATBANK_BASE_URL") {
            self.upstream.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("STATBANK_TIMEOUT_SECS") {
            let secs = timeout
                .parse()
                .with_context(|| format!("Invalid STATBANK_TIMEOUT_SECS value: {:?}", timeout))?;
            self.upstream.timeout_secs = Some(secs);
        }

        if let Ok(lang) = std::env::var("STATBANK_DEFAULT_LANG") {
            self.defaults.lang = lang;
        }

        if let Ok(json) = std::env::var("STATBANK_LOG_JSON") {
            self.logging.json = json
                .parse()
                .with_context(|| format!("Invalid STATBANK_LOG_JSON value: {:?}", json))?;
        }

        Ok(self)
    }

    /// Parse listen address as SocketAddr
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(self.server.listen_addr.parse()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        let base_url = url::Url::parse(&self.upstream.base_url)?;
        if !matches!(base_url.scheme(), "http" | "https") {
            anyhow::bail!(
                "Upstream base URL must use http or https, got '{}'",
                self.upstream.base_url
            );
        }

        if self.defaults.lang.trim().is_empty() {
            anyhow::bail!("Default language must not be empty");
        }

        Ok(())
    }
}

/// Replace the port of a `host:port` address.
fn with_port(addr: &str, port: u16) -> String {
    let host = addr.rsplit_once(':').map(|(host, _)| host).unwrap_or(addr);
    format!("{}:{}", host, port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8000");
        assert_eq!(config.upstream.base_url, "https://api.statbank.dk/v1");
        assert_eq!(config.defaults.lang, "da");
        assert!(config.upstream.timeout_secs.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_fills_missing_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[upstream]\nbase_url = \"http://localhost:9999/v1\"\ntimeout_secs = 5\n\n[defaults]\nlang = \"en\""
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.upstream.base_url, "http://localhost:9999/v1");
        assert_eq!(config.upstream.timeout_secs, Some(5));
        assert_eq!(config.defaults.lang, "en");
        assert_eq!(config.server.listen_addr, "0.0.0.0:8000");

        let client = config.upstream.client_config();
        assert_eq!(client.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = ServerConfig::default();
        config.upstream.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config.upstream.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_port_keeps_host() {
        assert_eq!(with_port("0.0.0.0:8000", 9000), "0.0.0.0:9000");
        assert_eq!(with_port("127.0.0.1:1", 80), "127.0.0.1:80");
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::load(Some(dir.path().join("statbank.toml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    // Env vars are process-wide, so every env case lives in this one test.
    #[test]
    fn test_merge_env() {
        std::env::set_var("STATBANK_BASE_URL", "http://127.0.0.1:8080/v1");
        std::env::set_var("STATBANK_DEFAULT_LANG", "en");

        let config = ServerConfig::default().merge_env().unwrap();
        assert_eq!(config.upstream.base_url, "http://127.0.0.1:8080/v1");
        assert_eq!(config.defaults.lang, "en");

        std::env::set_var("STATBANK_TIMEOUT_SECS", "soon");
        let err = ServerConfig::default().merge_env().unwrap_err();
        assert!(err.to_string().contains("STATBANK_TIMEOUT_SECS"));

        std::env::remove_var("STATBANK_TIMEOUT_SECS");
        std::env::remove_var("STATBANK_BASE_URL");
        std::env::remove_var("STATBANK_DEFAULT_LANG");
    }
}
