use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Directory served for every path the API does not claim.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

/// The utility service the gateway relays source lookups to.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_sources_url")]
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Config {
            server: ServerConfig::default(),
            sources: SourcesConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }

    /// `PORT` replaces the port of the listen address, keeping its host.
    pub fn apply_port_override(&mut self, port: Option<&str>) {
        let Some(port) = port else { return };
        match port.parse::<u16>() {
            Ok(port) => {
                let host = self
                    .server
                    .listen_addr
                    .rsplit_once(':')
                    .map(|(host, _)| host)
                    .unwrap_or("0.0.0.0");
                self.server.listen_addr = format!("{host}:{port}");
            }
            Err(e) => tracing::warn!(value = %port, error = %e, "ignoring invalid PORT"),
        }
    }
}

impl SourcesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            static_dir: default_static_dir(),
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            url: default_sources_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            window_secs: default_window_secs(),
            max_requests: default_max_requests(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}
fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}
fn default_body_limit_bytes() -> usize {
    10 * 1_048_576
}
fn default_sources_url() -> String {
    "http://127.0.0.1:3100".to_string()
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_true() -> bool {
    true
}
fn default_window_secs() -> u64 {
    15 * 60
}
fn default_max_requests() -> u32 {
    100
}
