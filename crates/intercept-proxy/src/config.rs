use crate::proxy::{deploy_layer, AppState};
use generation_cache::StorageLimits;
use intercept_layer::InterceptConfig;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub intercept: InterceptConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_admin_addr")]
    pub admin_addr: String,
}

/// The origin server the layer fronts (the gateway).
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_url")]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: usize,
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: usize,
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
            upstream: UpstreamConfig::default(),
            cache: CacheConfig::default(),
            intercept: InterceptConfig::default(),
        }
    }
}

impl CacheConfig {
    pub fn limits(&self) -> StorageLimits {
        StorageLimits {
            max_entry_bytes: self.max_entry_bytes,
            quota_bytes: self.quota_bytes,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            admin_addr: default_admin_addr(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entry_bytes: default_max_entry_bytes(),
            quota_bytes: default_quota_bytes(),
        }
    }
}

/// What a config reload has to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadAction {
    /// Nothing that can be applied at runtime changed.
    None,
    /// The intercept section changed: deploy a new layer over the same storage.
    Redeploy(InterceptConfig),
}

/// Compare old and new config and decide what can be applied live.
///
/// - intercept section changed → new layer installed and activated; a
///   version bump retires the previous generation
/// - upstream URL or storage limits changed → WARN log, ignored (restart required)
pub fn diff(old: &Config, new: &Config) -> ReloadAction {
    if old.upstream.url != new.upstream.url {
        tracing::warn!(
            old = %old.upstream.url,
            new = %new.upstream.url,
            "upstream change detected, ignoring. Restart to apply"
        );
    }

    if old.cache != new.cache {
        tracing::warn!(
            old_quota = old.cache.quota_bytes,
            new_quota = new.cache.quota_bytes,
            "cache limits change detected, ignoring. Restart to apply"
        );
    }

    if old.intercept != new.intercept {
        ReloadAction::Redeploy(new.intercept.clone())
    } else {
        ReloadAction::None
    }
}

/// Apply a reloaded config. Redeploys run on the given runtime since the file
/// watcher calls back from its own thread.
pub fn diff_and_apply(old: &Config, new: &Config, state: &Arc<AppState>, runtime: &Handle) {
    if let ReloadAction::Redeploy(intercept) = diff(old, new) {
        let state = Arc::clone(state);
        let old_version = old.intercept.version.clone();
        runtime.spawn(async move {
            let new_version = intercept.version.clone();
            match deploy_layer(&state, intercept).await {
                Ok(deployment) => tracing::info!(
                    old_version = %old_version,
                    new_version = %new_version,
                    ?deployment,
                    "config reloaded: intercept layer redeployed"
                ),
                Err(e) => tracing::error!(error = %e, "config reloaded: redeploy failed, keeping current layer"),
            }
        });
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_admin_addr() -> String {
    "0.0.0.0:9090".to_string()
}
fn default_upstream_url() -> String {
    "http://127.0.0.1:3000".to_string()
}
fn default_max_entry_bytes() -> usize {
    1_048_576
}
fn default_quota_bytes() -> usize {
    64 * 1_048_576
}
