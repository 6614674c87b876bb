use serde::Deserialize;

/// Static configuration of one intercept layer deployment.
///
/// `version` names the current cache generation. Bumping it is what retires
/// every previously cached payload on the next activation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InterceptConfig {
    #[serde(default = "default_version")]
    pub version: String,
    /// Origin the layer serves, e.g. `http://localhost:8080`.
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_seed_paths")]
    pub seed_paths: Vec<String>,
    /// External hosts that are never intercepted.
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,
    #[serde(default = "default_offline_body")]
    pub offline_body: String,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            origin: default_origin(),
            seed_paths: default_seed_paths(),
            allowed_hosts: default_allowed_hosts(),
            offline_body: default_offline_body(),
        }
    }
}

fn default_version() -> String {
    "medical-mcp-v2".to_string()
}
fn default_origin() -> String {
    "http://localhost:8080".to_string()
}
fn default_seed_paths() -> Vec<String> {
    vec!["/".to_string(), "/health".to_string()]
}
fn default_allowed_hosts() -> Vec<String> {
    vec![
        "fonts.googleapis.com".to_string(),
        "fonts.gstatic.com".to_string(),
        "cdnjs.cloudflare.com".to_string(),
    ]
}
fn default_offline_body() -> String {
    "Medical MCP Web Interface - Currently offline".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_uses_defaults() {
        let config: InterceptConfig = toml::from_str("").unwrap();
        assert_eq!(config, InterceptConfig::default());
        assert_eq!(config.version, "medical-mcp-v2");
        assert_eq!(config.seed_paths, vec!["/", "/health"]);
    }

    #[test]
    fn partial_override() {
        let config: InterceptConfig = toml::from_str(
            r#"
            version = "medical-mcp-v3"
            allowed_hosts = ["cdn.example.org"]
            "#,
        )
        .unwrap();

        assert_eq!(config.version, "medical-mcp-v3");
        assert_eq!(config.allowed_hosts, vec!["cdn.example.org"]);
        assert_eq!(config.origin, "http://localhost:8080");
    }
}
