use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::Result;
use regex::Regex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound for request bodies, batch uploads included
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    #[serde(default = "default_dialect_from")]
    pub default_dialect_from: String,
    #[serde(default = "default_dialect_to")]
    pub default_dialect_to: String,
    #[serde(default = "default_max_batch_files")]
    pub max_batch_files: usize,
    /// YAML mapping rules applied after translation
    #[serde(default)]
    pub rules_file: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_dialect_from() -> String {
    "bigquery".to_string()
}

fn default_dialect_to() -> String {
    "databricks".to_string()
}

fn default_max_batch_files() -> usize {
    100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            default_dialect_from: default_dialect_from(),
            default_dialect_to: default_dialect_to(),
            max_batch_files: default_max_batch_files(),
            rules_file: None,
        }
    }
}

impl Config {
    /// Load a YAML or JSON configuration file, substituting `${VAR}` from the environment
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            anyhow::bail!("Configuration file not found: {}", path);
        }
        let content = substitute_env(&fs::read_to_string(path)?)?;

        let path_lower = path.to_lowercase();
        let config = if path_lower.ends_with(".json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(config)
    }

    /// Try the usual locations in order, falling back to defaults
    pub fn discover() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));

        let config_paths: Vec<String> = vec![
            std::env::var("CONFIG_PATH").ok(),
            Some("conf.yaml".to_string()),
            exe_dir.join("conf.yaml").to_str().map(|s| s.to_string()),
        ]
        .into_iter()
        .flatten()
        .collect();

        for path in &config_paths {
            match Config::load(path) {
                Ok(cfg) => {
                    info!("Loaded configuration from: {}", path);
                    return cfg;
                }
                Err(e) => debug!("Failed to load config from {}: {}", path, e),
            }
        }

        warn!("No configuration file found (tried {:?}), using defaults", config_paths);
        Config::default()
    }

    /// `HOST` and `PORT` take precedence over the file
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid PORT '{}': {}", port, e))?;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Replace `${VAR_NAME}`; unknown variables are left as written
fn substitute_env(content: &str) -> Result<String> {
    let pattern = Regex::new(r"\$\{(\w+)\}")?;
    let replaced = pattern.replace_all(content, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });
    Ok(replaced.into_owned())
}
