use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::search::DEFAULT_RESULT_LIMIT;

/// Default HTTP bind address for the daemon
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
/// Default embedding model; the only supported pair sharing a text/image
/// vector space
const DEFAULT_EMBEDDING_MODEL: &str = "clip-vit-b-32";
/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Configuration for the embedding model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (e.g., "clip-vit-b-32")
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

/// Configuration for the HTTP surface
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the daemon listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Result count used when a request does not specify one
    #[serde(default = "default_result_limit")]
    pub default_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            default_limit: DEFAULT_RESULT_LIMIT,
        }
    }
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_result_limit() -> usize {
    DEFAULT_RESULT_LIMIT
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Config {
    fn validate(&self) {
        if self.embedding.model.trim().is_empty() {
            panic!("embedding.model must not be empty");
        }

        if self.embedding.download_timeout_secs == 0 {
            panic!("embedding.download_timeout_secs must be greater than 0");
        }

        if self.server.bind_addr.trim().is_empty() {
            panic!("server.bind_addr must not be empty");
        }

        if self.server.default_limit == 0 {
            panic!("server.default_limit must be greater than 0");
        }
    }

    /// Load config.yaml from the data directory, creating it with defaults
    /// on first run.
    pub fn load_with(base_path: &str) -> Self {
        let config_path = PathBuf::from(base_path).join("config.yaml");

        // create new if does not exist
        if !config_path.exists() {
            std::fs::create_dir_all(base_path).expect("cannot create data directory");
            std::fs::write(
                &config_path,
                serde_yml::to_string(&Self::default()).unwrap().as_bytes(),
            )
            .expect("cannot write default config");
        }

        let config_str =
            std::fs::read_to_string(&config_path).expect("config file is not readable");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_string();

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let config_path = PathBuf::from(&self.base_path).join("config.yaml");
        let config_str = serde_yml::to_string(&self).unwrap();
        std::fs::write(config_path, config_str.as_bytes()).expect("cannot write config");
    }

    /// Data directory; also the embedding-model cache root.
    pub fn base_dir(&self) -> PathBuf {
        PathBuf::from(&self.base_path)
    }

    /// Catalog JSONL path.
    pub fn products_path(&self) -> PathBuf {
        self.base_dir().join("products.jsonl")
    }

    /// Binary index path (written by the offline embedding job).
    pub fn index_path(&self) -> PathBuf {
        self.base_dir().join("products.bin")
    }
}
