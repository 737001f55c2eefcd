//! Layered configuration, loaded the way `calimero-auth::config::load_config`
//! does: a config file plus environment overrides via the `config` crate.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level configuration for the knowledge hub server.
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    #[serde(default)]
    pub cors: CorsConfig,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub ingestion: IngestionConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

fn default_max_body_bytes() -> usize {
    8 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allow_all_origins: bool,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_all_origins: true,
            allowed_origins: Vec::new(),
        }
    }
}

/// Where the object store's local backing directory lives, and the base
/// URL used to build pre-signed download links.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub local_dir: PathBuf,
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_dir: default_storage_dir(),
            public_base_url: default_public_base_url(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./data/objects")
}

fn default_public_base_url() -> String {
    "http://localhost:8080/files".into()
}

/// Ingestion worker pool sizing and the child splitter's target passage
/// size (spec.md §4.4 step 3, §5).
#[derive(Debug, Clone, Deserialize)]
pub struct IngestionConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_splitter_target_size")]
    pub splitter_target_size: usize,
    #[serde(default = "default_memory_cap_bytes")]
    pub memory_cap_bytes: u64,
    #[serde(default = "default_model_tag")]
    pub embedding_model_tag: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            splitter_target_size: default_splitter_target_size(),
            memory_cap_bytes: default_memory_cap_bytes(),
            embedding_model_tag: default_model_tag(),
        }
    }
}

fn default_worker_count() -> usize {
    2
}

fn default_splitter_target_size() -> usize {
    2000
}

fn default_memory_cap_bytes() -> u64 {
    2 * 1024 * 1024 * 1024
}

fn default_model_tag() -> String {
    "text-embedding-v1".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model_tag")]
    pub model: String,
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_embedding_endpoint(),
            model: default_model_tag(),
            dimension: default_embedding_dimension(),
        }
    }
}

fn default_embedding_endpoint() -> String {
    "http://localhost:9000/v1/embeddings".into()
}

fn default_embedding_dimension() -> usize {
    768
}

/// Deployment-configured chat generation rules (spec.md §4.8 step 4).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_model_endpoint")]
    pub model_endpoint: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_no_references_line")]
    pub no_references_line: String,
    #[serde(default = "default_completion_message")]
    pub completion_message: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model_endpoint: default_model_endpoint(),
            model: default_chat_model(),
            system_prompt: default_system_prompt(),
            no_references_line: default_no_references_line(),
            completion_message: default_completion_message(),
        }
    }
}

fn default_model_endpoint() -> String {
    "http://localhost:9001/v1/chat/completions".into()
}

fn default_chat_model() -> String {
    "hub-chat-v1".into()
}

fn default_system_prompt() -> String {
    "Answer only from the provided reference block. Cite sources by their [i] marker.".into()
}

fn default_no_references_line() -> String {
    "No references available.".into()
}

fn default_completion_message() -> String {
    "done".into()
}

/// Load configuration from `path` (YAML) with `HUB__`-prefixed environment
/// overrides, falling back to built-in defaults when `path` is absent.
pub fn load_config(path: Option<&Path>) -> eyre::Result<HubConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }
    builder = builder.add_source(config::Environment::with_prefix("HUB").separator("__"));

    let loaded = builder.build().and_then(config::Config::try_deserialize);
    match loaded {
        Ok(config) => Ok(config),
        Err(e) if path.is_none() => {
            tracing::warn!(error = %e, "falling back to built-in configuration defaults");
            Ok(default_config())
        }
        Err(e) => Err(e.into()),
    }
}

fn default_config() -> HubConfig {
    HubConfig {
        listen_addr: default_listen_addr(),
        cors: CorsConfig::default(),
        max_body_bytes: default_max_body_bytes(),
        storage: StorageConfig::default(),
        ingestion: IngestionConfig::default(),
        chat: ChatConfig::default(),
        embedding: EmbeddingConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_built_in_defaults_without_a_config_file() {
        let config = load_config(None).unwrap();
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.ingestion.worker_count, 2);
    }
}
