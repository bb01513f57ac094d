//! Build the store, embedder and engine described by a [`Config`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::{info, warn};

use graphmem_config::{BackendConfig, Config, ConfigLoader, EmbeddingConfig};
use graphmem_core::{EngineConfig, MemoryEngine};
use graphmem_embedding::{
    CachedEmbeddingProvider, HashEmbedding, OpenAIEmbedding, OpenAIEmbeddingConfig,
};
use graphmem_protocols::{EmbeddingProvider, GraphStore};
use graphmem_store_neptune::{NeptuneGraphStore, NeptuneStoreConfig};
use graphmem_store_sqlite::SqliteGraphStore;

pub(crate) async fn build_store(config: &BackendConfig) -> anyhow::Result<Arc<dyn GraphStore>> {
    match config.kind.as_str() {
        "sqlite" => {
            let store = match &config.sqlite.path {
                Some(path) => {
                    let path = PathBuf::from(ConfigLoader::expand_path(&path.to_string_lossy()));
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent).with_context(|| {
                            format!("cannot create database directory {}", parent.display())
                        })?;
                    }
                    info!(backend = "sqlite", path = %path.display(), "Opening SQLite store");
                    SqliteGraphStore::open(&path).await?
                }
                None => {
                    warn!(backend = "sqlite", "No database path configured, using an in-memory store");
                    SqliteGraphStore::in_memory().await?
                }
            };
            Ok(Arc::new(store))
        }
        "neptune" => {
            let neptune = config
                .neptune
                .as_ref()
                .context("backend.kind is 'neptune' but [backend.neptune] is missing")?;
            let mut store_config = NeptuneStoreConfig::new(&neptune.endpoint)
                .with_https(neptune.use_https)
                .with_request_timeout(Duration::from_secs(neptune.request_timeout_secs));
            if let Some(token) = &neptune.auth_token {
                store_config = store_config.with_auth_token(token);
            }
            info!(backend = "neptune", endpoint = %neptune.endpoint, "Connecting to Neptune store");
            Ok(Arc::new(NeptuneGraphStore::new(store_config)?))
        }
        other => bail!("unknown backend '{}', expected sqlite or neptune", other),
    }
}

pub(crate) fn build_embedder(
    config: &EmbeddingConfig,
) -> anyhow::Result<Option<Arc<dyn EmbeddingProvider>>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.provider.as_str() {
        "none" => return Ok(None),
        "hash" => Arc::new(HashEmbedding::new(config.dimension)),
        "openai" => {
            let api_key = config
                .api_key
                .clone()
                .context("embedding.provider is 'openai' but embedding.api_key is not set")?;
            let mut openai = OpenAIEmbeddingConfig::new(api_key).with_dimension(config.dimension);
            if let Some(model) = &config.model {
                openai = openai.with_model(model);
            }
            if let Some(url) = &config.base_url {
                openai = openai.with_base_url(url);
            }
            Arc::new(CachedEmbeddingProvider::new(
                OpenAIEmbedding::new(openai),
                config.cache_size,
            ))
        }
        other => bail!("unknown embedding provider '{}'", other),
    };
    info!(provider = %provider.id(), dimension = provider.dimension(), "Embedding provider ready");
    Ok(Some(provider))
}

pub(crate) async fn build_engine(config: &Config) -> anyhow::Result<Arc<MemoryEngine>> {
    let engine_config = EngineConfig::from_config(config)?;
    let store = build_store(&config.backend).await?;
    let mut engine = MemoryEngine::new(store, engine_config);
    if let Some(embedder) = build_embedder(&config.embedding)? {
        engine = engine.with_embedder(embedder);
    }
    info!(backend = %engine.backend(), mode = %engine.mode(), "Memory engine ready");
    Ok(Arc::new(engine))
}
