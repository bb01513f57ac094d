//! Bounded embedding cache.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use graphmem_protocols::{Embedding, EmbeddingError, EmbeddingProvider};

struct CacheState {
    entries: HashMap<String, Embedding>,
    order: VecDeque<String>,
}

/// Wraps a provider and keeps the most recently computed embeddings.
///
/// Eviction is first-in first-out once `capacity` texts are cached. A
/// capacity of zero disables caching.
pub struct CachedEmbeddingProvider<P> {
    inner: P,
    capacity: usize,
    state: RwLock<CacheState>,
}

impl<P: EmbeddingProvider> CachedEmbeddingProvider<P> {
    pub fn new(inner: P, capacity: usize) -> Self {
        Self {
            inner,
            capacity,
            state: RwLock::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, text: &str) -> Option<Embedding> {
        self.state.read().entries.get(text).cloned()
    }

    fn store(&self, text: &str, embedding: &Embedding) {
        if self.capacity == 0 {
            return;
        }
        let mut state = self.state.write();
        if state.entries.contains_key(text) {
            return;
        }
        while state.entries.len() >= self.capacity {
            match state.order.pop_front() {
                Some(oldest) => {
                    state.entries.remove(&oldest);
                }
                None => break,
            }
        }
        state.order.push_back(text.to_string());
        state.entries.insert(text.to_string(), embedding.clone());
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for CachedEmbeddingProvider<P> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if let Some(hit) = self.lookup(text) {
            trace!(provider = %self.inner.id(), "Embedding cache hit");
            return Ok(hit);
        }
        let embedding = self.inner.embed(text).await?;
        self.store(text, &embedding);
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        let mut out: Vec<Option<Embedding>> = texts.iter().map(|t| self.lookup(t)).collect();
        let misses: Vec<&str> = texts
            .iter()
            .zip(&out)
            .filter(|(_, hit)| hit.is_none())
            .map(|(t, _)| *t)
            .collect();

        if !misses.is_empty() {
            let fresh = self.inner.embed_batch(&misses).await?;
            let mut fresh = misses.iter().zip(fresh);
            for slot in out.iter_mut().filter(|slot| slot.is_none()) {
                if let Some((text, embedding)) = fresh.next() {
                    self.store(text, &embedding);
                    *slot = Some(embedding);
                }
            }
        }

        out.into_iter()
            .map(|slot| {
                slot.ok_or_else(|| EmbeddingError::Failed("provider returned too few embeddings".to_string()))
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}
