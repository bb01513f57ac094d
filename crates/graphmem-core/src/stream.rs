//! Lazy paged relation listing.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::trace;

use graphmem_protocols::{Direction, GraphStore, MemoryError, Operation, Page, Relation};

use crate::engine::{MemoryEngine, bounded};
use crate::validation::require_non_empty;

/// Finite stream of relations. Pages are fetched on demand and a failed page
/// surfaces as an error item.
pub type RelationStream = BoxStream<'static, Result<Relation, MemoryError>>;

struct Cursor {
    store: Arc<dyn GraphStore>,
    name: String,
    direction: Direction,
    page: Page,
    timeout: Duration,
    exhausted: bool,
}

impl Cursor {
    async fn next_page(mut self) -> Result<Option<(Vec<Relation>, Self)>, MemoryError> {
        if self.exhausted {
            return Ok(None);
        }
        let batch = bounded(
            self.store.id(),
            Operation::ListRelations,
            self.timeout,
            self.store.list_relations(&self.name, self.direction, self.page),
        )
        .await?;
        trace!(
            entity = %self.name,
            offset = self.page.offset,
            fetched = batch.len(),
            "Relation page fetched"
        );
        self.exhausted = batch.len() < self.page.limit;
        self.page = self.page.next();
        Ok(Some((batch, self)))
    }
}

impl MemoryEngine {
    /// Relations of `name` in `direction`, ordered by (source, type, target).
    ///
    /// Each call starts a fresh stream from the first page.
    pub fn list_relations(
        &self,
        name: &str,
        direction: Direction,
    ) -> Result<RelationStream, MemoryError> {
        self.gate(Operation::ListRelations)?;
        require_non_empty("entity name", name)?;

        let cursor = Cursor {
            store: Arc::clone(&self.store),
            name: name.to_string(),
            direction,
            page: Page::first(self.config.relation_page_size),
            timeout: self.config.operation_timeout,
            exhausted: false,
        };

        Ok(stream::try_unfold(cursor, Cursor::next_page)
            .map_ok(|batch| stream::iter(batch.into_iter().map(Ok::<Relation, MemoryError>)))
            .try_flatten()
            .boxed())
    }
}
