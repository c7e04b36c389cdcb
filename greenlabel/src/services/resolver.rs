use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::db::ProductStore;
use crate::error::Result;
use crate::models::ProductRecord;
use crate::search::{LookupRequest, ResultCache, SearchKey};
use crate::sources::{CatalogClient, LocalLookup, ProductLookup, RegistryScraper};

use super::writes::{persistence_error, BackgroundWrites};

pub type SearchCache = ResultCache<SearchKey, Vec<ProductRecord>>;

/// Resolves a query and/or barcode against an ordered list of sources,
/// stopping at the first one that returns anything.
#[derive(Clone)]
pub struct SearchResolver {
    sources: Vec<Arc<dyn ProductLookup>>,
    store: Arc<dyn ProductStore>,
    cache: SearchCache,
    writes: BackgroundWrites,
}

impl SearchResolver {
    pub fn new(
        sources: Vec<Arc<dyn ProductLookup>>,
        store: Arc<dyn ProductStore>,
        cache: SearchCache,
    ) -> Self {
        Self {
            sources,
            store,
            cache,
            writes: BackgroundWrites::new(),
        }
    }

    /// Local store, then the registry scrape, then the public catalog.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn ProductStore>,
        catalog: Arc<CatalogClient>,
    ) -> Result<Self> {
        let sources: Vec<Arc<dyn ProductLookup>> = vec![
            Arc::new(LocalLookup::new(store.clone())),
            Arc::new(RegistryScraper::new(&config.sources, &config.cache)?),
            catalog,
        ];
        let cache = ResultCache::new(
            config.cache.capacity,
            Duration::from_secs(config.cache.search_ttl_secs),
        );
        Ok(Self::new(sources, store, cache))
    }

    pub async fn resolve(
        &self,
        query: Option<&str>,
        barcode: Option<&str>,
    ) -> Result<Vec<ProductRecord>> {
        let request = LookupRequest::new(query, barcode)?;
        Ok(self.resolve_request(&request).await)
    }

    /// Never fails: an unavailable source counts as an empty one.
    pub async fn resolve_request(&self, request: &LookupRequest) -> Vec<ProductRecord> {
        let key = request.key();
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(query = ?request.query, barcode = ?request.barcode, "Search cache hit");
            return cached;
        }

        for source in &self.sources {
            let found = match source.lookup(request).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "Source unavailable, skipping");
                    continue;
                }
            };

            if found.is_empty() {
                tracing::debug!(source = source.name(), "No results");
                continue;
            }

            tracing::info!(
                source = source.name(),
                count = found.len(),
                query = ?request.query,
                barcode = ?request.barcode,
                "Search resolved"
            );

            if source.persists_discoveries() {
                self.persist_in_background(found.clone());
            }
            self.cache.put(key, found.clone());
            return found;
        }

        tracing::info!(query = ?request.query, barcode = ?request.barcode, "No source had results");
        Vec::new()
    }

    fn persist_in_background(&self, records: Vec<ProductRecord>) {
        let store = self.store.clone();
        self.writes.spawn("discovered products", async move {
            let inserted = store
                .insert_many(&records)
                .await
                .map_err(persistence_error)?;
            tracing::debug!(inserted, offered = records.len(), "Discovered products saved");
            Ok(())
        });
    }

    /// Wait for discovered-product writes still in flight. Lookups never wait on
    /// these; short-lived callers use this before exiting.
    pub async fn flush_pending(&self) {
        self.writes.flush().await;
    }
}
