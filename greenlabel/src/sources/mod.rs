//! Product sources consulted by the search resolver, in priority order.

mod catalog;
mod local;
mod registry;

pub use catalog::{is_organic_product, CatalogClient, CatalogProduct};
pub use local::LocalLookup;
pub use registry::{RegistryScraper, ORGANIC_CERTIFIERS};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ProductRecord;
use crate::search::LookupRequest;

/// One place products can be found.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    fn name(&self) -> &str;

    /// Records found here are written back to the local store.
    fn persists_discoveries(&self) -> bool {
        false
    }

    async fn lookup(&self, request: &LookupRequest) -> Result<Vec<ProductRecord>>;
}
