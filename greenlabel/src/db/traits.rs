use async_trait::async_trait;

use crate::error::Result;
use crate::models::ProductRecord;

/// Criteria for a local product lookup. Empty fields are ignored; the two
/// fields are alternatives (a record matching either is returned).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive substring of name, brand or any certification issuer.
    pub text: Option<String>,
    /// Exact, already normalized barcode.
    pub barcode: Option<String>,
}

impl ProductFilter {
    pub fn is_empty(&self) -> bool {
        self.text.as_deref().map_or(true, str::is_empty)
            && self.barcode.as_deref().map_or(true, str::is_empty)
    }
}

/// Persistent product storage.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Matching records in insertion order, at most `limit`.
    async fn find_matching(&self, filter: &ProductFilter, limit: usize)
        -> Result<Vec<ProductRecord>>;

    /// Insert records that are not already stored. Returns how many were new.
    async fn insert_many(&self, records: &[ProductRecord]) -> Result<usize>;

    async fn find_by_id(&self, id: &str) -> Result<Option<ProductRecord>>;

    async fn find_by_barcode(&self, barcode: &str) -> Result<Option<ProductRecord>>;

    /// Insert or replace by id.
    async fn save(&self, record: &ProductRecord) -> Result<()>;

    /// Sync with remote (e.g. Turso replication). No-op for local-only databases.
    async fn sync(&self) -> Result<()>;
}
