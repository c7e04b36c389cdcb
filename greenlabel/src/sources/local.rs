use std::sync::Arc;

use async_trait::async_trait;

use crate::db::{ProductFilter, ProductStore};
use crate::error::Result;
use crate::models::ProductRecord;
use crate::search::LookupRequest;

use super::ProductLookup;

pub const LOCAL_RESULT_LIMIT: usize = 20;

/// Products already in the local store.
pub struct LocalLookup {
    store: Arc<dyn ProductStore>,
}

impl LocalLookup {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProductLookup for LocalLookup {
    fn name(&self) -> &str {
        "local"
    }

    async fn lookup(&self, request: &LookupRequest) -> Result<Vec<ProductRecord>> {
        let filter = ProductFilter {
            text: request.query.clone(),
            barcode: request.barcode.clone(),
        };
        self.store.find_matching(&filter, LOCAL_RESULT_LIMIT).await
    }
}
