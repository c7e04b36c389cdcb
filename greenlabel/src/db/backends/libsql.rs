use crate::db::connection::Database;
use crate::db::repository::ProductRepository;
use crate::db::traits::{ProductFilter, ProductStore};
use crate::error::Result;
use crate::models::ProductRecord;
use async_trait::async_trait;

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn count(&self) -> Result<u64> {
        let conn = self.db.connect()?;
        ProductRepository::count(&conn).await
    }
}

#[async_trait]
impl ProductStore for LibSqlBackend {
    async fn find_matching(
        &self,
        filter: &ProductFilter,
        limit: usize,
    ) -> Result<Vec<ProductRecord>> {
        let conn = self.db.connect()?;
        ProductRepository::find_matching(&conn, filter, limit).await
    }

    async fn insert_many(&self, records: &[ProductRecord]) -> Result<usize> {
        let conn = self.db.connect()?;
        ProductRepository::create_batch(&conn, records).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ProductRecord>> {
        let conn = self.db.connect()?;
        ProductRepository::get_by_id(&conn, id).await
    }

    async fn find_by_barcode(&self, barcode: &str) -> Result<Option<ProductRecord>> {
        let conn = self.db.connect()?;
        ProductRepository::get_by_barcode(&conn, barcode).await
    }

    async fn save(&self, record: &ProductRecord) -> Result<()> {
        let conn = self.db.connect()?;
        ProductRepository::upsert(&conn, record).await
    }

    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }
}
