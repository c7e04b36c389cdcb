use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Products discovered, seeded or added by hand. List columns hold JSON arrays.
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            barcode TEXT NOT NULL DEFAULT '',
            name TEXT NOT NULL,
            brand TEXT NOT NULL DEFAULT '',
            origin TEXT,
            description TEXT,
            ingredients TEXT NOT NULL DEFAULT '[]',
            certifications TEXT NOT NULL DEFAULT '[]',
            organic_percentage INTEGER NOT NULL DEFAULT 0,
            source TEXT NOT NULL DEFAULT 'manual',
            source_id TEXT NOT NULL DEFAULT 'manual',
            source_url TEXT,
            images TEXT NOT NULL DEFAULT '[]',
            verification TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_products_barcode ON products(barcode);
        CREATE INDEX IF NOT EXISTS idx_products_source ON products(source);
        "#,
    )
    .await?;

    Ok(())
}
