use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::db::traits::ProductFilter;
use crate::error::Result;
use crate::models::{ProductRecord, RecordSource};

const COLUMNS: &str = "id, barcode, name, brand, origin, description, ingredients, \
     certifications, organic_percentage, source, source_id, source_url, images, \
     verification, created_at, updated_at";

pub struct ProductRepository;

impl ProductRepository {
    pub async fn create(conn: &Connection, record: &ProductRecord) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT INTO products ({COLUMNS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
            ),
            libsql::params_from_iter(Self::params(record)?),
        )
        .await?;

        Ok(())
    }

    /// Insert unless a record with the same non-empty barcode already exists,
    /// or, for records without a barcode, the same name from the same source.
    pub async fn create_if_absent(conn: &Connection, record: &ProductRecord) -> Result<bool> {
        let inserted = conn
            .execute(
                &format!(
                    r#"
                    INSERT INTO products ({COLUMNS})
                    SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16
                    WHERE NOT EXISTS (
                        SELECT 1 FROM products
                        WHERE id = ?1
                           OR (?2 != '' AND barcode = ?2)
                           OR (?2 = '' AND barcode = '' AND lower(name) = lower(?3) AND source_id = ?11)
                    )
                    "#
                ),
                libsql::params_from_iter(Self::params(record)?),
            )
            .await?;

        Ok(inserted > 0)
    }

    pub async fn create_batch(conn: &Connection, records: &[ProductRecord]) -> Result<usize> {
        let mut inserted = 0;
        for record in records {
            if Self::create_if_absent(conn, record).await? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    pub async fn upsert(conn: &Connection, record: &ProductRecord) -> Result<()> {
        conn.execute(
            &format!(
                r#"
                INSERT INTO products ({COLUMNS}) VALUES
                    (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                ON CONFLICT(id) DO UPDATE SET
                    barcode = excluded.barcode,
                    name = excluded.name,
                    brand = excluded.brand,
                    origin = excluded.origin,
                    description = excluded.description,
                    ingredients = excluded.ingredients,
                    certifications = excluded.certifications,
                    organic_percentage = excluded.organic_percentage,
                    source = excluded.source,
                    source_id = excluded.source_id,
                    source_url = excluded.source_url,
                    images = excluded.images,
                    verification = excluded.verification,
                    updated_at = excluded.updated_at
                "#
            ),
            libsql::params_from_iter(Self::params(record)?),
        )
        .await?;

        Ok(())
    }

    pub async fn get_by_id(conn: &Connection, id: &str) -> Result<Option<ProductRecord>> {
        let mut rows = conn
            .query(
                &format!("SELECT {COLUMNS} FROM products WHERE id = ?1"),
                params![id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_product(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn get_by_barcode(conn: &Connection, barcode: &str) -> Result<Option<ProductRecord>> {
        if barcode.is_empty() {
            return Ok(None);
        }

        let mut rows = conn
            .query(
                &format!("SELECT {COLUMNS} FROM products WHERE barcode = ?1 ORDER BY rowid LIMIT 1"),
                params![barcode],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_product(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Substring match on name, brand and certification issuers, or exact barcode.
    pub async fn find_matching(
        conn: &Connection,
        filter: &ProductFilter,
        limit: usize,
    ) -> Result<Vec<ProductRecord>> {
        if filter.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        // SQLite's lower() folds ASCII only, so the needle must match that.
        let text = filter.text.clone().unwrap_or_default().to_ascii_lowercase();
        let barcode = filter.barcode.clone().unwrap_or_default();

        let mut rows = conn
            .query(
                &format!(
                    r#"
                    SELECT {COLUMNS} FROM products
                    WHERE (?1 != '' AND (
                            instr(lower(name), ?1) > 0
                         OR instr(lower(brand), ?1) > 0
                         OR EXISTS (
                                SELECT 1 FROM json_each(products.certifications) AS cert
                                WHERE instr(lower(json_extract(cert.value, '$.issuer')), ?1) > 0
                            )
                        ))
                       OR (?2 != '' AND barcode = ?2)
                    ORDER BY rowid
                    LIMIT ?3
                    "#
                ),
                params![text, barcode, limit as i64],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_product(&row)?);
        }
        Ok(results)
    }

    pub async fn count(conn: &Connection) -> Result<u64> {
        let mut rows = conn.query("SELECT COUNT(*) FROM products", ()).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?.max(0) as u64),
            None => Ok(0),
        }
    }

    fn params(record: &ProductRecord) -> Result<Vec<libsql::Value>> {
        let verification = match &record.verification {
            Some(verdict) => libsql::Value::Text(serde_json::to_string(verdict)?),
            None => libsql::Value::Null,
        };

        Ok(vec![
            record.id.clone().into(),
            record.barcode.clone().into(),
            record.name.clone().into(),
            record.brand.clone().into(),
            optional_text(&record.origin),
            optional_text(&record.description),
            serde_json::to_string(&record.ingredients)?.into(),
            serde_json::to_string(&record.certifications)?.into(),
            (record.organic_percentage as i64).into(),
            record.source.to_string().into(),
            record.source_id.clone().into(),
            optional_text(&record.source_url),
            serde_json::to_string(&record.images)?.into(),
            verification,
            record.created_at.to_rfc3339().into(),
            record.updated_at.to_rfc3339().into(),
        ])
    }

    fn row_to_product(row: &libsql::Row) -> Result<ProductRecord> {
        let verification = row
            .get::<Option<String>>(13)?
            .and_then(|raw| serde_json::from_str(&raw).ok());

        Ok(ProductRecord {
            id: row.get(0)?,
            barcode: row.get(1)?,
            name: row.get(2)?,
            brand: row.get(3)?,
            origin: row.get(4)?,
            description: row.get(5)?,
            ingredients: serde_json::from_str(&row.get::<String>(6)?).unwrap_or_default(),
            certifications: serde_json::from_str(&row.get::<String>(7)?).unwrap_or_default(),
            organic_percentage: row.get::<i64>(8)?.clamp(0, 100) as u8,
            source: row
                .get::<String>(9)?
                .parse()
                .unwrap_or(RecordSource::Manual),
            source_id: row.get(10)?,
            source_url: row.get(11)?,
            images: serde_json::from_str(&row.get::<String>(12)?).unwrap_or_default(),
            verification,
            created_at: parse_timestamp(&row.get::<String>(14)?),
            updated_at: parse_timestamp(&row.get::<String>(15)?),
        })
    }
}

fn optional_text(value: &Option<String>) -> libsql::Value {
    match value {
        Some(text) => libsql::Value::Text(text.clone()),
        None => libsql::Value::Null,
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
