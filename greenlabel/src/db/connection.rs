use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

/// Where the product database lives, derived from `DATABASE_URL`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Memory,
    File(String),
    Remote { url: String },
    Replica { url: String, local_path: String },
}

impl Target {
    fn from_config(config: &DatabaseConfig) -> Self {
        let url = config.url.as_str();
        if url.starts_with("libsql://") || url.starts_with("https://") {
            return match &config.local_path {
                Some(local_path) => Self::Replica {
                    url: url.to_string(),
                    local_path: local_path.clone(),
                },
                None => Self::Remote {
                    url: url.to_string(),
                },
            };
        }
        if matches!(url, ":memory:" | "file::memory:") {
            return Self::Memory;
        }
        Self::File(url.strip_prefix("file:").unwrap_or(url).to_string())
    }
}

#[derive(Clone)]
pub struct Database {
    pub(crate) db: Arc<libsql::Database>,
    pragmas: Vec<(&'static str, String)>,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let token = config.auth_token.clone().unwrap_or_default();
        let target = Target::from_config(config);
        tracing::debug!(location = ?target, "Opening product database");

        let db = match target {
            Target::Memory => Builder::new_local(":memory:").build().await?,
            Target::File(path) => Builder::new_local(path).build().await?,
            Target::Remote { url } => Builder::new_remote(url, token).build().await?,
            Target::Replica { url, local_path } => {
                Builder::new_remote_replica(local_path, url, token)
                    .build()
                    .await?
            }
        };

        let database = Self {
            db: Arc::new(db),
            pragmas: vec![
                ("busy_timeout", config.busy_timeout_ms.to_string()),
                ("journal_mode", journal_mode(&config.journal_mode).to_string()),
                ("synchronous", synchronous(&config.synchronous).to_string()),
            ],
        };

        let conn = database.connect()?;
        database.apply_pragmas(&conn).await;
        schema::init_schema(&conn).await?;

        Ok(database)
    }

    pub fn connect(&self) -> Result<Connection> {
        Ok(self.db.connect()?)
    }

    /// Pragma failures are tolerated; remote databases reject most of them.
    async fn apply_pragmas(&self, conn: &Connection) {
        for (name, value) in &self.pragmas {
            if let Err(error) = conn.execute_batch(&format!("PRAGMA {name} = {value}")).await {
                tracing::warn!(
                    pragma = name,
                    value = %value,
                    error = %error,
                    "Failed to set SQLite pragma"
                );
            }
        }
    }

    /// Pull from the primary when running as an embedded replica.
    pub async fn sync(&self) -> Result<()> {
        if let Ok(sync) = self.db.sync().await {
            tracing::info!("Database synced: {:?}", sync);
        }
        Ok(())
    }
}

fn journal_mode(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "DELETE" => "DELETE",
        "TRUNCATE" => "TRUNCATE",
        "PERSIST" => "PERSIST",
        "MEMORY" => "MEMORY",
        "OFF" => "OFF",
        _ => "WAL",
    }
}

fn synchronous(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "OFF" => "OFF",
        "FULL" => "FULL",
        "EXTRA" => "EXTRA",
        _ => "NORMAL",
    }
}
