use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::error::{GreenlabelError, Result};
use crate::models::{ProductRecord, ProductView};
use crate::services::DiscoveryPipeline;

#[derive(Parser, Debug)]
#[command(name = "greenlabel")]
#[command(about = "Find organic products by name, barcode or photo and verify their certification")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search by product name, brand, certifier or barcode
    Search {
        #[arg(short, long)]
        query: Option<String>,
        #[arg(short, long)]
        barcode: Option<String>,
    },
    /// Decode a barcode photo and look the product up
    Scan { image: PathBuf },
    /// Read a product photo's label and search for it
    Identify { image: PathBuf },
    /// Check organic certification by barcode, logo photo, or both
    Verify {
        #[arg(short, long)]
        barcode: Option<String>,
        #[arg(short, long)]
        image: Option<PathBuf>,
    },
    /// Show one stored product by id
    Show { id: String },
    /// Add one product from a JSON file
    Add { json: PathBuf },
    /// Load a JSON array of products into the store
    Seed { json: PathBuf },
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| {
        GreenlabelError::InvalidArgument(format!("Cannot read {}: {e}", path.display()))
    })
}

/// Execute one command and return its JSON result.
pub async fn run(pipeline: &DiscoveryPipeline, command: Command) -> Result<Value> {
    let output = match command {
        Command::Search { query, barcode } => serde_json::to_value(
            pipeline
                .search(query.as_deref(), barcode.as_deref())
                .await?,
        )?,
        Command::Scan { image } => {
            serde_json::to_value(pipeline.scan_barcode(read_file(&image).await?).await?)?
        }
        Command::Identify { image } => {
            serde_json::to_value(pipeline.search_by_image(read_file(&image).await?).await?)?
        }
        Command::Verify { barcode, image } => {
            let bytes = match image {
                Some(path) => Some(read_file(&path).await?),
                None => None,
            };
            serde_json::to_value(pipeline.verify(barcode.as_deref(), bytes).await?)?
        }
        Command::Show { id } => serde_json::to_value(pipeline.product_details(&id).await?)?,
        Command::Add { json } => {
            let record: ProductRecord = serde_json::from_slice(&read_file(&json).await?)?;
            serde_json::to_value(ProductView::from(pipeline.add_product(record).await?))?
        }
        Command::Seed { json } => {
            let records: Vec<ProductRecord> = serde_json::from_slice(&read_file(&json).await?)?;
            let offered = records.len();
            let inserted = pipeline.seed(records).await?;
            serde_json::json!({ "offered": offered, "inserted": inserted })
        }
    };
    Ok(output)
}
