use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::SourcesConfig;
use crate::error::{GreenlabelError, Result};
use crate::models::{
    source_display_name, Certification, ProductRecord, RecordSource, SOURCE_ID_CATALOG,
};
use crate::search::{normalize_barcode, LookupRequest};

use super::ProductLookup;

const ORGANIC_LABEL: &str = "en:organic";

/// Organic percentage given to catalog hits with the best eco-grade.
const TOP_ECO_GRADE_PERCENTAGE: u8 = 95;
/// Organic percentage given to every other organic-labelled catalog hit.
const LABELLED_PERCENTAGE: u8 = 70;

/// Label tag -> concrete certification source id.
const LABEL_SOURCES: &[(&str, &str)] = &[
    ("en:usda-organic", "usda"),
    ("en:india-organic", "india-organic"),
    ("en:eu-organic", "eu-organic"),
];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogProduct {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub brands: Option<String>,
    #[serde(default)]
    pub labels_tags: Vec<String>,
    #[serde(default)]
    pub categories_tags: Vec<String>,
    #[serde(default)]
    pub ecoscore_grade: Option<String>,
    #[serde(default)]
    pub ecoscore_data: Option<EcoscoreData>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub ingredients_text: Option<String>,
    #[serde(default)]
    pub certification_id: Option<String>,
    #[serde(default)]
    pub verification_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EcoscoreData {
    #[serde(default)]
    pub agribalyse: Option<Agribalyse>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Agribalyse {
    #[serde(default)]
    pub name_en: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    products: Vec<Option<CatalogProduct>>,
}

#[derive(Debug, Deserialize)]
struct ProductPage {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    product: Option<CatalogProduct>,
}

impl CatalogProduct {
    fn has_label(&self, tag: &str) -> bool {
        self.labels_tags.iter().any(|t| t == tag)
    }

    fn has_top_eco_grade(&self) -> bool {
        self.ecoscore_grade.as_deref() == Some("a")
    }

    /// Concrete certification source implied by the product's labels.
    pub fn source_id(&self) -> &'static str {
        LABEL_SOURCES
            .iter()
            .find(|(tag, _)| self.has_label(tag))
            .map(|(_, id)| *id)
            .unwrap_or(SOURCE_ID_CATALOG)
    }
}

/// Organic per the product's own labels, categories or agribalyse name.
pub fn is_organic_product(product: &CatalogProduct) -> bool {
    let agribalyse_name = product
        .ecoscore_data
        .as_ref()
        .and_then(|d| d.agribalyse.as_ref())
        .and_then(|a| a.name_en.as_deref())
        .unwrap_or_default()
        .to_lowercase();

    product.has_label(ORGANIC_LABEL)
        || product.categories_tags.iter().any(|t| t == ORGANIC_LABEL)
        || agribalyse_name.contains("organic")
}

/// Open Food Facts search and product APIs.
pub struct CatalogClient {
    client: Client,
    base_url: String,
    page_size: u32,
    product_timeout: Duration,
}

impl CatalogClient {
    pub fn new(config: &SourcesConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.catalog_search_timeout_secs))
            .user_agent(concat!("greenlabel/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.catalog_base_url.trim_end_matches('/').to_string(),
            page_size: config.catalog_page_size,
            product_timeout: Duration::from_secs(config.catalog_product_timeout_secs),
        })
    }

    fn unavailable(reason: impl ToString) -> GreenlabelError {
        GreenlabelError::SourceUnavailable {
            source_id: SOURCE_ID_CATALOG.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Organic-labelled or top eco-grade products matching `term`.
    pub async fn search(&self, term: &str) -> Result<Vec<ProductRecord>> {
        let page_size = self.page_size.to_string();
        let response = self
            .client
            .get(format!("{}/cgi/search.pl", self.base_url))
            .query(&[
                ("search_terms", term),
                ("json", "1"),
                ("page_size", page_size.as_str()),
            ])
            .send()
            .await
            .map_err(Self::unavailable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::unavailable(format!("HTTP {status}")));
        }

        let page: SearchPage = response.json().await.map_err(Self::unavailable)?;

        let records: Vec<ProductRecord> = page
            .products
            .into_iter()
            .flatten()
            .filter(|p| p.has_label(ORGANIC_LABEL) || p.has_top_eco_grade())
            .map(|p| self.to_record(p))
            .collect();

        tracing::info!(term, count = records.len(), "Catalog search complete");
        Ok(records)
    }

    /// Full product entry for a barcode; `None` when the catalog does not know it.
    pub async fn product(&self, barcode: &str) -> Result<Option<CatalogProduct>> {
        let response = self
            .client
            .get(format!("{}/api/v0/product/{barcode}.json", self.base_url))
            .timeout(self.product_timeout)
            .send()
            .await
            .map_err(Self::unavailable)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::unavailable(format!("HTTP {status}")));
        }

        let page: ProductPage = response.json().await.map_err(Self::unavailable)?;
        Ok(if page.status == 1 { page.product } else { None })
    }

    fn to_record(&self, product: CatalogProduct) -> ProductRecord {
        let source_id = product.source_id();
        let code = product.code.clone().unwrap_or_default();
        let percentage = if product.has_top_eco_grade() {
            TOP_ECO_GRADE_PERCENTAGE
        } else {
            LABELLED_PERCENTAGE
        };

        let mut record = ProductRecord::new(
            product
                .product_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Unknown Product".to_string()),
            RecordSource::CatalogApi,
            source_id,
        )
        .with_barcode(&code)
        .with_brand(
            product
                .brands
                .filter(|b| !b.trim().is_empty())
                .unwrap_or_else(|| "Unknown Brand".to_string()),
        )
        .with_organic_percentage(percentage)
        .with_certification(Certification {
            issuer: source_display_name(source_id).to_string(),
            id: product
                .certification_id
                .unwrap_or_else(|| format!("OFF-{code}")),
            logo_ref: None,
            verified: false,
        });

        record.ingredients = product
            .ingredients_text
            .map(|text| {
                text.split(',')
                    .map(|i| i.trim().to_string())
                    .filter(|i| !i.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        record.images = product.image_url.into_iter().collect();
        record.source_url = Some(
            product
                .verification_url
                .unwrap_or_else(|| format!("{}/product/{}", self.base_url, normalize_barcode(&code))),
        );
        record
    }
}

#[async_trait]
impl ProductLookup for CatalogClient {
    fn name(&self) -> &str {
        SOURCE_ID_CATALOG
    }

    async fn lookup(&self, request: &LookupRequest) -> Result<Vec<ProductRecord>> {
        self.search(request.search_term()).await
    }
}
