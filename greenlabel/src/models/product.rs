use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::VerificationVerdict;

/// Where a product record was first discovered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RecordSource {
    Local,
    Scrape,
    CatalogApi,
    LogoRecognition,
    #[default]
    Manual,
}

impl std::fmt::Display for RecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Scrape => write!(f, "scrape"),
            Self::CatalogApi => write!(f, "catalog-api"),
            Self::LogoRecognition => write!(f, "logo-recognition"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

impl std::str::FromStr for RecordSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "scrape" => Ok(Self::Scrape),
            "catalog-api" => Ok(Self::CatalogApi),
            "logo-recognition" => Ok(Self::LogoRecognition),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("Unknown record source: {s}")),
        }
    }
}

pub const SOURCE_ID_REGISTRY: &str = "jaivik-bharat";
pub const SOURCE_ID_CATALOG: &str = "open-food-facts";
pub const SOURCE_ID_LOGO: &str = "logo-recognition";
pub const SOURCE_ID_MANUAL: &str = "manual";

/// Display name for a concrete upstream source id. Unknown ids are shown as-is.
pub fn source_display_name(source_id: &str) -> &str {
    match source_id {
        "jaivik-bharat" => "Jaivik Bharat (Govt. of India)",
        "open-food-facts" => "Open Food Facts",
        "usda" => "USDA Organic",
        "india-organic" => "India Organic",
        "eu-organic" => "EU Organic",
        "canada-organic" => "Canada Organic",
        "japan-organic" => "JAS Organic",
        other => other,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    pub issuer: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_ref: Option<String>,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    #[serde(default = "new_product_id")]
    pub id: String,
    /// Digits only; empty for items without a known code.
    #[serde(default)]
    pub barcode: String,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<Certification>,
    #[serde(default)]
    pub organic_percentage: u8,
    #[serde(default)]
    pub source: RecordSource,
    #[serde(default = "default_source_id")]
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationVerdict>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

pub fn new_product_id() -> String {
    nanoid::nanoid!()
}

fn default_source_id() -> String {
    SOURCE_ID_MANUAL.to_string()
}

impl ProductRecord {
    pub fn new(name: impl Into<String>, source: RecordSource, source_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_product_id(),
            barcode: String::new(),
            name: name.into(),
            brand: String::new(),
            origin: None,
            description: None,
            ingredients: Vec::new(),
            certifications: Vec::new(),
            organic_percentage: 0,
            source,
            source_id: source_id.into(),
            source_url: None,
            images: Vec::new(),
            verification: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_barcode(mut self, barcode: &str) -> Self {
        self.barcode = crate::search::normalize_barcode(barcode);
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    pub fn with_organic_percentage(mut self, percentage: u8) -> Self {
        self.organic_percentage = percentage.min(100);
        self
    }

    pub fn with_certification(mut self, certification: Certification) -> Self {
        if !self.certifications.contains(&certification) {
            self.certifications.push(certification);
        }
        self
    }

    pub fn is_organic(&self) -> bool {
        self.organic_percentage > 0
    }

    pub fn source_display(&self) -> &str {
        source_display_name(&self.source_id)
    }
}

/// A record as handed back to callers, labelled with its source's display name.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: ProductRecord,
    pub source_display: String,
}

impl From<ProductRecord> for ProductView {
    fn from(product: ProductRecord) -> Self {
        let source_display = product.source_display().to_string();
        Self {
            product,
            source_display,
        }
    }
}
