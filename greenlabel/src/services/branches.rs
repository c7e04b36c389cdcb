use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::config::ImagingConfig;
use crate::db::ProductStore;
use crate::imaging::{preprocess_image, PreprocessMode};
use crate::models::{
    BranchContribution, BranchOutcome, RecordSource, SOURCE_ID_CATALOG, SOURCE_ID_LOGO,
    SOURCE_ID_REGISTRY,
};
use crate::ocr::{OcrProvider, RecognitionProfile};
use crate::sources::{is_organic_product, CatalogClient};

/// Words on a label or certification mark that suggest organic produce.
pub const ORGANIC_KEYWORDS: &[&str] = &[
    "organic",
    "bio",
    "eco",
    "natural",
    "jaivik",
    "organic india",
    "usda",
    "india organic",
    "certified organic",
    "जैविक",
    "ऑर्गेनिक",
];

const KEYWORD_BASE_SCORE: u8 = 90;
const KEYWORD_STEP: u8 = 3;
const GREEN_ONLY_SCORE: u8 = 75;

/// What a verification request carries. Branches ignore inputs they do not use.
#[derive(Debug, Clone, Default)]
pub struct VerificationInput {
    pub barcode: Option<String>,
    pub image: Option<Arc<Vec<u8>>>,
}

/// One independent source of organic evidence.
#[async_trait]
pub trait VerificationBranch: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, input: &VerificationInput) -> BranchOutcome;
}

/// Open Food Facts product entry for the barcode.
pub struct CatalogBranch {
    catalog: Arc<CatalogClient>,
}

impl CatalogBranch {
    pub fn new(catalog: Arc<CatalogClient>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl VerificationBranch for CatalogBranch {
    fn name(&self) -> &str {
        SOURCE_ID_CATALOG
    }

    async fn run(&self, input: &VerificationInput) -> BranchOutcome {
        let Some(barcode) = input.barcode.as_deref() else {
            return BranchOutcome::Empty;
        };

        match self.catalog.product(barcode).await {
            Ok(Some(product)) => {
                let organic = is_organic_product(&product);
                BranchOutcome::Contributed(
                    BranchContribution::new(SOURCE_ID_CATALOG, organic, if organic { 100 } else { 0 })
                        .with_detail(json!({
                            "code": product.code,
                            "productName": product.product_name,
                            "labelsTags": product.labels_tags,
                            "categoriesTags": product.categories_tags,
                        })),
                )
            }
            Ok(None) => BranchOutcome::Empty,
            Err(e) => BranchOutcome::Failed(e.to_string()),
        }
    }
}

/// A stored record that came from the registry scrape vouches for its own percentage.
pub struct RegistryRecordBranch {
    store: Arc<dyn ProductStore>,
}

impl RegistryRecordBranch {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl VerificationBranch for RegistryRecordBranch {
    fn name(&self) -> &str {
        SOURCE_ID_REGISTRY
    }

    async fn run(&self, input: &VerificationInput) -> BranchOutcome {
        let Some(barcode) = input.barcode.as_deref() else {
            return BranchOutcome::Empty;
        };

        match self.store.find_by_barcode(barcode).await {
            Ok(Some(record)) if record.source == RecordSource::Scrape => {
                let percentage = record.organic_percentage;
                BranchOutcome::Contributed(
                    BranchContribution::new(SOURCE_ID_REGISTRY, percentage > 0, percentage)
                        .with_detail(json!({
                            "productId": record.id,
                            "name": record.name,
                            "certifications": record.certifications,
                            "sourceUrl": record.source_url,
                        })),
                )
            }
            Ok(_) => BranchOutcome::Empty,
            Err(e) => BranchOutcome::Failed(e.to_string()),
        }
    }
}

/// Organic keywords and green-dominant colouring on a logo photo.
pub struct LogoBranch {
    ocr: OcrProvider,
    imaging: ImagingConfig,
}

impl LogoBranch {
    pub fn new(ocr: OcrProvider, imaging: ImagingConfig) -> Self {
        Self { ocr, imaging }
    }
}

/// Distinct keywords present in `text`, in keyword-list order.
pub fn detect_keywords(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    ORGANIC_KEYWORDS
        .iter()
        .copied()
        .filter(|k| lower.contains(k))
        .collect()
}

pub fn is_green_dominant([r, g, b]: [u8; 3]) -> bool {
    r < 150 && g > 150 && b < 150
}

/// 90 for the first keyword plus 3 per additional one (capped at 100),
/// 75 for colour alone, else 0.
pub fn logo_score(keyword_count: usize, green_dominant: bool) -> u8 {
    if keyword_count > 0 {
        let extra = (keyword_count - 1).saturating_mul(KEYWORD_STEP as usize);
        (KEYWORD_BASE_SCORE as usize).saturating_add(extra).min(100) as u8
    } else if green_dominant {
        GREEN_ONLY_SCORE
    } else {
        0
    }
}

#[async_trait]
impl VerificationBranch for LogoBranch {
    fn name(&self) -> &str {
        SOURCE_ID_LOGO
    }

    async fn run(&self, input: &VerificationInput) -> BranchOutcome {
        let Some(image) = input.image.as_ref() else {
            return BranchOutcome::Empty;
        };

        let processed =
            match preprocess_image(image.as_ref().clone(), PreprocessMode::Logo, &self.imaging).await
            {
                Ok(processed) => processed,
                Err(e) => return BranchOutcome::Failed(e.to_string()),
            };

        // colour evidence still counts when no text can be read
        let text = match processed.to_png() {
            Ok(png) => match self.ocr.recognize(&png, RecognitionProfile::Logo).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "Logo text recognition failed");
                    String::new()
                }
            },
            Err(e) => return BranchOutcome::Failed(e.to_string()),
        };

        let keywords = detect_keywords(&text);
        let dominant = processed.dominant_color();
        let green = is_green_dominant(dominant);
        let score = logo_score(keywords.len(), green);

        BranchOutcome::Contributed(
            BranchContribution::new(SOURCE_ID_LOGO, !keywords.is_empty() || green, score)
                .with_detail(json!({
                    "detectedKeywords": keywords,
                    "dominantColor": {"r": dominant[0], "g": dominant[1], "b": dominant[2]},
                    "confidence": score,
                })),
        )
    }
}
