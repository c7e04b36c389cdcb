use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub ocr: OcrConfig,
    pub imaging: ImagingConfig,
    pub sources: SourcesConfig,
    pub cache: CacheConfig,
    pub verification: VerificationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    /// Embedded replica file when `url` points at a remote primary.
    pub local_path: Option<String>,
    pub busy_timeout_ms: u64,
    pub journal_mode: String,
    pub synchronous: String,
}

impl DatabaseConfig {
    /// Database at `url` with default pragmas and no credentials.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            local_path: None,
            busy_timeout_ms: 5000,
            journal_mode: "WAL".to_string(),
            synchronous: "NORMAL".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub languages: String,
    pub timeout_secs: u64,
}

/// Pixel pipeline parameters shared by the barcode and logo preprocessing modes.
#[derive(Debug, Clone, Deserialize)]
pub struct ImagingConfig {
    /// Side of the square canvas barcode images are fitted into.
    pub barcode_canvas_size: u32,
    /// Luminance at or above which a pixel becomes white after binarization.
    pub barcode_threshold: u8,
    /// Multiplier of the linear contrast stretch.
    pub barcode_contrast_gain: f32,
    /// Bounding box for logo images; smaller images are never enlarged.
    pub logo_max_dimension: u32,
    pub upload_max_bytes: usize,
}

impl Default for ImagingConfig {
    fn default() -> Self {
        Self {
            barcode_canvas_size: 1200,
            barcode_threshold: 128,
            barcode_contrast_gain: 1.2,
            logo_max_dimension: 800,
            upload_max_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub registry_base_url: String,
    pub registry_timeout_secs: u64,
    pub catalog_base_url: String,
    pub catalog_search_timeout_secs: u64,
    pub catalog_product_timeout_secs: u64,
    pub catalog_page_size: u32,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            registry_base_url: "https://jaivikbharat.fssai.gov.in".to_string(),
            registry_timeout_secs: 15,
            catalog_base_url: "https://world.openfoodfacts.org".to_string(),
            catalog_search_timeout_secs: 20,
            catalog_product_timeout_secs: 5,
            catalog_page_size: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub search_ttl_secs: u64,
    pub registry_ttl_secs: u64,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            search_ttl_secs: 600,
            registry_ttl_secs: 3600,
            capacity: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    /// Upper bound on each verification branch; a branch that overruns contributes nothing.
    pub branch_timeout_secs: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            branch_timeout_secs: 10,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let imaging = ImagingConfig::default();
        let sources = SourcesConfig::default();
        let cache = CacheConfig::default();
        let verification = VerificationConfig::default();

        Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:greenlabel.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
                busy_timeout_ms: parse_env_or("DATABASE_BUSY_TIMEOUT_MS", 5000),
                journal_mode: env::var("DATABASE_JOURNAL_MODE")
                    .unwrap_or_else(|_| "WAL".to_string()),
                synchronous: env::var("DATABASE_SYNCHRONOUS")
                    .unwrap_or_else(|_| "NORMAL".to_string()),
            },
            ocr: OcrConfig {
                model: env::var("OCR_MODEL").unwrap_or_else(|_| "local/tesseract".to_string()),
                api_key: env::var("OCR_API_KEY").ok(),
                base_url: env::var("OCR_BASE_URL").ok(),
                languages: env::var("OCR_LANGUAGES").unwrap_or_else(|_| "eng".to_string()),
                timeout_secs: parse_env_or("OCR_TIMEOUT", 60),
            },
            imaging: ImagingConfig {
                barcode_canvas_size: parse_env_or(
                    "BARCODE_CANVAS_SIZE",
                    imaging.barcode_canvas_size,
                ),
                barcode_threshold: parse_env_or("BARCODE_THRESHOLD", imaging.barcode_threshold),
                barcode_contrast_gain: parse_env_or(
                    "BARCODE_CONTRAST_GAIN",
                    imaging.barcode_contrast_gain,
                ),
                logo_max_dimension: parse_env_or("LOGO_MAX_DIMENSION", imaging.logo_max_dimension),
                upload_max_bytes: parse_env_or("UPLOAD_MAX_BYTES", imaging.upload_max_bytes),
            },
            sources: SourcesConfig {
                registry_base_url: env::var("REGISTRY_BASE_URL")
                    .unwrap_or(sources.registry_base_url),
                registry_timeout_secs: parse_env_or(
                    "REGISTRY_TIMEOUT",
                    sources.registry_timeout_secs,
                ),
                catalog_base_url: env::var("CATALOG_BASE_URL").unwrap_or(sources.catalog_base_url),
                catalog_search_timeout_secs: parse_env_or(
                    "CATALOG_SEARCH_TIMEOUT",
                    sources.catalog_search_timeout_secs,
                ),
                catalog_product_timeout_secs: parse_env_or(
                    "CATALOG_PRODUCT_TIMEOUT",
                    sources.catalog_product_timeout_secs,
                ),
                catalog_page_size: parse_env_or("CATALOG_PAGE_SIZE", sources.catalog_page_size),
            },
            cache: CacheConfig {
                search_ttl_secs: parse_env_or("SEARCH_CACHE_TTL_SECS", cache.search_ttl_secs),
                registry_ttl_secs: parse_env_or(
                    "REGISTRY_CACHE_TTL_SECS",
                    cache.registry_ttl_secs,
                ),
                capacity: parse_env_or("CACHE_CAPACITY", cache.capacity),
            },
            verification: VerificationConfig {
                branch_timeout_secs: parse_env_or(
                    "VERIFY_BRANCH_TIMEOUT_SECS",
                    verification.branch_timeout_secs,
                ),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Split an OCR model name into (provider, model), defaulting to local Tesseract.
pub fn parse_ocr_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        if prefix.eq_ignore_ascii_case("openai") {
            return ("openai", rest);
        }
        if prefix.eq_ignore_ascii_case("local") {
            return ("local", rest);
        }
    }
    ("local", model)
}
