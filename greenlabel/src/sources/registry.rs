use std::cmp::Reverse;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, REFERER};
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use crate::config::{CacheConfig, SourcesConfig};
use crate::error::{GreenlabelError, Result};
use crate::models::{Certification, ProductRecord, RecordSource, SOURCE_ID_REGISTRY};
use crate::search::{normalize_barcode, LookupRequest, ResultCache};

use super::ProductLookup;

/// Certification bodies whose presence marks a registry row as organic.
pub const ORGANIC_CERTIFIERS: &[&str] = &[
    "NPOP",
    "USDA Organic",
    "EU Organic",
    "India Organic",
    "Jaivik Bharat",
    "PGS-India",
    "APEDA",
    "FSSAI Organic",
];

pub const REGISTRY_RESULT_LIMIT: usize = 15;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Keyword in a product name -> (product type, placeholder image).
const PRODUCT_TYPES: &[(&str, &str, &str)] = &[
    ("rice", "Rice", "/images/rice.jpg"),
    ("wheat", "Wheat", "/images/wheat.jpg"),
    ("pulse", "Pulses", "/images/pulses.jpg"),
    ("spice", "Spices", "/images/spices.jpg"),
    ("tea", "Tea", "/images/tea.jpg"),
    ("coffee", "Coffee", "/images/coffee.jpg"),
    ("honey", "Honey", "/images/honey.jpg"),
    ("oil", "Oil", "/images/oil.jpg"),
    ("flour", "Flour", "/images/flour.jpg"),
];

const GENERIC_PRODUCT_TYPE: &str = "Generic Food Product";
const GENERIC_IMAGE: &str = "/images/food.jpg";

/// Product type and placeholder image inferred from a product name.
pub fn product_type(name: &str) -> (&'static str, &'static str) {
    let lower = name.to_lowercase();
    PRODUCT_TYPES
        .iter()
        .find(|(keyword, _, _)| lower.contains(keyword))
        .map(|(_, kind, image)| (*kind, *image))
        .unwrap_or((GENERIC_PRODUCT_TYPE, GENERIC_IMAGE))
}

/// Scrapes the public search table of the Jaivik Bharat organic registry.
pub struct RegistryScraper {
    client: Client,
    base_url: String,
    cache: ResultCache<String, Vec<ProductRecord>>,
}

impl RegistryScraper {
    pub fn new(sources: &SourcesConfig, cache: &CacheConfig) -> Result<Self> {
        let base_url = sources.registry_base_url.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-IN,en-GB;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        let referer = HeaderValue::from_str(&format!("{base_url}/"))
            .map_err(|e| GreenlabelError::InvalidArgument(format!("Invalid registry URL: {e}")))?;
        headers.insert(REFERER, referer);

        let client = Client::builder()
            .timeout(Duration::from_secs(sources.registry_timeout_secs))
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url,
            cache: ResultCache::new(cache.capacity, Duration::from_secs(cache.registry_ttl_secs)),
        })
    }

    fn search_url(&self, term: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/home/search", self.base_url))?;
        url.query_pairs_mut().append_pair("search_term", term);
        Ok(url)
    }

    /// Organic rows first, then page order, at most fifteen.
    pub async fn search(&self, term: &str) -> Result<Vec<ProductRecord>> {
        let cache_key = term.trim().to_lowercase();
        if let Some(cached) = self.cache.get(&cache_key) {
            tracing::debug!(term, count = cached.len(), "Registry cache hit");
            return Ok(cached);
        }

        let url = self.search_url(term)?;
        let unavailable = |reason: String| GreenlabelError::SourceUnavailable {
            source_id: SOURCE_ID_REGISTRY.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("HTTP {status}")));
        }

        let html = response
            .text()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let results = parse_search_results(&html, url.as_str());
        tracing::info!(term, count = results.len(), "Registry search complete");

        self.cache.put(cache_key, results.clone());
        Ok(results)
    }
}

#[async_trait]
impl ProductLookup for RegistryScraper {
    fn name(&self) -> &str {
        SOURCE_ID_REGISTRY
    }

    fn persists_discoveries(&self) -> bool {
        true
    }

    async fn lookup(&self, request: &LookupRequest) -> Result<Vec<ProductRecord>> {
        self.search(request.search_term()).await
    }
}

/// Turn the registry's result table into records. Rows with fewer than four
/// cells are skipped.
pub fn parse_search_results(html: &str, source_url: &str) -> Vec<ProductRecord> {
    let document = Html::parse_document(html);
    let (Ok(row_selector), Ok(cell_selector)) =
        (Selector::parse("table tbody tr"), Selector::parse("td"))
    else {
        return Vec::new();
    };

    let mut results: Vec<ProductRecord> = document
        .select(&row_selector)
        .filter_map(|row| {
            let cells: Vec<String> = row
                .select(&cell_selector)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect();
            if cells.len() < 4 {
                return None;
            }
            Some(row_to_record(&cells, source_url))
        })
        .collect();

    // stable: ties keep page order
    results.sort_by_key(|record| Reverse(record.organic_percentage));
    results.truncate(REGISTRY_RESULT_LIMIT);
    results
}

fn row_to_record(cells: &[String], source_url: &str) -> ProductRecord {
    let name = &cells[0];
    let brand = if cells[1].is_empty() {
        "Unknown Brand"
    } else {
        cells[1].as_str()
    };
    let certification = &cells[2];
    let license_no = &cells[3];

    let is_organic = ORGANIC_CERTIFIERS
        .iter()
        .any(|certifier| certification.contains(certifier));
    let (_, image) = product_type(name);

    let mut record = ProductRecord::new(name.clone(), RecordSource::Scrape, SOURCE_ID_REGISTRY)
        .with_barcode(license_no)
        .with_brand(brand)
        .with_organic_percentage(if is_organic { 100 } else { 0 });

    if !certification.is_empty() {
        record = record.with_certification(Certification {
            issuer: certification.clone(),
            id: license_no.clone(),
            logo_ref: None,
            verified: is_organic,
        });
    }
    record.origin = Some("India".to_string());
    record.source_url = Some(source_url.to_string());
    record.images = vec![image.to_string()];
    record
}
