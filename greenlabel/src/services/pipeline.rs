use std::sync::Arc;

use crate::barcode::BarcodeDecoder;
use crate::config::{Config, ImagingConfig};
use crate::db::ProductStore;
use crate::error::{GreenlabelError, Result, IMAGE_SEARCH_HINTS};
use crate::imaging::{preprocess_image, validate_upload, PreprocessMode};
use crate::models::{
    views, ImageSearchResponse, ProductRecord, ProductView, ScanResponse, SearchResponse,
    VerificationVerdict,
};
use crate::ocr::{OcrExtractor, OcrProvider};
use crate::search::{normalize_barcode, LookupRequest};
use crate::sources::CatalogClient;

use super::writes::persistence_error;
use super::{SearchResolver, VerificationService};

/// The four entry points a front end calls: text/barcode search, barcode
/// photo scan, product photo identification and organic verification.
#[derive(Clone)]
pub struct DiscoveryPipeline {
    resolver: SearchResolver,
    verifier: VerificationService,
    decoder: BarcodeDecoder,
    extractor: OcrExtractor,
    store: Arc<dyn ProductStore>,
    imaging: ImagingConfig,
}

impl DiscoveryPipeline {
    pub fn new(
        resolver: SearchResolver,
        verifier: VerificationService,
        decoder: BarcodeDecoder,
        extractor: OcrExtractor,
        store: Arc<dyn ProductStore>,
        imaging: ImagingConfig,
    ) -> Self {
        Self {
            resolver,
            verifier,
            decoder,
            extractor,
            store,
            imaging,
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn ProductStore>) -> Result<Self> {
        let catalog = Arc::new(CatalogClient::new(&config.sources)?);

        tracing::info!(model = %config.ocr.model, "Initializing OCR provider");
        let ocr = OcrProvider::new(&config.ocr)?;
        if !ocr.is_available() {
            tracing::warn!(
                "OCR unavailable - image search will fail and logos are judged on colour only"
            );
        }

        let resolver = SearchResolver::from_config(config, store.clone(), catalog.clone())?;
        let verifier =
            VerificationService::from_config(config, store.clone(), catalog, ocr.clone());

        Ok(Self::new(
            resolver,
            verifier,
            BarcodeDecoder::default(),
            OcrExtractor::new(ocr),
            store,
            config.imaging.clone(),
        ))
    }

    pub async fn search(
        &self,
        query: Option<&str>,
        barcode: Option<&str>,
    ) -> Result<SearchResponse> {
        let request = LookupRequest::new(query, barcode)?;
        let products = self.resolver.resolve_request(&request).await;
        Ok(SearchResponse::new(request.query, request.barcode, products))
    }

    /// Decode a barcode photo and resolve the payload.
    pub async fn scan_barcode(&self, bytes: Vec<u8>) -> Result<ScanResponse> {
        validate_upload(&bytes, self.imaging.upload_max_bytes)?;

        let image = preprocess_image(bytes, PreprocessMode::Barcode, &self.imaging).await?;
        let (payload, symbology) = self.decoder.decode(image).await?.into_error_or_payload()?;

        // Alphanumeric CODE_39/CODE_128 labels carry no retail number to look up.
        let barcode = normalize_barcode(&payload);
        if barcode.is_empty() {
            tracing::info!(%payload, %symbology, "Decoded payload has no digits, skipping lookup");
            return Ok(ScanResponse {
                barcode: payload,
                symbology,
                count: 0,
                products: Vec::new(),
            });
        }

        let request = LookupRequest::barcode_only(&barcode)?;
        let products = self.resolver.resolve_request(&request).await;

        Ok(ScanResponse {
            barcode,
            symbology,
            count: products.len(),
            products: views(products),
        })
    }

    /// Read the label on a product photo and search by the best-looking line.
    pub async fn search_by_image(&self, bytes: Vec<u8>) -> Result<ImageSearchResponse> {
        validate_upload(&bytes, self.imaging.upload_max_bytes)?;

        let image = preprocess_image(bytes, PreprocessMode::Barcode, &self.imaging).await?;
        let extracted_text = self.extractor.extract(&image).await?;

        let products = if extracted_text.is_empty() {
            tracing::info!("No label line looked like a product name");
            Vec::new()
        } else {
            let request = LookupRequest::new(Some(&extracted_text), None)?;
            self.resolver.resolve_request(&request).await
        };

        let suggestions = if products.is_empty() {
            IMAGE_SEARCH_HINTS.iter().map(|s| s.to_string()).collect()
        } else {
            Vec::new()
        };

        Ok(ImageSearchResponse {
            extracted_text,
            count: products.len(),
            products: views(products),
            suggestions,
        })
    }

    pub async fn verify(
        &self,
        barcode: Option<&str>,
        image: Option<Vec<u8>>,
    ) -> Result<VerificationVerdict> {
        if let Some(bytes) = image.as_deref() {
            validate_upload(bytes, self.imaging.upload_max_bytes)?;
        }
        self.verifier.verify(barcode, image).await
    }

    /// One stored product by id.
    pub async fn product_details(&self, id: &str) -> Result<ProductView> {
        let id = id.trim();
        if id.is_empty() {
            return Err(GreenlabelError::InvalidArgument(
                "A product id is required".to_string(),
            ));
        }

        match self.store.find_by_id(id).await? {
            Some(record) => Ok(record.into()),
            None => Err(GreenlabelError::NotFound(format!("Product {id}"))),
        }
    }

    /// Wait for background writes (discovered products, cached verdicts) to finish.
    pub async fn flush(&self) {
        self.resolver.flush_pending().await;
        self.verifier.flush_pending().await;
    }

    /// Store a manually entered product. Barcodes must be unique.
    pub async fn add_product(&self, mut record: ProductRecord) -> Result<ProductRecord> {
        record.name = record.name.trim().to_string();
        record.barcode = normalize_barcode(&record.barcode);
        record.organic_percentage = record.organic_percentage.min(100);

        if record.name.is_empty() || record.barcode.is_empty() {
            return Err(GreenlabelError::InvalidArgument(
                "Name and barcode are required".to_string(),
            ));
        }

        if self.store.find_by_barcode(&record.barcode).await?.is_some() {
            return Err(GreenlabelError::InvalidArgument(
                "Product with this barcode already exists".to_string(),
            ));
        }

        self.store.save(&record).await.map_err(persistence_error)?;
        tracing::info!(id = %record.id, barcode = %record.barcode, "Product added");
        Ok(record)
    }

    /// Bulk-load records, skipping ones already present. Returns how many were inserted.
    pub async fn seed(&self, records: Vec<ProductRecord>) -> Result<usize> {
        let records: Vec<ProductRecord> = records
            .into_iter()
            .map(|mut r| {
                r.barcode = normalize_barcode(&r.barcode);
                r.organic_percentage = r.organic_percentage.min(100);
                r
            })
            .collect();

        let inserted = self.store.insert_many(&records).await?;
        tracing::info!(inserted, offered = records.len(), "Store seeded");
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::{DecodedSymbol, SymbologyReader};
    use crate::config::OcrConfig;
    use crate::db::ProductFilter;
    use crate::models::{RecordSource, Symbology, SOURCE_ID_MANUAL};
    use crate::search::ResultCache;
    use crate::sources::{LocalLookup, ProductLookup};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<Vec<ProductRecord>>,
    }

    #[async_trait]
    impl ProductStore for MemoryStore {
        async fn find_matching(
            &self,
            filter: &ProductFilter,
            limit: usize,
        ) -> Result<Vec<ProductRecord>> {
            let text = filter.text.as_deref().unwrap_or_default().to_lowercase();
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| !text.is_empty() && r.name.to_lowercase().contains(&text))
                .take(limit)
                .cloned()
                .collect())
        }
        async fn insert_many(&self, records: &[ProductRecord]) -> Result<usize> {
            self.records.lock().unwrap().extend_from_slice(records);
            Ok(records.len())
        }
        async fn find_by_id(&self, id: &str) -> Result<Option<ProductRecord>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .cloned())
        }
        async fn find_by_barcode(&self, barcode: &str) -> Result<Option<ProductRecord>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.barcode == barcode)
                .cloned())
        }
        async fn save(&self, record: &ProductRecord) -> Result<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
        async fn sync(&self) -> Result<()> {
            Ok(())
        }
    }

    fn ocr_config() -> OcrConfig {
        OcrConfig {
            model: "local/tesseract".to_string(),
            api_key: None,
            base_url: None,
            languages: "eng".to_string(),
            timeout_secs: 5,
        }
    }

    /// Reports the same symbol for every image.
    struct FixedReader(DecodedSymbol);

    impl SymbologyReader for FixedReader {
        fn read(&self, _: &[u8], _: u32, _: u32) -> Option<DecodedSymbol> {
            Some(self.0.clone())
        }
    }

    fn pipeline(store: Arc<MemoryStore>) -> DiscoveryPipeline {
        pipeline_with_decoder(store, BarcodeDecoder::default())
    }

    fn pipeline_reading(store: Arc<MemoryStore>, payload: &str, symbology: Symbology) -> DiscoveryPipeline {
        let reader = FixedReader(DecodedSymbol {
            payload: payload.to_string(),
            symbology,
        });
        pipeline_with_decoder(store, BarcodeDecoder::new(Arc::new(reader)))
    }

    fn pipeline_with_decoder(store: Arc<MemoryStore>, decoder: BarcodeDecoder) -> DiscoveryPipeline {
        let store: Arc<dyn ProductStore> = store;
        let sources: Vec<Arc<dyn ProductLookup>> =
            vec![Arc::new(LocalLookup::new(store.clone()))];
        let resolver = SearchResolver::new(
            sources,
            store.clone(),
            ResultCache::new(10, Duration::from_secs(60)),
        );
        let verifier = VerificationService::new(Vec::new(), store.clone(), Duration::from_secs(1));
        let ocr = OcrProvider::unavailable("disabled in tests", &ocr_config());

        DiscoveryPipeline::new(
            resolver,
            verifier,
            decoder,
            OcrExtractor::new(ocr),
            store,
            ImagingConfig::default(),
        )
    }

    fn png(side: u32) -> Vec<u8> {
        let mut png = Vec::new();
        image::DynamicImage::new_rgb8(side, side)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        png
    }

    fn record(name: &str, barcode: &str) -> ProductRecord {
        ProductRecord::new(name, RecordSource::Manual, SOURCE_ID_MANUAL).with_barcode(barcode)
    }

    #[tokio::test]
    async fn test_add_product_rejects_duplicate_barcode() {
        let pipeline = pipeline(Arc::new(MemoryStore::default()));

        pipeline
            .add_product(record("Organic Basmati", "8901234567890"))
            .await
            .unwrap();
        let err = pipeline
            .add_product(record("Another Rice", "8901234567890"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "invalid_argument");
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_add_product_requires_name_and_barcode() {
        let pipeline = pipeline(Arc::new(MemoryStore::default()));
        let err = pipeline.add_product(record("  ", "123")).await.unwrap_err();
        assert_eq!(err.code(), "invalid_argument");

        let err = pipeline.add_product(record("Ghee", "")).await.unwrap_err();
        assert_eq!(err.code(), "invalid_argument");
    }

    #[tokio::test]
    async fn test_search_echoes_normalized_inputs() {
        let store = Arc::new(MemoryStore::default());
        let pipeline = pipeline(store.clone());
        pipeline
            .seed(vec![record("Organic Jaggery Powder", "8900000000017")])
            .await
            .unwrap();

        let response = pipeline.search(Some("  jaggery "), None).await.unwrap();

        assert_eq!(response.query.as_deref(), Some("jaggery"));
        assert_eq!(response.count, 1);
        assert_eq!(response.products[0].product.name, "Organic Jaggery Powder");
        assert_eq!(response.products[0].source_display, "manual");
    }

    #[tokio::test]
    async fn test_scan_rejects_non_image_upload() {
        let pipeline = pipeline(Arc::new(MemoryStore::default()));
        let err = pipeline
            .scan_barcode(b"%PDF-1.4 not an image".to_vec())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "unsupported_media");
    }

    #[tokio::test]
    async fn test_scan_of_alphanumeric_code39_returns_payload_without_lookup() {
        let pipeline = pipeline_reading(
            Arc::new(MemoryStore::default()),
            "ORGANIC-TEA",
            Symbology::Code39,
        );

        let response = pipeline.scan_barcode(png(64)).await.unwrap();

        assert_eq!(response.barcode, "ORGANIC-TEA");
        assert_eq!(response.symbology, Symbology::Code39);
        assert_eq!(response.count, 0);
        assert!(response.products.is_empty());
    }

    #[tokio::test]
    async fn test_scan_resolves_digits_of_decoded_payload() {
        let store = Arc::new(MemoryStore::default());
        let pipeline = pipeline_reading(store.clone(), "890-1234-567890", Symbology::Code128);
        pipeline
            .add_product(record("Organic Basmati", "8901234567890"))
            .await
            .unwrap();

        let response = pipeline.scan_barcode(png(64)).await.unwrap();

        assert_eq!(response.barcode, "8901234567890");
        assert_eq!(response.symbology, Symbology::Code128);
        assert_eq!(response.count, 1);
        assert_eq!(response.products[0].product.name, "Organic Basmati");
    }

    #[tokio::test]
    async fn test_product_details_by_id() {
        let pipeline = pipeline(Arc::new(MemoryStore::default()));
        let stored = pipeline
            .add_product(record("Organic Ghee", "8900000000024"))
            .await
            .unwrap();

        let view = pipeline.product_details(&stored.id).await.unwrap();
        assert_eq!(view.product.name, "Organic Ghee");
        assert_eq!(view.source_display, "manual");

        let err = pipeline.product_details("no-such-id").await.unwrap_err();
        assert_eq!(err.code(), "not_found");

        let err = pipeline.product_details("  ").await.unwrap_err();
        assert_eq!(err.code(), "invalid_argument");
    }

    #[tokio::test]
    async fn test_image_search_without_ocr_reports_unavailable() {
        let pipeline = pipeline(Arc::new(MemoryStore::default()));
        let err = pipeline.search_by_image(png(32)).await.unwrap_err();
        assert_eq!(err.code(), "ocr_unavailable");
    }

    #[tokio::test]
    async fn test_verify_without_inputs_is_invalid() {
        let pipeline = pipeline(Arc::new(MemoryStore::default()));
        let err = pipeline.verify(None, None).await.unwrap_err();
        assert_eq!(err.code(), "invalid_argument");
    }
}
