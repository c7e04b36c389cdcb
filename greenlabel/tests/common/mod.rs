#![allow(dead_code)]

use std::sync::{Arc, Once};

use greenlabel::config::{Config, DatabaseConfig, OcrConfig};
use greenlabel::db::{Database, LibSqlBackend};
use greenlabel::models::{Certification, ProductRecord, RecordSource, SOURCE_ID_MANUAL};
use greenlabel::services::DiscoveryPipeline;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub async fn temp_store() -> (Arc<LibSqlBackend>, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("greenlabel_test.db");
    let config = DatabaseConfig::for_url(format!("file:{}", db_path.display()));
    let db = Database::new(&config).await.expect("Failed to open database");
    (Arc::new(LibSqlBackend::new(db)), dir)
}

/// Config whose registry, catalog and vision OCR all point at `mock_url`.
pub fn test_config(mock_url: &str) -> Config {
    let mut config = Config::default();
    config.sources.registry_base_url = mock_url.to_string();
    config.sources.catalog_base_url = mock_url.to_string();
    config.sources.registry_timeout_secs = 2;
    config.sources.catalog_search_timeout_secs = 2;
    config.sources.catalog_product_timeout_secs = 2;
    config.verification.branch_timeout_secs = 5;
    config.ocr = OcrConfig {
        model: "openai/gpt-4o-mini".to_string(),
        api_key: Some("test-key".to_string()),
        base_url: Some(format!("{mock_url}/v1")),
        languages: "eng".to_string(),
        timeout_secs: 5,
    };
    config
}

pub async fn test_pipeline(mock_url: &str) -> (DiscoveryPipeline, Arc<LibSqlBackend>, TempDir) {
    init_test_logger();
    let (store, dir) = temp_store().await;
    let pipeline = DiscoveryPipeline::from_config(&test_config(mock_url), store.clone())
        .expect("Failed to build pipeline");
    (pipeline, store, dir)
}

pub fn manual_record(name: &str, barcode: &str) -> ProductRecord {
    ProductRecord::new(name, RecordSource::Manual, SOURCE_ID_MANUAL)
        .with_barcode(barcode)
        .with_brand("Test Brand")
        .with_organic_percentage(95)
        .with_certification(Certification {
            issuer: "India Organic".to_string(),
            id: "IN-ORG-TEST".to_string(),
            logo_ref: None,
            verified: true,
        })
}

const L_CODES: [&str; 10] = [
    "0001101", "0011001", "0010011", "0111101", "0100011", "0110001", "0101111", "0111011",
    "0110111", "0001011",
];
const G_CODES: [&str; 10] = [
    "0100111", "0110011", "0011011", "0100001", "0011101", "0111001", "0000101", "0010001",
    "0001001", "0010111",
];
const R_CODES: [&str; 10] = [
    "1110010", "1100110", "1101100", "1000010", "1011100", "1001110", "1010000", "1000100",
    "1001000", "1110100",
];
const PARITY: [&str; 10] = [
    "LLLLLL", "LLGLGG", "LLGGLG", "LLGGGL", "LGLLGG", "LGGLLG", "LGGGLL", "LGLGLG", "LGLGGL",
    "LGGLGL",
];

/// The 95 modules of an EAN-13 symbol, `true` for a bar.
pub fn ean13_modules(code: &str) -> Vec<bool> {
    let digits: Vec<usize> = code
        .chars()
        .map(|c| c.to_digit(10).expect("digit") as usize)
        .collect();
    assert_eq!(digits.len(), 13, "EAN-13 needs 13 digits");

    let mut pattern = String::from("101");
    let parity = PARITY[digits[0]].as_bytes();
    for (i, &d) in digits[1..7].iter().enumerate() {
        pattern.push_str(if parity[i] == b'L' { L_CODES[d] } else { G_CODES[d] });
    }
    pattern.push_str("01010");
    for &d in &digits[7..] {
        pattern.push_str(R_CODES[d]);
    }
    pattern.push_str("101");

    pattern.chars().map(|c| c == '1').collect()
}

/// PNG of a black-on-white EAN-13 with quiet zones.
pub fn ean13_png(code: &str) -> Vec<u8> {
    const MODULE_PX: u32 = 3;
    const QUIET_MODULES: u32 = 11;
    const HEIGHT: u32 = 150;

    let modules = ean13_modules(code);
    let width = (modules.len() as u32 + 2 * QUIET_MODULES) * MODULE_PX;
    let img = GrayImage::from_fn(width, HEIGHT, |x, y| {
        let module = (x / MODULE_PX) as i64 - QUIET_MODULES as i64;
        let bar = y >= 15
            && y < HEIGHT - 15
            && module >= 0
            && (module as usize) < modules.len()
            && modules[module as usize];
        Luma([if bar { 0 } else { 255 }])
    });

    let mut out = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
        .expect("Failed to encode barcode PNG");
    out
}

pub fn blank_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
        .expect("Failed to encode PNG");
    out
}
