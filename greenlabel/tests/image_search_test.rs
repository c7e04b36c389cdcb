use std::path::PathBuf;

use greenlabel::cli::{self, Command};
use greenlabel::db::ProductStore;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{blank_png, test_pipeline};

fn seed_file() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join("seed_products.json")
}

fn vision_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"content": text}}]
    }))
}

#[tokio::test]
async fn test_label_photo_resolves_seeded_product() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(vision_reply("NET WT 500g\nOrganic Turmeric Powder\nFSSAI 1001\nMRP"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (pipeline, _store, _dir) = test_pipeline(&mock_server.uri()).await;
    cli::run(&pipeline, Command::Seed { json: seed_file() })
        .await
        .unwrap();

    let response = pipeline.search_by_image(blank_png(320, 240)).await.unwrap();

    assert_eq!(response.extracted_text, "Organic Turmeric Powder");
    assert_eq!(response.count, 1);
    assert_eq!(response.products[0].product.brand, "Organic India");
    assert!(response.suggestions.is_empty());
}

#[tokio::test]
async fn test_label_without_name_line_returns_suggestions() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(vision_reply("500\n12.5\nA1"))
        .mount(&mock_server)
        .await;

    let (pipeline, _store, _dir) = test_pipeline(&mock_server.uri()).await;
    let response = pipeline.search_by_image(blank_png(64, 64)).await.unwrap();

    assert_eq!(response.extracted_text, "");
    assert_eq!(response.count, 0);
    assert_eq!(response.suggestions.len(), 3);
}

#[tokio::test]
async fn test_empty_ocr_text_is_extraction_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(vision_reply("   "))
        .mount(&mock_server)
        .await;

    let (pipeline, _store, _dir) = test_pipeline(&mock_server.uri()).await;
    let err = pipeline.search_by_image(blank_png(64, 64)).await.unwrap_err();

    assert_eq!(err.code(), "extraction_failed");
    assert_eq!(err.suggestions().len(), 3);
}

#[tokio::test]
async fn test_green_logo_with_keywords_verifies_organic() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(vision_reply("INDIA ORGANIC\nCertified Organic"))
        .mount(&mock_server)
        .await;

    let (pipeline, _store, _dir) = test_pipeline(&mock_server.uri()).await;

    let mut logo = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        48,
        48,
        image::Rgb([30, 180, 70]),
    ))
    .write_to(&mut std::io::Cursor::new(&mut logo), image::ImageFormat::Png)
    .unwrap();

    let verdict = pipeline.verify(None, Some(logo)).await.unwrap();

    // organic, india organic, certified organic
    assert!(verdict.is_organic);
    assert_eq!(verdict.percentage, 96);
    assert!(verdict.sources.contains("logo-recognition"));
    assert_eq!(verdict.details[0].detail["confidence"], json!(96));
}

#[tokio::test]
async fn test_seed_file_loads_once() {
    let mock_server = MockServer::start().await;
    let (pipeline, store, _dir) = test_pipeline(&mock_server.uri()).await;

    let first = cli::run(&pipeline, Command::Seed { json: seed_file() })
        .await
        .unwrap();
    let second = cli::run(&pipeline, Command::Seed { json: seed_file() })
        .await
        .unwrap();

    assert_eq!(first, json!({"offered": 5, "inserted": 5}));
    assert_eq!(second, json!({"offered": 5, "inserted": 0}));
    assert_eq!(store.count().await.unwrap(), 5);

    let output = cli::run(
        &pipeline,
        Command::Search {
            query: Some("usda organic".to_string()),
            barcode: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(output["count"], json!(2));
    assert_eq!(output["products"][0]["sourceDisplay"], json!("manual"));
}

#[tokio::test]
async fn test_show_returns_seeded_product_by_id() {
    let mock_server = MockServer::start().await;
    let (pipeline, store, _dir) = test_pipeline(&mock_server.uri()).await;
    cli::run(&pipeline, Command::Seed { json: seed_file() })
        .await
        .unwrap();

    let rice = store.find_by_barcode("123456789012").await.unwrap().unwrap();
    let output = cli::run(&pipeline, Command::Show { id: rice.id.clone() })
        .await
        .unwrap();

    assert_eq!(output["id"], json!(rice.id));
    assert_eq!(output["name"], json!("Organic Basmati Rice"));
    assert_eq!(output["sourceDisplay"], json!("manual"));

    let err = cli::run(
        &pipeline,
        Command::Show {
            id: "missing-product".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "not_found");
    assert!(err.to_string().contains("missing-product"));
}
