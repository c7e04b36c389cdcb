use greenlabel::db::ProductStore;
use greenlabel::models::{RecordSource, VerificationStatus};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{manual_record, test_pipeline};

const REGISTRY_PAGE: &str = r#"
<html><body>
<table>
  <thead><tr><th>Product</th><th>Brand</th><th>Certification</th><th>License</th></tr></thead>
  <tbody>
    <tr><td>Basmati Rice Regular</td><td>Local Mills</td><td>None</td><td>10012345000111</td></tr>
    <tr><td>Organic Basmati Rice</td><td>Natureland</td><td>NPOP, India Organic</td><td>10012345000222</td></tr>
  </tbody>
</table>
</body></html>
"#;

#[tokio::test]
async fn test_local_match_skips_remote_sources() {
    let mock_server = MockServer::start().await;
    Mock::given(path_regex(".*"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (pipeline, _store, _dir) = test_pipeline(&mock_server.uri()).await;
    pipeline
        .seed(vec![manual_record("Organic Turmeric Powder", "345678901234")])
        .await
        .unwrap();

    let by_name = pipeline.search(Some("TURMERIC"), None).await.unwrap();
    let by_barcode = pipeline.search(None, Some("3456-7890-1234")).await.unwrap();

    assert_eq!(by_name.count, 1);
    assert_eq!(by_barcode.barcode.as_deref(), Some("345678901234"));
    assert_eq!(by_barcode.products[0].product.name, "Organic Turmeric Powder");
}

#[tokio::test]
async fn test_registry_results_are_returned_and_written_back() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/home/search"))
        .and(query_param("search_term", "basmati"))
        .respond_with(ResponseTemplate::new(200).set_body_string(REGISTRY_PAGE))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(path("/cgi/search.pl"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (pipeline, store, _dir) = test_pipeline(&mock_server.uri()).await;

    let response = pipeline.search(Some("basmati"), None).await.unwrap();
    pipeline.flush().await;

    assert_eq!(response.count, 2);
    assert_eq!(response.products[0].product.name, "Organic Basmati Rice");
    assert_eq!(response.products[0].product.organic_percentage, 100);
    assert_eq!(response.products[0].product.source, RecordSource::Scrape);
    assert_eq!(
        response.products[0].source_display,
        "Jaivik Bharat (Govt. of India)"
    );

    let saved = store
        .find_by_barcode("10012345000222")
        .await
        .unwrap()
        .expect("scraped record should be stored");
    assert_eq!(saved.source_id, "jaivik-bharat");
    assert_eq!(store.count().await.unwrap(), 2);

    // Second identical search is served from cache; the registry mock expects one call.
    let again = pipeline.search(Some("Basmati"), None).await.unwrap();
    assert_eq!(again.count, 2);
}

#[tokio::test]
async fn test_registry_outage_falls_back_to_catalog() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/home/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cgi/search.pl"))
        .and(query_param("search_terms", "quinoa"))
        .and(query_param("json", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [
                {
                    "code": "8901234567890",
                    "product_name": "Organic Quinoa",
                    "brands": "Ancient Harvest",
                    "labels_tags": ["en:organic"]
                },
                {
                    "code": "8900000000000",
                    "product_name": "Quinoa Puffs",
                    "labels_tags": []
                }
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (pipeline, store, _dir) = test_pipeline(&mock_server.uri()).await;

    let response = pipeline.search(Some("quinoa"), None).await.unwrap();
    pipeline.flush().await;

    assert_eq!(response.count, 1);
    let product = &response.products[0].product;
    assert_eq!(product.name, "Organic Quinoa");
    assert_eq!(product.source, RecordSource::CatalogApi);
    assert_eq!(product.organic_percentage, 70);
    assert_eq!(product.certifications[0].id, "OFF-8901234567890");
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_nothing_anywhere_returns_empty() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/home/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&mock_server)
        .await;
    Mock::given(path("/cgi/search.pl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"products": []})))
        .mount(&mock_server)
        .await;

    let (pipeline, _store, _dir) = test_pipeline(&mock_server.uri()).await;
    let response = pipeline.search(Some("unobtainium"), None).await.unwrap();

    assert_eq!(response.count, 0);
    assert!(response.products.is_empty());
}

#[tokio::test]
async fn test_catalog_verification_is_cached_on_record() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v0/product/8901234567890.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 1,
            "product": {
                "code": "8901234567890",
                "product_name": "Organic Quinoa",
                "labels_tags": ["en:organic", "en:usda-organic"]
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (pipeline, store, _dir) = test_pipeline(&mock_server.uri()).await;
    store
        .save(&manual_record("Organic Quinoa", "8901234567890"))
        .await
        .unwrap();

    let verdict = pipeline.verify(Some("8901234567890"), None).await.unwrap();
    pipeline.flush().await;

    assert!(verdict.is_organic);
    assert_eq!(verdict.percentage, 100);
    assert_eq!(verdict.status, VerificationStatus::Verified);
    assert!(verdict.sources.contains("open-food-facts"));

    let stored = store.find_by_barcode("8901234567890").await.unwrap().unwrap();
    assert_eq!(stored.verification, Some(verdict));
    assert_eq!(stored.organic_percentage, 95);
}

#[tokio::test]
async fn test_registry_record_contributes_to_verification() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/api/v0/product/10012345000222.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let (pipeline, store, _dir) = test_pipeline(&mock_server.uri()).await;
    let mut scraped = manual_record("Organic Basmati Rice", "10012345000222");
    scraped.source = RecordSource::Scrape;
    scraped.source_id = "jaivik-bharat".to_string();
    scraped.organic_percentage = 100;
    store.save(&scraped).await.unwrap();

    let verdict = pipeline.verify(Some("10012345000222"), None).await.unwrap();

    assert!(verdict.is_organic);
    assert_eq!(verdict.percentage, 100);
    assert_eq!(verdict.sources.len(), 1);
    assert!(verdict.sources.contains("jaivik-bharat"));
}

#[tokio::test]
async fn test_unknown_barcode_verification_is_unavailable() {
    let mock_server = MockServer::start().await;
    Mock::given(path_regex(r"^/api/v0/product/\d+\.json$"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let (pipeline, store, _dir) = test_pipeline(&mock_server.uri()).await;
    let verdict = pipeline.verify(Some("0000000000000"), None).await.unwrap();

    assert!(!verdict.is_organic);
    assert_eq!(verdict.percentage, 0);
    assert!(verdict.sources.is_empty());
    assert_eq!(verdict.status, VerificationStatus::Unavailable);
    assert_eq!(
        verdict.message.as_deref(),
        Some("No verification sources available")
    );
    assert_eq!(store.count().await.unwrap(), 0);
}
