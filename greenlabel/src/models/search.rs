use serde::Serialize;

use super::{ProductRecord, ProductView, Symbology};

/// Result of a text or barcode search.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    pub count: usize,
    pub products: Vec<ProductView>,
}

impl SearchResponse {
    pub fn new(query: Option<String>, barcode: Option<String>, products: Vec<ProductRecord>) -> Self {
        Self {
            query,
            barcode,
            count: products.len(),
            products: views(products),
        }
    }
}

pub fn views(products: Vec<ProductRecord>) -> Vec<ProductView> {
    products.into_iter().map(ProductView::from).collect()
}

/// Result of decoding a barcode photo and resolving its payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub barcode: String,
    pub symbology: Symbology,
    pub count: usize,
    pub products: Vec<ProductView>,
}

/// Result of reading a product photo's label and resolving the synthesized query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSearchResponse {
    pub extracted_text: String,
    pub count: usize,
    pub products: Vec<ProductView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}
