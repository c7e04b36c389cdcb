use std::sync::Arc;

use crate::error::{GreenlabelError, Result, BARCODE_HINTS};
use crate::imaging::PreprocessedImage;
use crate::models::DecodeResult;

use super::{RxingReader, SymbologyReader};

pub const NO_BARCODE_REASON: &str = "No barcode detected. Please try a clearer image.";

/// Reads a barcode from a preprocessed image, retrying once on the
/// photometric negative for light-on-dark prints.
#[derive(Clone)]
pub struct BarcodeDecoder {
    reader: Arc<dyn SymbologyReader>,
}

impl Default for BarcodeDecoder {
    fn default() -> Self {
        Self::new(Arc::new(RxingReader::new()))
    }
}

impl BarcodeDecoder {
    pub fn new(reader: Arc<dyn SymbologyReader>) -> Self {
        Self { reader }
    }

    pub fn decode_blocking(&self, image: &PreprocessedImage) -> DecodeResult {
        let (width, height) = (image.width(), image.height());

        if let Some(symbol) = self.reader.read(&image.luminance(), width, height) {
            return success(symbol);
        }

        tracing::debug!(width, height, "Direct decode failed, retrying inverted");
        if let Some(symbol) = self.reader.read(&image.inverted().luminance(), width, height) {
            return success(symbol);
        }

        DecodeResult::Failure {
            reason: NO_BARCODE_REASON.to_string(),
            remediation_hints: BARCODE_HINTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub async fn decode(&self, image: PreprocessedImage) -> Result<DecodeResult> {
        let decoder = self.clone();
        tokio::task::spawn_blocking(move || decoder.decode_blocking(&image))
            .await
            .map_err(|e| GreenlabelError::Internal(format!("Barcode task panicked: {e}")))
    }
}

fn success(symbol: super::DecodedSymbol) -> DecodeResult {
    tracing::info!(
        symbology = %symbol.symbology,
        payload = %symbol.payload,
        "Barcode decoded"
    );
    DecodeResult::Success {
        payload: symbol.payload,
        symbology: symbol.symbology,
    }
}
