use std::collections::HashSet;

use rxing::{BarcodeFormat, DecodeHintType, DecodeHintValue, DecodingHintDictionary};

use crate::models::Symbology;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSymbol {
    pub payload: String,
    pub symbology: Symbology,
}

/// One structural decode attempt over a row-major luminance buffer.
pub trait SymbologyReader: Send + Sync {
    fn read(&self, luminance: &[u8], width: u32, height: u32) -> Option<DecodedSymbol>;
}

/// Production reader restricted to the linear retail symbologies.
#[derive(Debug, Clone, Default)]
pub struct RxingReader;

impl RxingReader {
    pub fn new() -> Self {
        Self
    }

    fn hints() -> DecodingHintDictionary {
        let formats: HashSet<BarcodeFormat> = Symbology::ALL.iter().map(to_rxing).collect();

        let mut hints = DecodingHintDictionary::new();
        hints.insert(
            DecodeHintType::POSSIBLE_FORMATS,
            DecodeHintValue::PossibleFormats(formats),
        );
        hints.insert(DecodeHintType::TRY_HARDER, DecodeHintValue::TryHarder(true));
        hints
    }
}

impl SymbologyReader for RxingReader {
    fn read(&self, luminance: &[u8], width: u32, height: u32) -> Option<DecodedSymbol> {
        let mut hints = Self::hints();
        match rxing::helpers::detect_in_luma_with_hints(
            luminance.to_vec(),
            width,
            height,
            None,
            &mut hints,
        ) {
            Ok(result) => {
                let Some(symbology) = from_rxing(result.getBarcodeFormat()) else {
                    tracing::debug!(
                        format = ?result.getBarcodeFormat(),
                        "Ignoring barcode outside the accepted symbologies"
                    );
                    return None;
                };
                Some(DecodedSymbol {
                    payload: result.getText().to_string(),
                    symbology,
                })
            }
            Err(e) => {
                tracing::trace!(error = %e, "No symbol found");
                None
            }
        }
    }
}

fn to_rxing(symbology: &Symbology) -> BarcodeFormat {
    match symbology {
        Symbology::Ean8 => BarcodeFormat::EAN_8,
        Symbology::Ean13 => BarcodeFormat::EAN_13,
        Symbology::UpcA => BarcodeFormat::UPC_A,
        Symbology::UpcE => BarcodeFormat::UPC_E,
        Symbology::Code128 => BarcodeFormat::CODE_128,
        Symbology::Code39 => BarcodeFormat::CODE_39,
        Symbology::Itf => BarcodeFormat::ITF,
    }
}

fn from_rxing(format: &BarcodeFormat) -> Option<Symbology> {
    match format {
        BarcodeFormat::EAN_8 => Some(Symbology::Ean8),
        BarcodeFormat::EAN_13 => Some(Symbology::Ean13),
        BarcodeFormat::UPC_A => Some(Symbology::UpcA),
        BarcodeFormat::UPC_E => Some(Symbology::UpcE),
        BarcodeFormat::CODE_128 => Some(Symbology::Code128),
        BarcodeFormat::CODE_39 => Some(Symbology::Code39),
        BarcodeFormat::ITF => Some(Symbology::Itf),
        _ => None,
    }
}
