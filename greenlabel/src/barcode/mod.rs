mod decoder;
mod reader;

pub use decoder::{BarcodeDecoder, NO_BARCODE_REASON};
pub use reader::{DecodedSymbol, RxingReader, SymbologyReader};
