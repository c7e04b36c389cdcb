mod normalize;
mod result_cache;

pub use normalize::{normalize_barcode, LookupRequest, SearchKey};
pub use result_cache::ResultCache;
