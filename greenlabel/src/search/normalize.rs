use crate::error::{GreenlabelError, Result};

/// Strip everything but ASCII digits. Idempotent.
pub fn normalize_barcode(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// A validated lookup: trimmed query (case preserved) and/or digits-only barcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub query: Option<String>,
    pub barcode: Option<String>,
}

impl LookupRequest {
    pub fn new(query: Option<&str>, barcode: Option<&str>) -> Result<Self> {
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        let barcode = barcode
            .map(normalize_barcode)
            .filter(|b| !b.is_empty());

        if query.is_none() && barcode.is_none() {
            return Err(GreenlabelError::InvalidArgument(
                "A search query or barcode is required".to_string(),
            ));
        }

        Ok(Self { query, barcode })
    }

    pub fn barcode_only(barcode: &str) -> Result<Self> {
        Self::new(None, Some(barcode))
    }

    /// Term sent to remote sources: the query when present, else the barcode.
    pub fn search_term(&self) -> &str {
        self.query
            .as_deref()
            .or(self.barcode.as_deref())
            .unwrap_or_default()
    }

    pub fn key(&self) -> SearchKey {
        SearchKey {
            query: self.query.as_deref().map(str::to_lowercase).unwrap_or_default(),
            barcode: self.barcode.clone().unwrap_or_default(),
        }
    }
}

/// Cache identity of a lookup. Queries differing only in case share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchKey {
    pub query: String,
    pub barcode: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_barcode_strips_non_digits() {
        assert_eq!(normalize_barcode("590-1234 12345 7"), "5901234123457");
        assert_eq!(normalize_barcode("abc"), "");
    }

    #[test]
    fn test_normalize_barcode_is_idempotent() {
        for raw in ["  8901-2345 ", "EAN:4006381333931", "", "0000"] {
            let once = normalize_barcode(raw);
            assert_eq!(normalize_barcode(&once), once);
        }
    }

    #[test]
    fn test_empty_request_is_rejected() {
        let err = LookupRequest::new(Some("   "), Some("--")).unwrap_err();
        assert_eq!(err.code(), "invalid_argument");
        assert!(LookupRequest::new(None, None).is_err());
    }

    #[test]
    fn test_query_trimmed_with_case_preserved() {
        let request = LookupRequest::new(Some("  Organic Honey "), None).unwrap();
        assert_eq!(request.query.as_deref(), Some("Organic Honey"));
        assert_eq!(request.search_term(), "Organic Honey");
        assert_eq!(request.key().query, "organic honey");
    }

    #[test]
    fn test_search_term_falls_back_to_barcode() {
        let request = LookupRequest::barcode_only("8901 2345").unwrap();
        assert_eq!(request.search_term(), "89012345");
    }

    #[test]
    fn test_keys_ignore_query_case() {
        let a = LookupRequest::new(Some("Quinoa"), Some("123")).unwrap();
        let b = LookupRequest::new(Some("QUINOA"), Some("1-2-3")).unwrap();
        assert_eq!(a.key(), b.key());
    }
}
