use serde::{Deserialize, Serialize};

/// Barcode symbologies the decoder is allowed to report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Symbology {
    #[serde(rename = "EAN_8")]
    Ean8,
    #[serde(rename = "EAN_13")]
    Ean13,
    #[serde(rename = "UPC_A")]
    UpcA,
    #[serde(rename = "UPC_E")]
    UpcE,
    #[serde(rename = "CODE_128")]
    Code128,
    #[serde(rename = "CODE_39")]
    Code39,
    #[serde(rename = "ITF")]
    Itf,
}

impl Symbology {
    pub const ALL: [Symbology; 7] = [
        Self::Ean8,
        Self::Ean13,
        Self::UpcA,
        Self::UpcE,
        Self::Code128,
        Self::Code39,
        Self::Itf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ean8 => "EAN_8",
            Self::Ean13 => "EAN_13",
            Self::UpcA => "UPC_A",
            Self::UpcE => "UPC_E",
            Self::Code128 => "CODE_128",
            Self::Code39 => "CODE_39",
            Self::Itf => "ITF",
        }
    }
}

impl std::fmt::Display for Symbology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Symbology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|sym| sym.as_str() == wanted)
            .ok_or_else(|| format!("Unknown symbology: {s}"))
    }
}

/// Outcome of a single barcode decode. Never persisted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DecodeResult {
    Success {
        payload: String,
        symbology: Symbology,
    },
    #[serde(rename_all = "camelCase")]
    Failure {
        reason: String,
        remediation_hints: Vec<String>,
    },
}

impl DecodeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn into_error_or_payload(self) -> crate::error::Result<(String, Symbology)> {
        match self {
            Self::Success { payload, symbology } => Ok((payload, symbology)),
            Self::Failure {
                reason,
                remediation_hints,
            } => Err(crate::error::GreenlabelError::DecodeFailure {
                reason,
                hints: remediation_hints,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbology_names() {
        assert_eq!(Symbology::Ean13.to_string(), "EAN_13");
        assert_eq!("code-128".parse::<Symbology>().unwrap(), Symbology::Code128);
        assert!("QR_CODE".parse::<Symbology>().is_err());
    }

    #[test]
    fn test_failure_converts_to_decode_error() {
        let result = DecodeResult::Failure {
            reason: "nothing found".to_string(),
            remediation_hints: vec!["Try again".to_string()],
        };
        assert!(!result.is_success());

        let err = result.into_error_or_payload().unwrap_err();
        assert_eq!(err.code(), "decode_failed");
        assert_eq!(err.suggestions(), vec!["Try again".to_string()]);
    }

    #[test]
    fn test_success_serializes_with_status_tag() {
        let result = DecodeResult::Success {
            payload: "5901234123457".to_string(),
            symbology: Symbology::Ean13,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["symbology"], "EAN_13");
    }
}
