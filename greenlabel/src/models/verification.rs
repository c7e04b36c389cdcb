use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const NO_SOURCES_MESSAGE: &str = "No verification sources available";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    #[default]
    Unavailable,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified => write!(f, "verified"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// One branch's raw evidence, kept verbatim in the verdict details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BranchContribution {
    pub source: String,
    pub organic: bool,
    pub percentage: u8,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub detail: serde_json::Value,
}

impl BranchContribution {
    pub fn new(source: impl Into<String>, organic: bool, percentage: u8) -> Self {
        Self {
            source: source.into(),
            organic,
            percentage: percentage.min(100),
            detail: serde_json::Value::Null,
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }
}

/// What a single verification branch produced.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchOutcome {
    Contributed(BranchContribution),
    /// The branch ran but had nothing to say (unknown product, no input).
    Empty,
    /// Transport error, parse error or timeout.
    Failed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VerificationVerdict {
    pub is_organic: bool,
    pub percentage: u8,
    pub sources: BTreeSet<String>,
    pub details: Vec<BranchContribution>,
    pub status: VerificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VerificationVerdict {
    pub fn unavailable() -> Self {
        Self {
            message: Some(NO_SOURCES_MESSAGE.to_string()),
            ..Default::default()
        }
    }

    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Verified
    }
}
