use std::fmt;

use serde::Serialize;

/// Pipeline stage at which an item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    DoiResolution,
    StrategyFetch,
    PdfValidation,
    /// Writing the PDF and its sidecar to disk.
    Persist,
}

impl FailureStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DoiResolution => "doi_resolution",
            Self::StrategyFetch => "strategy_fetch",
            Self::PdfValidation => "pdf_validation",
            Self::Persist => "persist",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of trying to obtain one item's PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Success { bytes: Vec<u8>, content_type: String },
    Failure { stage: FailureStage, reason: String },
}

impl DownloadOutcome {
    #[must_use]
    pub fn failure(stage: FailureStage, reason: impl Into<String>) -> Self {
        Self::Failure {
            stage,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub fn stage(&self) -> Option<FailureStage> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { stage, .. } => Some(*stage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names_are_snake_case() {
        assert_eq!(FailureStage::DoiResolution.to_string(), "doi_resolution");
        assert_eq!(
            serde_json::to_string(&FailureStage::StrategyFetch).unwrap_or_default(),
            "\"strategy_fetch\""
        );
    }

    #[test]
    fn test_outcome_accessors() {
        let ok = DownloadOutcome::Success {
            bytes: b"%PDF".to_vec(),
            content_type: "application/pdf".to_string(),
        };
        assert!(ok.is_success());
        assert_eq!(ok.stage(), None);
        let failed = DownloadOutcome::failure(FailureStage::Persist, "disk full");
        assert_eq!(failed.stage(), Some(FailureStage::Persist));
    }
}
