use std::fmt;
use std::path::PathBuf;

use crate::download::FailureStage;
use crate::strategy::StrategyMiss;

/// Per-item pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    DoiResolving,
    StrategyDispatch,
    Fetching,
    /// PDF and sidecar are on disk.
    Written,
    /// A failure entry was logged.
    Logged,
}

impl ItemState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::DoiResolving => "doi_resolving",
            Self::StrategyDispatch => "strategy_dispatch",
            Self::Fetching => "fetching",
            Self::Written => "written",
            Self::Logged => "logged",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Written | Self::Logged)
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution progress for one item, filled in as stages complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// URL or DOI URL the item started from.
    pub original_url: Option<String>,
    pub resolved_landing_url: Option<String>,
    pub strategy_name: Option<&'static str>,
    /// Set only once the PDF was downloaded.
    pub pdf_url: Option<String>,
}

/// Final disposition of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemResult {
    Written {
        pdf_path: PathBuf,
        json_path: PathBuf,
    },
    Logged {
        stage: FailureStage,
        reason: String,
    },
}

/// What happened to one search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    /// Position in the input batch.
    pub index: usize,
    pub pdf_name: String,
    pub target: ResolvedTarget,
    /// Set when the strategy fell back to the original URL.
    pub strategy_miss: Option<StrategyMiss>,
    pub result: ItemResult,
}

impl ItemReport {
    #[must_use]
    pub fn state(&self) -> ItemState {
        match self.result {
            ItemResult::Written { .. } => ItemState::Written,
            ItemResult::Logged { .. } => ItemState::Logged,
        }
    }
}
