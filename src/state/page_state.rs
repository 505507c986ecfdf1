/// Page state definitions for tracking clone progress
///
/// Every crawl frame moves through `Pending -> Fetching` and ends in exactly one
/// terminal state.
use std::fmt;

/// Represents the current state of a page in a clone run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// Frame is queued and waiting for a fetch slot
    Pending,

    /// Fetch backend is retrieving the page
    Fetching,

    // ===== Terminal States =====
    /// Content was fetched and written to an allocated path
    Stored,

    /// Page was not fetched (already visited, out of scope, or page cap reached)
    Skipped,

    /// Fetch or storage failed; nothing was stored for this page
    Failed,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if the frame may still be processed
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Fetching)
    }

    /// Checks whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetching)
                | (Self::Pending, Self::Skipped)
                | (Self::Fetching, Self::Stored)
                | (Self::Fetching, Self::Failed)
        )
    }

    /// Converts the page state to its manifest string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Stored => "stored",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    /// Parses a page state from its manifest string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "fetching" => Some(Self::Fetching),
            "stored" => Some(Self::Stored),
            "skipped" => Some(Self::Skipped),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all terminal states, in report order
    pub fn terminal_states() -> [Self; 3] {
        [Self::Stored, Self::Skipped, Self::Failed]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
