//! Shared option types that replace boolean flag parameters in the Rust API.

use serde::{Deserialize, Serialize};

/// Whether existence-check failures of an operation are reported or ignored.
///
/// For LOAD this also swallows retrieval and parse failures.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum Silent {
    Yes,
    #[default]
    No,
}

impl Silent {
    pub fn is_silent(self) -> bool {
        matches!(self, Silent::Yes)
    }
}

impl From<bool> for Silent {
    fn from(value: bool) -> Self {
        if value {
            Silent::Yes
        } else {
            Silent::No
        }
    }
}

impl From<Silent> for bool {
    fn from(value: Silent) -> Self {
        value.is_silent()
    }
}

/// What happens to a single resolved graph during DROP or CLEAR.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ClearMode {
    /// Remove every triple; the graph itself stays in the store.
    Clear,
    /// Remove the graph from the store entirely.
    Drop,
}

impl ClearMode {
    pub fn is_clear(self) -> bool {
        matches!(self, ClearMode::Clear)
    }
}

impl From<bool> for ClearMode {
    fn from(is_clear: bool) -> Self {
        if is_clear {
            ClearMode::Clear
        } else {
            ClearMode::Drop
        }
    }
}
