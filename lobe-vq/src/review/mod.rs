//! Review workflow core
//!
//! The queue scheduler picks the next session for a reviewer, the
//! verification lifecycle records and retracts reviews, and the ledger
//! module applies the economic effects. The weekly module holds the
//! stateless progress formulas fed to the reviewer dashboard.

pub mod ledger;
pub mod lifecycle;
pub mod scheduler;
pub mod weekly;

use serde::{Deserialize, Serialize};

/// Which table a session lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Normal,
    Priority,
}

impl SessionKind {
    /// Session table name
    pub fn table(&self) -> &'static str {
        match self {
            SessionKind::Normal => "sessions",
            SessionKind::Priority => "priority_sessions",
        }
    }

    /// Foreign-key column on `recordings` pointing at this table
    pub fn recording_fk(&self) -> &'static str {
        match self {
            SessionKind::Normal => "session_id",
            SessionKind::Priority => "priority_session_id",
        }
    }
}

/// Review pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Primary,
    Secondary,
}

impl Pass {
    pub fn is_secondary(&self) -> bool {
        matches!(self, Pass::Secondary)
    }

    /// Per-recording / per-session completion flag column for this pass
    pub fn flag_column(&self) -> &'static str {
        match self {
            Pass::Primary => "is_verified",
            Pass::Secondary => "is_secondarily_verified",
        }
    }

    /// Session assignment column for this pass
    pub fn assignment_column(&self) -> &'static str {
        match self {
            Pass::Primary => "verified_by",
            Pass::Secondary => "secondarily_verified_by",
        }
    }
}

/// Quality flags of a submitted verification
///
/// All false means the recording was judged good. Low and high volume are
/// mutually exclusive.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QualityFlags {
    #[serde(default)]
    pub volume_is_low: bool,
    #[serde(default)]
    pub volume_is_high: bool,
    #[serde(default)]
    pub has_glitch: bool,
    #[serde(default)]
    pub has_wrong_wording: bool,
}

impl QualityFlags {
    pub fn is_good(&self) -> bool {
        !(self.volume_is_low || self.volume_is_high || self.has_glitch || self.has_wrong_wording)
    }
}

/// One kept interval of a recording, seconds from the start
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrimInput {
    pub start: f64,
    pub end: f64,
}
