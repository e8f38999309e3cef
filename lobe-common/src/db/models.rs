//! Database row models
//!
//! All rows are keyed by integer id; relationships are explicit foreign-key
//! fields, never embedded references. A session owns its recordings and a
//! verification owns its trims (cascade deletes); a recording does not own
//! its session.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One recorded utterance of a token
///
/// Belongs to exactly one session, normal or priority (the schema enforces
/// the mutual exclusion). The verification flags are set only by the
/// verification lifecycle; a recording can be secondarily verified only
/// after it is primarily verified.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecordingRow {
    pub id: i64,
    pub token_id: i64,
    pub session_id: Option<i64>,
    pub priority_session_id: Option<i64>,
    pub is_verified: bool,
    pub is_secondarily_verified: bool,
    pub marked_as_bad: bool,
    pub created_at: NaiveDateTime,
}

/// A single review of a recording, immutable once created except for
/// deletion
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VerificationRow {
    pub id: i64,
    pub recording_id: i64,
    pub verified_by: Option<i64>,
    pub volume_is_low: bool,
    pub volume_is_high: bool,
    pub has_glitch: bool,
    pub has_wrong_wording: bool,
    pub comment: Option<String>,
    pub is_secondary: bool,
    pub created_at: NaiveDateTime,
}

impl VerificationRow {
    /// A "good" verification carries no defect flag
    pub fn is_good(&self) -> bool {
        !(self.volume_is_low || self.volume_is_high || self.has_glitch || self.has_wrong_wording)
    }

    /// TSV export line (newlines in comments escaped)
    pub fn as_tsv_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.recording_id,
            self.volume_is_low as u8,
            self.volume_is_high as u8,
            self.has_glitch as u8,
            self.has_wrong_wording as u8,
            self.comment.as_deref().unwrap_or("").replace('\n', "\\n"),
        )
    }
}

/// A kept interval of a recording, in seconds from the start
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrimRow {
    pub id: i64,
    pub verification_id: i64,
    pub start: f64,
    pub end: f64,
    /// 0-based position preserving submission order
    pub idx: i64,
}

/// Per-reviewer economic ledger
///
/// Mutated only by the verification lifecycle. Balances are floored at 0;
/// every forward mutation has an exact inverse applied on deletion, except
/// where the floor clamp makes the inverse lossy.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProgressionRow {
    pub user_id: i64,
    pub lobe_coins: i64,
    pub experience: i64,
    pub num_verifies: i64,
    pub num_invalid: i64,
    pub weekly_verifies: i64,
    pub num_session_verifies: i64,
    pub verification_level: i64,
    pub spy_level: i64,
    pub last_spin: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn verification(flags: [bool; 4], comment: Option<&str>) -> VerificationRow {
        VerificationRow {
            id: 1,
            recording_id: 7,
            verified_by: Some(3),
            volume_is_low: flags[0],
            volume_is_high: flags[1],
            has_glitch: flags[2],
            has_wrong_wording: flags[3],
            comment: comment.map(str::to_string),
            is_secondary: false,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_is_good() {
        assert!(verification([false; 4], None).is_good());
        assert!(!verification([true, false, false, false], None).is_good());
        assert!(!verification([false, false, false, true], None).is_good());
    }

    #[test]
    fn test_tsv_line_escapes_newlines() {
        let v = verification([false, false, true, false], Some("clips\nat the end"));
        assert_eq!(v.as_tsv_line(), "7\t0\t0\t1\t0\tclips\\nat the end");
    }
}
