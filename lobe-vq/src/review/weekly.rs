//! Weekly challenge and ladder progress formulas
//!
//! Stateless helpers feeding the reviewer dashboard. The weekly bar cycles
//! through `extra_interval` once the base goal is exceeded, rewarding
//! continued participation without an unbounded bar.

use lobe_common::db::ProgressionRow;
use lobe_common::economy::{Ladder, RewardTable};

/// Community-wide weekly challenge progress, in percent
///
/// Below the goal, the bar shows everyone's contributions except the
/// viewer's own. Past the goal it wraps around every `extra_interval`
/// verifications.
pub fn weekly_challenge_progress(
    weekly_total: i64,
    self_weekly: i64,
    goal: i64,
    extra_interval: i64,
) -> f64 {
    if weekly_total < goal {
        100.0 * (weekly_total - self_weekly) as f64 / goal as f64
    } else {
        100.0 * ((weekly_total - goal) % extra_interval) as f64 / extra_interval as f64
    }
}

/// The viewer's own share of the weekly goal, in percent
pub fn personal_weekly_progress(self_weekly: i64, goal: i64) -> f64 {
    100.0 * self_weekly as f64 / goal as f64
}

/// Progress towards the next tier of a ladder, in percent
///
/// 0 once the ladder is maxed out (there is no next tier to progress
/// towards).
pub fn ladder_progress(progression: &ProgressionRow, ladder: Ladder, rewards: &RewardTable) -> f64 {
    let (level, counter) = match ladder {
        Ladder::Verification => (progression.verification_level, progression.num_verifies),
        Ladder::Spy => (progression.spy_level, progression.num_invalid),
    };
    let tiers = rewards.ladder(ladder);
    match usize::try_from(level).ok().and_then(|idx| tiers.get(idx)) {
        Some(tier) => 100.0 * counter as f64 / tier.goal as f64,
        None => 0.0,
    }
}
