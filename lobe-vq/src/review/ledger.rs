//! Ledger operations
//!
//! Pure mutations of a reviewer's progression row. Rewards are additive;
//! debits clamp both balances at zero, which makes deletion a lossy inverse
//! of creation when a balance sits at or near the floor. Ladder evaluation
//! and de-evaluation are exact inverses of each other away from the floor.

use lobe_common::db::ProgressionRow;
use lobe_common::economy::{Ladder, RewardTable};
use lobe_common::Result;

/// Credit coins and experience (no clamp)
pub fn apply_reward(progression: &mut ProgressionRow, coins: i64, experience: i64) {
    progression.lobe_coins += coins;
    progression.experience += experience;
}

/// Debit coins and experience, clamping both balances at 0
pub fn apply_debit(progression: &mut ProgressionRow, coins: i64, experience: i64) {
    progression.lobe_coins = (progression.lobe_coins - coins).max(0);
    progression.experience = (progression.experience - experience).max(0);
}

/// Counter feeding a ladder: total verifies for the accuracy ladder,
/// defect catches for the spy ladder
fn counter(progression: &ProgressionRow, ladder: Ladder) -> i64 {
    match ladder {
        Ladder::Verification => progression.num_verifies,
        Ladder::Spy => progression.num_invalid,
    }
}

fn level(progression: &ProgressionRow, ladder: Ladder) -> i64 {
    match ladder {
        Ladder::Verification => progression.verification_level,
        Ladder::Spy => progression.spy_level,
    }
}

fn set_level(progression: &mut ProgressionRow, ladder: Ladder, value: i64) {
    match ladder {
        Ladder::Verification => progression.verification_level = value,
        Ladder::Spy => progression.spy_level = value,
    }
}

/// Evaluate one ladder after a forward mutation
///
/// If the counter has reached the goal of the tier at the current level,
/// the level increments and the tier reward is credited. Returns whether a
/// tier was unlocked. Goals are spaced further apart than one
/// verification's worth of progress, so at most one level is gained per
/// call.
pub fn evaluate_ladder(
    progression: &mut ProgressionRow,
    ladder: Ladder,
    rewards: &RewardTable,
) -> Result<bool> {
    let current = level(progression, ladder);
    let tier = rewards.tier(ladder, current)?;
    if counter(progression, ladder) >= tier.goal {
        let (coins, experience) = (tier.coin_reward, tier.experience_reward);
        set_level(progression, ladder, current + 1);
        apply_reward(progression, coins, experience);
        return Ok(true);
    }
    Ok(false)
}

/// Reverse ladder evaluation after a deletion
///
/// If the counter has dropped back below the goal of the most recently
/// unlocked tier, the level decrements and that tier's reward is debited
/// (clamped at 0). Returns whether a tier was revoked.
pub fn de_evaluate_ladder(
    progression: &mut ProgressionRow,
    ladder: Ladder,
    rewards: &RewardTable,
) -> Result<bool> {
    let current = level(progression, ladder);
    if current == 0 {
        return Ok(false);
    }
    let tier = rewards.tier(ladder, current - 1)?;
    if counter(progression, ladder) < tier.goal {
        let (coins, experience) = (tier.coin_reward, tier.experience_reward);
        set_level(progression, ladder, current - 1);
        apply_debit(progression, coins, experience);
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progression() -> ProgressionRow {
        ProgressionRow {
            user_id: 1,
            lobe_coins: 0,
            experience: 0,
            num_verifies: 0,
            num_invalid: 0,
            weekly_verifies: 0,
            num_session_verifies: 0,
            verification_level: 0,
            spy_level: 0,
            last_spin: None,
        }
    }

    #[test]
    fn test_reward_then_debit_round_trips() {
        let mut p = progression();
        p.lobe_coins = 100;
        p.experience = 1000;

        apply_reward(&mut p, 5, 50);
        assert_eq!(p.lobe_coins, 105);
        assert_eq!(p.experience, 1050);

        apply_debit(&mut p, 5, 50);
        assert_eq!(p.lobe_coins, 100);
        assert_eq!(p.experience, 1000);
    }

    #[test]
    fn test_debit_clamps_at_zero() {
        let mut p = progression();
        p.lobe_coins = 3;

        apply_debit(&mut p, 10, 10);
        assert_eq!(p.lobe_coins, 0);
        assert_eq!(p.experience, 0);
    }

    #[test]
    fn test_ladder_unlocks_at_goal() {
        let rewards = RewardTable::default();
        let mut p = progression();
        p.num_verifies = 49;

        assert!(!evaluate_ladder(&mut p, Ladder::Verification, &rewards).unwrap());
        assert_eq!(p.verification_level, 0);

        p.num_verifies = 50;
        assert!(evaluate_ladder(&mut p, Ladder::Verification, &rewards).unwrap());
        assert_eq!(p.verification_level, 1);
        assert_eq!(p.lobe_coins, 10);
        assert_eq!(p.experience, 50);

        // Next tier needs 500; no further unlock at 51
        p.num_verifies = 51;
        assert!(!evaluate_ladder(&mut p, Ladder::Verification, &rewards).unwrap());
        assert_eq!(p.verification_level, 1);
    }

    #[test]
    fn test_ladder_de_evaluation_is_inverse() {
        let rewards = RewardTable::default();
        let mut p = progression();
        p.num_verifies = 50;
        evaluate_ladder(&mut p, Ladder::Verification, &rewards).unwrap();
        assert_eq!(p.verification_level, 1);

        p.num_verifies = 49;
        assert!(de_evaluate_ladder(&mut p, Ladder::Verification, &rewards).unwrap());
        assert_eq!(p.verification_level, 0);
        assert_eq!(p.lobe_coins, 0);
        assert_eq!(p.experience, 0);
    }

    #[test]
    fn test_ladder_de_evaluation_keeps_level_above_goal() {
        let rewards = RewardTable::default();
        let mut p = progression();
        p.num_verifies = 60;
        p.verification_level = 1;

        assert!(!de_evaluate_ladder(&mut p, Ladder::Verification, &rewards).unwrap());
        assert_eq!(p.verification_level, 1);
    }

    #[test]
    fn test_spy_ladder_uses_invalid_counter() {
        let rewards = RewardTable::default();
        let mut p = progression();
        p.num_verifies = 1000;
        p.num_invalid = 10;

        assert!(evaluate_ladder(&mut p, Ladder::Spy, &rewards).unwrap());
        assert_eq!(p.spy_level, 1);
        assert_eq!(p.verification_level, 0);
    }

    #[test]
    fn test_maxed_ladder_is_config_error() {
        let rewards = RewardTable::default();
        let mut p = progression();
        p.verification_level = 6;
        p.num_verifies = 20000;

        assert!(evaluate_ladder(&mut p, Ladder::Verification, &rewards).is_err());
    }
}
