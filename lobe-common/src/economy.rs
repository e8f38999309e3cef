//! Reward table configuration
//!
//! Static economy configuration for the review workflow: flat rewards per
//! verification and per completed session, the two tiered achievement
//! ladders, and the weekly challenge parameters. Loaded once at process
//! start from a TOML file (compiled-in defaults when the file is absent)
//! and passed explicitly into the components that need it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Flat coin/experience reward for a single event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatReward {
    pub coin_reward: i64,
    pub experience_reward: i64,
}

/// One tier of an achievement ladder
///
/// `goal` is the counter value that unlocks the tier; the rewards are
/// credited once, when the reviewer's counter first reaches the goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderTier {
    pub title: String,
    pub goal: i64,
    pub coin_reward: i64,
    pub experience_reward: i64,
}

/// Weekly challenge parameters (see the weekly progress helper)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyChallenge {
    pub goal: i64,
    pub extra_interval: i64,
}

/// The two achievement ladders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievements {
    pub verification: Vec<LadderTier>,
    pub spy: Vec<LadderTier>,
}

/// Ladder selector
///
/// The "verification" ladder tracks total verifications submitted; the
/// "spy" ladder tracks defect catches (verifications with any flag set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ladder {
    Verification,
    Spy,
}

impl Ladder {
    /// Name reported in `unlocked achievements` lists
    pub fn name(&self) -> &'static str {
        match self {
            Ladder::Verification => "verification",
            Ladder::Spy => "spy",
        }
    }
}

/// Complete reward table, immutable at runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardTable {
    #[serde(default = "defaults::verification")]
    pub verification: FlatReward,
    #[serde(default = "defaults::session")]
    pub session: FlatReward,
    #[serde(default = "defaults::weekly_challenge")]
    pub weekly_challenge: WeeklyChallenge,
    #[serde(default = "defaults::achievements")]
    pub achievements: Achievements,
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            verification: defaults::verification(),
            session: defaults::session(),
            weekly_challenge: defaults::weekly_challenge(),
            achievements: defaults::achievements(),
        }
    }
}

impl RewardTable {
    /// Load the reward table from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let table: RewardTable = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Invalid reward table {}: {}", path.display(), e)))?;
        table.validate()?;
        info!("Loaded reward table from {}", path.display());
        Ok(table)
    }

    /// Load the reward table, falling back to compiled-in defaults when the
    /// file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(
                "Reward table {} not found, using built-in defaults",
                path.display()
            );
            let table = Self::default();
            table.validate()?;
            Ok(table)
        }
    }

    /// Validate configuration invariants
    ///
    /// Goals and intervals must be positive and both ladders non-empty;
    /// a table failing these checks would desynchronize levels from rewards.
    pub fn validate(&self) -> Result<()> {
        if self.weekly_challenge.goal <= 0 || self.weekly_challenge.extra_interval <= 0 {
            return Err(Error::Config(
                "weekly challenge goal and extra_interval must be positive".into(),
            ));
        }
        for (name, tiers) in [
            ("verification", &self.achievements.verification),
            ("spy", &self.achievements.spy),
        ] {
            if tiers.is_empty() {
                return Err(Error::Config(format!("{} ladder has no tiers", name)));
            }
            for (level, tier) in tiers.iter().enumerate() {
                if tier.goal <= 0 {
                    return Err(Error::Config(format!(
                        "{} ladder tier {} has non-positive goal",
                        name, level
                    )));
                }
            }
        }
        Ok(())
    }

    /// All tiers of one ladder, indexed by level
    pub fn ladder(&self, ladder: Ladder) -> &[LadderTier] {
        match ladder {
            Ladder::Verification => &self.achievements.verification,
            Ladder::Spy => &self.achievements.spy,
        }
    }

    /// Tier at an integer level
    ///
    /// A level with no corresponding tier is a configuration error, never
    /// silently skipped.
    pub fn tier(&self, ladder: Ladder, level: i64) -> Result<&LadderTier> {
        usize::try_from(level)
            .ok()
            .and_then(|idx| self.ladder(ladder).get(idx))
            .ok_or_else(|| {
                Error::Config(format!(
                    "no tier at level {} of the {} ladder",
                    level,
                    ladder.name()
                ))
            })
    }
}

mod defaults {
    use super::{Achievements, FlatReward, LadderTier, WeeklyChallenge};

    pub fn verification() -> FlatReward {
        FlatReward {
            coin_reward: 0,
            experience_reward: 5,
        }
    }

    pub fn session() -> FlatReward {
        FlatReward {
            coin_reward: 5,
            experience_reward: 50,
        }
    }

    pub fn weekly_challenge() -> WeeklyChallenge {
        WeeklyChallenge {
            goal: 5000,
            extra_interval: 2000,
        }
    }

    fn tier(title: &str, goal: i64, coin_reward: i64, experience_reward: i64) -> LadderTier {
        LadderTier {
            title: title.to_string(),
            goal,
            coin_reward,
            experience_reward,
        }
    }

    pub fn achievements() -> Achievements {
        Achievements {
            verification: vec![
                tier("The journey begins", 50, 10, 50),
                tier("Onwards and upwards", 500, 50, 100),
                tier("Wall climber", 1000, 100, 200),
                tier("High jump", 2000, 200, 300),
                tier("Everest", 5000, 300, 500),
                tier("Into orbit", 15000, 1000, 10000),
            ],
            spy: vec![
                tier("Spy school", 10, 10, 50),
                tier("A+ in spycraft", 50, 50, 100),
                tier("First assignment", 100, 100, 500),
                tier("Head of department", 200, 500, 1500),
                tier("Academy president", 300, 700, 2500),
                tier("Nobel prize in spycraft", 500, 1000, 5000),
            ],
        }
    }
}
