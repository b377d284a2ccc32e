use crate::error::ConfigError;

/// Survival bonus multiplier applied while the round step count is below `below`.
/// A `None` bound marks the catch-all tier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RewardTier {
    pub below: Option<u64>,
    pub multiplier: f64,
}

impl RewardTier {
    pub const fn bounded(below: u64, multiplier: f64) -> Self {
        Self {
            below: Some(below),
            multiplier,
        }
    }

    pub const fn unbounded(multiplier: f64) -> Self {
        Self {
            below: None,
            multiplier,
        }
    }
}

/// Ascending step-count thresholds mapped to survival bonus multipliers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RewardTierTable {
    tiers: &'static [RewardTier],
}

const SURVIVAL_TIER_ENTRIES: [RewardTier; 6] = [
    RewardTier::bounded(20, 0.25),
    RewardTier::bounded(70, 1.0),
    RewardTier::bounded(100, 1.5),
    RewardTier::bounded(140, 6.0),
    RewardTier::bounded(160, 10.0),
    RewardTier::unbounded(12.0),
];

/// Default table used by [`super::ProgressiveReward`].
pub static SURVIVAL_TIERS: RewardTierTable = RewardTierTable {
    tiers: &SURVIVAL_TIER_ENTRIES,
};

impl RewardTierTable {
    /// Validates that thresholds strictly increase and the last tier is unbounded.
    pub fn new(tiers: &'static [RewardTier]) -> Result<Self, ConfigError> {
        let Some((last, bounded)) = tiers.split_last() else {
            return Err(ConfigError::RewardTiers("table is empty"));
        };
        if last.below.is_some() {
            return Err(ConfigError::RewardTiers("last tier must be unbounded"));
        }
        let mut previous: Option<u64> = None;
        for tier in bounded {
            let Some(below) = tier.below else {
                return Err(ConfigError::RewardTiers(
                    "only the last tier may be unbounded",
                ));
            };
            if previous.is_some_and(|prev| below <= prev) {
                return Err(ConfigError::RewardTiers(
                    "thresholds must be strictly increasing",
                ));
            }
            previous = Some(below);
        }
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &'static [RewardTier] {
        self.tiers
    }

    /// Multiplier of the first tier whose threshold strictly exceeds `steps`.
    pub fn multiplier(&self, steps: u64) -> f64 {
        let index = self
            .tiers
            .partition_point(|tier| matches!(tier.below, Some(below) if below <= steps));
        self.tiers
            .get(index)
            .or_else(|| self.tiers.last())
            .map(|tier| tier.multiplier)
            .unwrap_or_default()
    }
}

impl Default for RewardTierTable {
    fn default() -> Self {
        SURVIVAL_TIERS
    }
}
