//! Priority tiers and the threshold table that derives them from scores.
//!
//! The tier is never stored. Every read goes through
//! [`PriorityThresholds::tier_for`], so a task's tier always matches its
//! score under the thresholds currently configured.

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};

/// Coarse priority label derived from a priority score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityTier {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for PriorityTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(Error::InvalidInput(format!(
                "invalid priority '{s}': must be low, medium, or high"
            ))),
        }
    }
}

/// Score boundaries for the tier table.
///
/// Scores below `medium_min` are low, scores from `medium_min` up to
/// `high_min - 1` are medium, and scores at or above `high_min` are high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityThresholds {
    pub medium_min: i32,
    pub high_min: i32,
}

impl Default for PriorityThresholds {
    fn default() -> Self {
        Self {
            medium_min: defaults::PRIORITY_MEDIUM_MIN,
            high_min: defaults::PRIORITY_HIGH_MIN,
        }
    }
}

impl PriorityThresholds {
    /// Build a threshold table, rejecting inverted or out-of-range bounds.
    pub fn new(medium_min: i32, high_min: i32) -> Result<Self> {
        let thresholds = Self {
            medium_min,
            high_min,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<()> {
        let range = defaults::PRIORITY_MIN..=defaults::PRIORITY_MAX;
        if !range.contains(&self.medium_min) || !range.contains(&self.high_min) {
            return Err(Error::Config(format!(
                "priority thresholds must be within {}..={}, got medium_min={} high_min={}",
                defaults::PRIORITY_MIN,
                defaults::PRIORITY_MAX,
                self.medium_min,
                self.high_min
            )));
        }
        if self.medium_min > self.high_min {
            return Err(Error::Config(format!(
                "medium_min ({}) must not exceed high_min ({})",
                self.medium_min, self.high_min
            )));
        }
        Ok(())
    }

    /// Tier implied by `score` under this table.
    pub fn tier_for(&self, score: i32) -> PriorityTier {
        if score >= self.high_min {
            PriorityTier::High
        } else if score >= self.medium_min {
            PriorityTier::Medium
        } else {
            PriorityTier::Low
        }
    }

    /// Inclusive score range covered by `tier`.
    pub fn range_for(&self, tier: PriorityTier) -> (i32, i32) {
        match tier {
            PriorityTier::Low => (defaults::PRIORITY_MIN, self.medium_min - 1),
            PriorityTier::Medium => (self.medium_min, self.high_min - 1),
            PriorityTier::High => (self.high_min, defaults::PRIORITY_MAX),
        }
    }
}

/// Validate a user-supplied priority score.
pub fn validate_score(score: i32) -> Result<i32> {
    if (defaults::PRIORITY_MIN..=defaults::PRIORITY_MAX).contains(&score) {
        Ok(score)
    } else {
        Err(Error::InvalidInput(format!(
            "priority score must be between {} and {}, got {}",
            defaults::PRIORITY_MIN,
            defaults::PRIORITY_MAX,
            score
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_boundaries() {
        let t = PriorityThresholds::default();
        assert_eq!(t.tier_for(0), PriorityTier::Low);
        assert_eq!(t.tier_for(33), PriorityTier::Low);
        assert_eq!(t.tier_for(34), PriorityTier::Medium);
        assert_eq!(t.tier_for(66), PriorityTier::Medium);
        assert_eq!(t.tier_for(67), PriorityTier::High);
        assert_eq!(t.tier_for(100), PriorityTier::High);
    }

    #[test]
    fn test_every_valid_score_has_a_consistent_tier() {
        let t = PriorityThresholds::default();
        for score in 0..=100 {
            let tier = t.tier_for(score);
            let (lo, hi) = t.range_for(tier);
            assert!(
                (lo..=hi).contains(&score),
                "score {score} mapped to {tier} outside {lo}..={hi}"
            );
        }
    }

    #[test]
    fn test_custom_thresholds() {
        let t = PriorityThresholds::new(30, 80).unwrap();
        assert_eq!(t.tier_for(29), PriorityTier::Low);
        assert_eq!(t.tier_for(30), PriorityTier::Medium);
        assert_eq!(t.tier_for(79), PriorityTier::Medium);
        assert_eq!(t.tier_for(80), PriorityTier::High);
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let err = PriorityThresholds::new(70, 40).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_out_of_range_thresholds_rejected() {
        assert!(PriorityThresholds::new(-1, 50).is_err());
        assert!(PriorityThresholds::new(10, 101).is_err());
    }

    #[test]
    fn test_validate_score() {
        assert_eq!(validate_score(0).unwrap(), 0);
        assert_eq!(validate_score(100).unwrap(), 100);
        assert!(matches!(validate_score(-1), Err(Error::InvalidInput(_))));
        assert!(matches!(validate_score(101), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_tier_parse_and_display() {
        assert_eq!("HIGH".parse::<PriorityTier>().unwrap(), PriorityTier::High);
        assert_eq!(PriorityTier::Medium.to_string(), "medium");
        assert!("urgent".parse::<PriorityTier>().is_err());
    }
}
