//! Confidence band classification
//!
//! Extraction reports a per-field score in [0,1]; the review UI shows it as
//! a coarse badge. The thresholds live here, isolated from rendering.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    /// Classify a raw score: >= 0.8 High, >= 0.5 Medium, else Low.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            ConfidenceBand::High
        } else if score >= 0.5 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfidenceBand::High => "High",
            ConfidenceBand::Medium => "Medium",
            ConfidenceBand::Low => "Low",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_thresholds() {
        assert_eq!(ConfidenceBand::from_score(1.0), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_score(0.92), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_score(0.8), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_score(0.79), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_score(0.5), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_score(0.49), ConfidenceBand::Low);
        assert_eq!(ConfidenceBand::from_score(0.0), ConfidenceBand::Low);
    }

    #[test]
    fn test_labels() {
        assert_eq!(ConfidenceBand::High.label(), "High");
        assert_eq!(ConfidenceBand::Medium.label(), "Medium");
        assert_eq!(ConfidenceBand::Low.label(), "Low");
    }
}
