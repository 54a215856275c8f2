//! Auto-link / suggest / ignore classification for a record's best match.

use serde::Serialize;

use super::scorer::MatchCandidate;

/// Auto-link threshold on the 0–1 match scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Threshold(f64);

impl Threshold {
    pub const DEFAULT: Threshold = Threshold(0.6);

    /// Clamp into `[0, 1]`. NaN falls back to the default.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::DEFAULT;
        }
        Threshold(value.clamp(0.0, 1.0))
    }

    /// Convert a legacy 0–10 point value (e.g. `8`) onto the 0–1 scale.
    pub fn from_points(points: f64) -> Self {
        Self::new(points / 10.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// What to do with a record given its best candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkDecision {
    AutoLink(MatchCandidate),
    Suggest(MatchCandidate),
    Ignore,
}

/// Classify one record. A score equal to the threshold links.
pub fn decide(
    best: Option<MatchCandidate>,
    threshold: Threshold,
    suggestion_floor: f64,
) -> LinkDecision {
    match best {
        Some(candidate) if candidate.score >= threshold.value() => {
            LinkDecision::AutoLink(candidate)
        }
        Some(candidate) if candidate.score > 0.0 && candidate.score >= suggestion_floor => {
            LinkDecision::Suggest(candidate)
        }
        _ => LinkDecision::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;
    use crate::linking::scorer::Confidence;

    fn candidate(score: f64) -> MatchCandidate {
        MatchCandidate {
            entity_id: "c1".to_string(),
            entity_type: EntityType::Client,
            name: "Acme".to_string(),
            score,
            confidence: Confidence::from_score(score),
        }
    }

    #[test]
    fn test_at_threshold_auto_links() {
        let decision = decide(Some(candidate(0.6)), Threshold::DEFAULT, 0.3);
        assert!(matches!(decision, LinkDecision::AutoLink(_)));
    }

    #[test]
    fn test_below_threshold_suggests() {
        let decision = decide(Some(candidate(0.59)), Threshold::DEFAULT, 0.3);
        assert!(matches!(decision, LinkDecision::Suggest(_)));
    }

    #[test]
    fn test_below_floor_ignored() {
        assert_eq!(decide(Some(candidate(0.2)), Threshold::DEFAULT, 0.3), LinkDecision::Ignore);
        assert_eq!(decide(None, Threshold::DEFAULT, 0.3), LinkDecision::Ignore);
        assert_eq!(decide(Some(candidate(0.0)), Threshold::DEFAULT, 0.0), LinkDecision::Ignore);
    }

    #[test]
    fn test_threshold_conversion_and_clamping() {
        assert_eq!(Threshold::from_points(8.0).value(), 0.8);
        assert_eq!(Threshold::new(3.0).value(), 1.0);
        assert_eq!(Threshold::new(-1.0).value(), 0.0);
        assert_eq!(Threshold::new(f64::NAN), Threshold::DEFAULT);
    }
}
