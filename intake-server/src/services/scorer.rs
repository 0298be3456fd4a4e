//! Priority Scorer
//!
//! Pure scoring function: no clock, no database. The intake pipeline gathers
//! the inputs (classifier confidence, zone importance, local hour, nearby
//! similar count) and the scorer folds them into a tier.
//!
//! Score = base(kind) ± confidence adjustment + zone weight + peak-hour bump
//! + clustering bump, then mapped to a tier by fixed thresholds
//! (see [`PriorityTier::from_score`]).

use shared::types::{IssueKind, PriorityTier};

#[derive(Debug, Clone)]
pub struct PriorityScorer {
    /// Inclusive local-hour ranges that count as peak traffic
    peak_windows: [(u8, u8); 2],
}

/// Inputs gathered by the pipeline for one submission
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput {
    pub kind: IssueKind,
    /// Classifier confidence, 0.0 when the classifier was unavailable
    pub ai_confidence: f64,
    /// Zone importance weight on a 1-3 scale
    pub zone_importance: f64,
    /// Local hour of submission, 0-23
    pub hour: u8,
    /// Open same-kind issues within the wider similarity radius
    pub nearby_similar: usize,
}

impl PriorityScorer {
    pub fn new(peak_windows: [(u8, u8); 2]) -> Self {
        Self { peak_windows }
    }

    pub fn is_peak_hour(&self, hour: u8) -> bool {
        self.peak_windows
            .iter()
            .any(|&(start, end)| hour >= start && hour <= end)
    }

    /// Raw score for one submission
    pub fn score(&self, input: ScoreInput) -> f64 {
        let mut score = input.kind.default_tier().base_score();

        // High-confidence detections are trusted up, low-confidence down
        if input.ai_confidence > 0.8 {
            score += 0.5;
        } else if input.ai_confidence < 0.4 {
            score -= 0.5;
        }

        score += (input.zone_importance - 1.0) * 0.3;

        if self.is_peak_hour(input.hour) {
            score += 0.3;
        }

        // Clustering: several nearby reports of the same kind signal severity
        if input.nearby_similar >= 3 {
            score += 1.0;
        } else if input.nearby_similar >= 2 {
            score += 0.5;
        }

        score
    }

    pub fn tier(&self, input: ScoreInput) -> PriorityTier {
        PriorityTier::from_score(self.score(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> PriorityScorer {
        PriorityScorer::new([(8, 10), (17, 20)])
    }

    fn base_input(kind: IssueKind) -> ScoreInput {
        ScoreInput {
            kind,
            ai_confidence: 0.5,
            zone_importance: 1.0,
            hour: 14,
            nearby_similar: 0,
        }
    }

    #[test]
    fn neutral_inputs_give_the_kind_base() {
        let s = scorer();
        assert_eq!(s.score(base_input(IssueKind::Pothole)), 3.0);
        assert_eq!(s.tier(base_input(IssueKind::Pothole)), PriorityTier::High);
        assert_eq!(s.tier(base_input(IssueKind::Garbage)), PriorityTier::Medium);
        assert_eq!(
            s.tier(base_input(IssueKind::OpenManhole)),
            PriorityTier::Critical
        );
    }

    #[test]
    fn confidence_adjusts_half_a_point_each_way() {
        let s = scorer();
        let mut input = base_input(IssueKind::Pothole);

        input.ai_confidence = 0.9;
        assert_eq!(s.score(input), 3.5);

        input.ai_confidence = 0.3;
        assert_eq!(s.score(input), 2.5);

        // Boundaries are exclusive in both directions
        input.ai_confidence = 0.8;
        assert_eq!(s.score(input), 3.0);
        input.ai_confidence = 0.4;
        assert_eq!(s.score(input), 3.0);
    }

    #[test]
    fn zone_importance_scales_linearly() {
        let s = scorer();
        let mut input = base_input(IssueKind::Garbage);
        input.zone_importance = 3.0;
        assert!((s.score(input) - 2.6).abs() < 1e-9);
    }

    #[test]
    fn peak_hours_bump() {
        let s = scorer();
        let mut input = base_input(IssueKind::Pothole);

        for hour in [8, 10, 17, 20] {
            input.hour = hour;
            assert!((s.score(input) - 3.3).abs() < 1e-9, "hour {hour}");
        }
        for hour in [7, 11, 16, 21, 0] {
            input.hour = hour;
            assert_eq!(s.score(input), 3.0, "hour {hour}");
        }
    }

    #[test]
    fn clustering_bumps_and_saturates() {
        let s = scorer();
        let mut input = base_input(IssueKind::Garbage);

        input.nearby_similar = 1;
        assert_eq!(s.score(input), 2.0);
        input.nearby_similar = 2;
        assert_eq!(s.score(input), 2.5);
        input.nearby_similar = 3;
        assert_eq!(s.score(input), 3.0);
        input.nearby_similar = 12;
        assert_eq!(s.score(input), 3.0);
    }

    #[test]
    fn everything_stacked_reaches_critical() {
        let s = scorer();
        let input = ScoreInput {
            kind: IssueKind::Pothole,
            ai_confidence: 0.95,
            zone_importance: 3.0,
            hour: 9,
            nearby_similar: 4,
        };
        assert!(s.score(input) >= 4.0);
        assert_eq!(s.tier(input), PriorityTier::Critical);
    }

    #[test]
    fn score_is_monotone_in_each_input() {
        let s = scorer();
        let low = base_input(IssueKind::Garbage);

        let mut hi = low;
        hi.ai_confidence = 0.9;
        assert!(s.score(hi) > s.score(low));

        let mut hi = low;
        hi.zone_importance = 2.5;
        assert!(s.score(hi) > s.score(low));

        let mut hi = low;
        hi.nearby_similar = 5;
        assert!(s.score(hi) > s.score(low));
    }
}
