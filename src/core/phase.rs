//! Phase classifier: (entropy, compression ratio) → one of 9 phases
//!
//! Ranks are scanned in order; the first row with
//! `entropy <= entropy_max` AND `reduction >= compression_min` wins.
//! Boundary values belong to the lower rank. No match → BLACK_COLLAPSE.

use tracing::debug;

use crate::types::{Phase, PhaseDefinition, PhaseResult, TextMetrics, PHASE_TABLE};

/// Entropy span above the last row over which fallback confidence saturates
const FALLBACK_SPAN: f64 = 1.0;

/// Stateless classifier
#[derive(Debug, Default, Clone, Copy)]
pub struct PhaseClassifier;

impl PhaseClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify raw metrics; `compression_ratio` is compressed/original
    pub fn classify(&self, entropy_bits: f64, compression_ratio: f64) -> PhaseResult {
        let reduction = 1.0 - compression_ratio;

        let hit = PHASE_TABLE
            .iter()
            .find(|def| entropy_bits <= def.entropy_max && reduction >= def.compression_min);

        let result = match hit {
            Some(def) => PhaseResult {
                phase: rank_to_phase(def.rank),
                confidence: inside_confidence(def, entropy_bits, reduction),
                fallback: false,
            },
            None => PhaseResult {
                phase: Phase::BlackCollapse,
                confidence: fallback_confidence(entropy_bits, reduction),
                fallback: true,
            },
        };

        debug!(
            entropy_bits,
            compression_ratio,
            phase = %result.phase,
            confidence = result.confidence,
            fallback = result.fallback,
            "phase classified"
        );
        result
    }

    pub fn classify_metrics(&self, metrics: &TextMetrics) -> PhaseResult {
        self.classify(metrics.entropy_bits, metrics.compression_ratio)
    }
}

fn rank_to_phase(rank: u8) -> Phase {
    Phase::from_rank(rank).unwrap_or(Phase::BlackCollapse)
}

/// Depth inside the selected row, relative to the gap to the stricter row
///
/// Rank 0 has no stricter row; the gap to rank 1 is used instead.
fn inside_confidence(def: &PhaseDefinition, entropy_bits: f64, reduction: f64) -> f64 {
    let neighbour = if def.rank == 0 {
        &PHASE_TABLE[1]
    } else {
        &PHASE_TABLE[def.rank as usize - 1]
    };
    let entropy_gap = (def.entropy_max - neighbour.entropy_max).abs();
    let compression_gap = (neighbour.compression_min - def.compression_min).abs();

    let entropy_margin = (def.entropy_max - entropy_bits) / entropy_gap;
    let compression_margin = (reduction - def.compression_min) / compression_gap;

    entropy_margin.min(compression_margin).clamp(0.0, 1.0)
}

/// How far past the last row's bounds the metrics fall
fn fallback_confidence(entropy_bits: f64, reduction: f64) -> f64 {
    let last = &PHASE_TABLE[PHASE_TABLE.len() - 1];
    let excess = (entropy_bits - last.entropy_max).max(last.compression_min - reduction);
    if excess.is_nan() {
        return 0.0;
    }
    (excess / FALLBACK_SPAN).clamp(0.0, 1.0)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(h: f64, ratio: f64) -> PhaseResult {
        PhaseClassifier::new().classify(h, ratio)
    }

    #[test]
    fn test_crystal_white() {
        let r = classify(3.0, 0.5);
        assert_eq!(r.phase, Phase::CrystalWhite);
        assert_eq!(r.rank(), 0);
        assert!(!r.fallback);
    }

    #[test]
    fn test_black_collapse_on_bound() {
        let r = classify(7.0, 0.0);
        assert_eq!(r.phase, Phase::BlackCollapse);
        assert_eq!(r.rank(), 8);
        assert!(!r.fallback);
    }

    #[test]
    fn test_fallback_above_last_row() {
        let r = classify(7.6, 0.99);
        assert_eq!(r.phase, Phase::BlackCollapse);
        assert!(r.fallback);
        assert!(r.confidence > 0.5);
    }

    #[test]
    fn test_entropy_boundary_belongs_to_lower_rank() {
        // reduction 0.6 satisfies every compression bound
        assert_eq!(classify(3.5, 0.4).phase, Phase::CrystalWhite);
        assert_eq!(classify(3.5001, 0.4).phase, Phase::WhiteLattice);
        assert_eq!(classify(4.2, 0.4).phase, Phase::YellowIgnition);
    }

    #[test]
    fn test_first_match_prefers_ordered_phase() {
        // Low entropy but poor reduction skips down to the first row it fits
        assert_eq!(classify(2.0, 0.7).phase, Phase::YellowIgnition);
        assert_eq!(classify(2.0, 0.97).phase, Phase::VioletDissolution);
        assert_eq!(classify(2.0, 1.0).phase, Phase::BlackCollapse);
    }

    #[test]
    fn test_confidence_monotonic_toward_interior() {
        let on_boundary = classify(3.8, 0.5);
        let inside = classify(3.6, 0.5);
        assert_eq!(on_boundary.phase, Phase::WhiteLattice);
        assert_eq!(inside.phase, Phase::WhiteLattice);
        assert_eq!(on_boundary.confidence, 0.0);
        assert!(inside.confidence > on_boundary.confidence);
    }

    #[test]
    fn test_confidence_in_unit_range() {
        for h in [0.0, 1.5, 3.7, 4.4, 5.0, 6.0, 6.9, 7.5, 8.0] {
            for ratio in [0.01, 0.3, 0.6, 0.9, 1.0] {
                let c = classify(h, ratio).confidence;
                assert!((0.0..=1.0).contains(&c), "h={} ratio={} c={}", h, ratio, c);
            }
        }
    }
}
