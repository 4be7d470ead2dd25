//! Degeneracy detector: mimic loops and repetitive output
//!
//! Fires only when the current input is highly reducible, low entropy, AND the
//! session window shows a plateau of near-identical consecutive windows.
//! Windows step by a multiple of the content's repeat period, so a loop of
//! any short period compares like against like.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::core::metrics::{aligned_step, analyze_windows, detect_plateau, repeat_period, MetricsExtractor};
use crate::types::{DegeneracyConfig, DegeneracyReport, EventMetrics, GrayEvent, TextMetrics};
use crate::DEGENERACY_PERIOD_TOLERANCE;

/// One observation kept in the session window
#[derive(Debug, Clone)]
struct Observation {
    bytes: Vec<u8>,
}

/// Per-session detector holding the last `config.observations` inputs
#[derive(Debug, Clone)]
pub struct DegeneracyDetector {
    config: DegeneracyConfig,
    extractor: MetricsExtractor,
    window: VecDeque<Observation>,
}

impl Default for DegeneracyDetector {
    fn default() -> Self {
        Self::new(DegeneracyConfig::default())
    }
}

impl DegeneracyDetector {
    pub fn new(config: DegeneracyConfig) -> Self {
        Self {
            config,
            extractor: MetricsExtractor::new(),
            window: VecDeque::with_capacity(config.observations),
        }
    }

    pub fn config(&self) -> &DegeneracyConfig {
        &self.config
    }

    /// Observations currently held
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }

    /// Record an input and check the session window
    ///
    /// `metrics` must be the measurement of `bytes`. The event position is
    /// the byte offset of the plateau inside the concatenated window.
    pub fn observe(&mut self, bytes: &[u8], metrics: &TextMetrics) -> Option<GrayEvent> {
        self.window.push_back(Observation { bytes: bytes.to_vec() });
        while self.window.len() > self.config.observations {
            self.window.pop_front();
        }

        let content: Vec<u8> = self
            .window
            .iter()
            .flat_map(|o| o.bytes.iter().copied())
            .collect();
        let report = self.evaluate(&content, metrics);
        if !report.is_degenerate {
            return None;
        }

        let event = GrayEvent::degeneracy_detected(
            report.plateau_start.unwrap_or(0),
            EventMetrics {
                entropy_bits: Some(metrics.entropy_bits),
                compression_ratio: Some(metrics.compression_ratio),
                ncd: plateau_min_ncd(&report, self.config.min_consecutive),
                ..EventMetrics::default()
            },
        );
        warn!(
            entropy_bits = metrics.entropy_bits,
            compression_ratio = metrics.compression_ratio,
            observations = self.window.len(),
            "degeneracy detected"
        );
        Some(event)
    }

    /// Stateless analysis of one byte string (texts or token sequences)
    pub fn inspect(&self, data: &[u8]) -> DegeneracyReport {
        let metrics = self.extractor.measure(data);
        self.evaluate(data, &metrics)
    }

    /// Apply the three conditions: `metrics` for the current input, the
    /// window series over `content`
    fn evaluate(&self, content: &[u8], metrics: &TextMetrics) -> DegeneracyReport {
        let c = &self.config;
        let period = repeat_period(content, c.window_bytes / 2, DEGENERACY_PERIOD_TOLERANCE);
        let step = aligned_step(c.window_bytes, period);
        let (offsets, ncds) = analyze_windows(content, c.window_bytes, step);
        let plateau = detect_plateau(&ncds, c.ncd_max, c.min_consecutive);

        let reducible = metrics.reduction() >= c.reduction_min;
        let low_entropy = metrics.entropy_bits <= c.entropy_max;
        let plateau_start = plateau.and_then(|i| offsets.get(i).copied());

        let mut held = Vec::new();
        let mut missed = Vec::new();
        let reduction_note = format!("reduction {:.3} vs {:.2}", metrics.reduction(), c.reduction_min);
        let entropy_note = format!("entropy {:.3} vs {:.2}", metrics.entropy_bits, c.entropy_max);
        if reducible {
            held.push(reduction_note);
        } else {
            missed.push(reduction_note);
        }
        if low_entropy {
            held.push(entropy_note);
        } else {
            missed.push(entropy_note);
        }
        match plateau_start {
            Some(offset) => held.push(format!("plateau at byte {}", offset)),
            None if ncds.len() < c.min_consecutive => {
                missed.push(format!("{} window pairs, too short for a plateau", ncds.len()))
            }
            None => missed.push(format!("no {} consecutive NCDs <= {:.2}", c.min_consecutive, c.ncd_max)),
        }

        let is_degenerate = missed.is_empty();
        let trigger_reason = if is_degenerate {
            format!("all conditions held: {}", held.join(", "))
        } else {
            format!("not degenerate: {}", missed.join(", "))
        };

        debug!(
            bytes = content.len(),
            period = ?period,
            step,
            windows = offsets.len(),
            is_degenerate,
            "degeneracy evaluated"
        );

        DegeneracyReport {
            is_degenerate,
            compression_ratio: metrics.compression_ratio,
            entropy_bits: metrics.entropy_bits,
            window_ncds: ncds,
            plateau_detected: plateau_start.is_some(),
            plateau_start,
            trigger_reason,
            window_size: c.window_bytes,
            window_step: step,
            period,
            num_windows: offsets.len(),
        }
    }
}

fn plateau_min_ncd(report: &DegeneracyReport, run: usize) -> Option<f64> {
    let start = report.plateau_start?;
    let first = start / report.window_step.max(1);
    report
        .window_ncds
        .iter()
        .skip(first)
        .take(run)
        .copied()
        .reduce(f64::min)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PROSE: &str = "It was a bright cold day in April, and the clocks were striking \
        thirteen. Winston Smith, his chin nuzzled into his breast in an effort to escape \
        the vile wind, slipped quickly through the glass doors of Victory Mansions, though \
        not quickly enough to prevent a swirl of gritty dust from entering along with him.";

    fn observe(detector: &mut DegeneracyDetector, text: &[u8]) -> Option<GrayEvent> {
        let metrics = MetricsExtractor::new().measure(text);
        detector.observe(text, &metrics)
    }

    #[test]
    fn test_long_single_byte_run_is_degenerate() {
        let text = vec![b'a'; 1200];
        let report = DegeneracyDetector::default().inspect(&text);
        assert!(report.is_degenerate, "{}", report.trigger_reason);
        assert!(report.plateau_detected);
        assert_eq!(report.plateau_start, Some(0));
        assert_eq!(report.window_size, 64);
    }

    #[test]
    fn test_seven_cycle_is_degenerate() {
        let cycle: Vec<u8> = (0..600).map(|i| (i % 7) as u8).collect();
        let report = DegeneracyDetector::default().inspect(&cycle);
        assert!(report.is_degenerate, "{}", report.trigger_reason);
        assert_eq!(report.period, Some(7));
        assert_eq!(report.window_step, 28);
        assert!(report.window_ncds.iter().all(|&n| n <= 0.10), "{:?}", report.window_ncds);
    }

    #[test]
    fn test_period_five_text_is_degenerate() {
        for unit in ["hello", "abcab"] {
            let text = unit.repeat(120);
            let report = DegeneracyDetector::default().inspect(text.as_bytes());
            assert!(report.is_degenerate, "{}: {}", unit, report.trigger_reason);
            assert_eq!(report.period, Some(5));
        }
    }

    #[test]
    fn test_period_three_text_is_degenerate() {
        let report = DegeneracyDetector::default().inspect("abc".repeat(200).as_bytes());
        assert!(report.is_degenerate, "{}", report.trigger_reason);
        assert_eq!(report.window_step, 30);
    }

    #[test]
    fn test_prose_is_not_degenerate() {
        let report = DegeneracyDetector::default().inspect(PROSE.as_bytes());
        assert!(!report.is_degenerate);
        assert!(report.trigger_reason.starts_with("not degenerate"));
        assert_eq!(report.period, None);
        assert_eq!(report.window_step, 32);
    }

    #[test]
    fn test_short_input_never_plateaus() {
        let report = DegeneracyDetector::default().inspect(b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        assert!(!report.plateau_detected);
        assert!(!report.is_degenerate);
        assert!(report.window_ncds.is_empty());
    }

    #[test]
    fn test_observe_emits_warning_with_metrics() {
        let mut detector = DegeneracyDetector::default();
        let event = observe(&mut detector, &vec![b'a'; 1024]).expect("event");
        assert!(!event.is_error());
        let metrics = event.metrics.expect("metrics");
        assert_eq!(metrics.entropy_bits, Some(0.0));
        assert!(metrics.ncd.is_some_and(|n| n <= 0.10));
    }

    #[test]
    fn test_window_is_bounded() {
        let mut detector = DegeneracyDetector::default();
        for _ in 0..10 {
            observe(&mut detector, PROSE.as_bytes());
        }
        assert_eq!(detector.len(), 4);
        detector.reset();
        assert!(detector.is_empty());
    }

    #[test]
    fn test_prose_after_loop_is_clean() {
        let mut detector = DegeneracyDetector::default();
        assert!(observe(&mut detector, &vec![b'a'; 1024]).is_some());
        // Window still repeats but the current input is not reducible enough
        assert!(observe(&mut detector, PROSE.as_bytes()).is_none());
    }
}
