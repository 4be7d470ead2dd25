//! Information-theoretic measurements

use serde::{Deserialize, Serialize};

/// Entropy and compressibility of one input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextMetrics {
    /// Shannon entropy over bytes, bits/symbol (0.0-8.0)
    pub entropy_bits: f64,
    /// compressed / original, in (0, 1]; smaller = more compressible
    pub compression_ratio: f64,
    /// Input length in bytes
    pub length: usize,
}

impl TextMetrics {
    /// Fraction of bytes the compressor removed (1 - ratio)
    pub fn reduction(&self) -> f64 {
        1.0 - self.compression_ratio
    }
}

/// Metrics block of a verification result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub entropy_bits: f64,
    pub compression_ratio: f64,
    /// Word-length heuristic (0.0-1.0)
    pub coherence: f64,
    /// Mix of low entropy and high reduction (0.0-1.0)
    pub stability: f64,
    pub text_length: usize,
    pub word_count: usize,
}

/// Full degeneracy analysis of one byte string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegeneracyReport {
    pub is_degenerate: bool,
    pub compression_ratio: f64,
    pub entropy_bits: f64,
    /// NCD between each pair of consecutive windows
    pub window_ncds: Vec<f64>,
    pub plateau_detected: bool,
    /// Byte offset of the first window in the plateau
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plateau_start: Option<usize>,
    /// Which conditions held, or why none fired
    pub trigger_reason: String,
    pub window_size: usize,
    /// Offset between neighbouring windows, aligned to the repeat period
    pub window_step: usize,
    /// Shortest repeat period of the analysed bytes, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<usize>,
    pub num_windows: usize,
}

impl DegeneracyReport {
    /// Lowest NCD of the window series, if any
    pub fn min_ncd(&self) -> Option<f64> {
        self.window_ncds.iter().copied().reduce(f64::min)
    }
}
