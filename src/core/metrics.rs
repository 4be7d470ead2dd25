//! Metrics extractor: Shannon entropy, compression ratio and NCD
//!
//! Every compression measurement uses zlib at a fixed level so results are
//! reproducible across runs and platforms.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::types::{MetricsSummary, TextMetrics};
use crate::COMPRESSION_LEVEL;

/// Stateless extractor; safe to share across threads
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsExtractor;

impl MetricsExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Entropy and ratio in one pass
    pub fn measure(&self, data: &[u8]) -> TextMetrics {
        TextMetrics {
            entropy_bits: entropy_bits(data),
            compression_ratio: compression_ratio(data),
            length: data.len(),
        }
    }

    /// Metrics block for a verification result
    pub fn summarize(&self, text: &str, metrics: &TextMetrics) -> MetricsSummary {
        MetricsSummary {
            entropy_bits: metrics.entropy_bits,
            compression_ratio: metrics.compression_ratio,
            coherence: coherence(text),
            stability: stability(metrics),
            text_length: text.len(),
            word_count: text.split_whitespace().count(),
        }
    }
}

/// Shannon entropy over the byte distribution, bits/symbol
///
/// 0.0 for empty input and for input with one distinct byte.
pub fn entropy_bits(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut counts = [0usize; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    let n = data.len() as f64;
    let h: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.log2()
        })
        .sum();
    // A single symbol sums to -0.0
    if h > 0.0 {
        h
    } else {
        0.0
    }
}

/// Size of `data` after zlib compression
pub fn compressed_size(data: &[u8]) -> usize {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(COMPRESSION_LEVEL));
    // Writing into a Vec cannot fail; treat an error as incompressible
    if encoder.write_all(data).is_err() {
        return data.len();
    }
    encoder.finish().map_or(data.len(), |out| out.len())
}

/// compressed / original, clamped to (0, 1]; 1.0 for empty input
///
/// Short inputs that grow under zlib framing count as incompressible.
pub fn compression_ratio(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 1.0;
    }
    (compressed_size(data) as f64 / data.len() as f64).min(1.0)
}

/// Normalized Compression Distance
///
/// NCD(x,y) = (C(x‖y) − min(C(x),C(y))) / max(C(x),C(y)); ~0 for identical
/// content, ~1 for unrelated content.
pub fn ncd(x: &[u8], y: &[u8]) -> f64 {
    let cx = compressed_size(x);
    let cy = compressed_size(y);
    let mut xy = Vec::with_capacity(x.len() + y.len());
    xy.extend_from_slice(x);
    xy.extend_from_slice(y);
    let cxy = compressed_size(&xy);

    let denominator = cx.max(cy);
    if denominator == 0 {
        return 0.0;
    }
    (cxy as f64 - cx.min(cy) as f64) / denominator as f64
}

/// Token indices as raw bytes, one byte per token
pub fn sequence_to_bytes(seq: &[u8]) -> Vec<u8> {
    seq.to_vec()
}

/// Slide a window over `data` and measure NCD between neighbours
///
/// Returns (window offsets, NCD per consecutive pair). Only full windows are
/// taken; input no longer than one window yields a single window and no NCDs.
pub fn analyze_windows(data: &[u8], window: usize, step: usize) -> (Vec<usize>, Vec<f64>) {
    if data.is_empty() || window == 0 {
        return (Vec::new(), Vec::new());
    }
    if data.len() <= window {
        return (vec![0], Vec::new());
    }

    let step = step.max(1);
    let offsets: Vec<usize> = (0..=data.len() - window).step_by(step).collect();
    let ncds = offsets
        .windows(2)
        .map(|pair| {
            let a = &data[pair[0]..pair[0] + window];
            let b = &data[pair[1]..pair[1] + window];
            ncd(a, b)
        })
        .collect();
    (offsets, ncds)
}

/// Shortest lag at which `data` repeats itself
///
/// Scans lags `1..=max_lag` and returns the first whose byte mismatch rate
/// against the shifted data is within `tolerance`. Needs two full periods.
pub fn repeat_period(data: &[u8], max_lag: usize, tolerance: f64) -> Option<usize> {
    (1..=max_lag)
        .take_while(|&lag| data.len() >= 2 * lag)
        .find(|&lag| {
            let pairs = data.len() - lag;
            let mismatches = data.iter().zip(&data[lag..]).filter(|(a, b)| a != b).count();
            mismatches as f64 / pairs as f64 <= tolerance
        })
}

/// Window step for `window`: half of it, rounded down to a multiple of
/// `period` so neighbouring windows start at the same phase
pub fn aligned_step(window: usize, period: Option<usize>) -> usize {
    let half = (window / 2).max(1);
    match period {
        Some(p) if p > 0 && p <= half => half / p * p,
        _ => half,
    }
}

/// First index of a run of `min_consecutive` NCDs all at or below `max`
pub fn detect_plateau(ncds: &[f64], max: f64, min_consecutive: usize) -> Option<usize> {
    if min_consecutive == 0 || ncds.len() < min_consecutive {
        return None;
    }
    let mut run = 0;
    for (i, &v) in ncds.iter().enumerate() {
        if v <= max {
            run += 1;
            if run >= min_consecutive {
                return Some(i + 1 - min_consecutive);
            }
        } else {
            run = 0;
        }
    }
    None
}

/// Average word length / 10, capped at 1; 0.5 below two words
pub fn coherence(text: &str) -> f64 {
    if text.trim().is_empty() {
        return 0.0;
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < 2 {
        return 0.5;
    }
    let avg = words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / words.len() as f64;
    (avg / 10.0).min(1.0)
}

/// Mean of entropy headroom (1 - H/7, floored at 0) and reduction
pub fn stability(metrics: &TextMetrics) -> f64 {
    let entropy_factor = (1.0 - metrics.entropy_bits / 7.0).max(0.0);
    ((entropy_factor + metrics.reduction()) / 2.0).clamp(0.0, 1.0)
}

// =============================================================================
// TESTS
// =============================================================================
