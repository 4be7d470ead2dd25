//! Output records of the verification pipeline

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    DegeneracyReport, ExecutionTrace, GrayEvent, MetricsSummary, Phase, Regime,
    ThermodynamicState,
};

/// One verification verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Phase within threshold and no ERROR events
    pub verified: bool,
    pub detected_phase: Phase,
    pub phase_rank: u8,
    pub confidence: f64,
    pub metrics: MetricsSummary,
    pub thermodynamic_state: ThermodynamicState,
    pub dominant_operator: String,
    pub regime: Regime,
    pub lawfulness: f64,
    pub gray_events: Vec<GrayEvent>,
    pub threshold_phase: Phase,
    /// SHA-256 of the input, hex
    pub fingerprint: String,
    pub timestamp: DateTime<Utc>,
}

impl VerificationResult {
    /// One-line summary without colors
    pub fn to_parseable_string(&self) -> String {
        format!(
            "verified={} | phase={}({}) | confidence={:.3} | H={:.3} | ratio={:.3} | op={} | regime={} | events={}",
            self.verified,
            self.detected_phase,
            self.phase_rank,
            self.confidence,
            self.metrics.entropy_bits,
            self.metrics.compression_ratio,
            self.dominant_operator,
            self.regime,
            self.gray_events.len()
        )
    }
}

/// One slot of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<VerificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate over independent verifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub verified: usize,
    pub failed: usize,
    pub mean_entropy_bits: f64,
    pub mean_compression_ratio: f64,
    /// Phase name → count, successful entries only
    pub phase_histogram: BTreeMap<String, usize>,
    pub entries: Vec<BatchEntry>,
}

/// Result of checking a token sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    pub is_valid: bool,
    pub sequence_length: usize,
    pub gray_events: Vec<GrayEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<ExecutionTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degeneracy: Option<DegeneracyReport>,
}
