//! Thermodynamic kernel state and step output

use serde::{Deserialize, Serialize};
use crate::types::{GrayEvent, Phase};

/// Kernel state after a step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermodynamicState {
    pub entropy_bits: f64,
    pub free_energy: f64,
    #[serde(rename = "temperature_K")]
    pub temperature_k: f64,
    pub pressure: f64,
    pub accumulated_potential: f64,
}

/// Coarse regime label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    /// Free energy and pressure inside the envelope
    Lawful,
    /// Outside the envelope
    Volatile,
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Regime::Lawful => write!(f, "LAWFUL"),
            Regime::Volatile => write!(f, "VOLATILE"),
        }
    }
}

/// Direction of entropy change between consecutive steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntropyTrend {
    Rising,
    Falling,
    /// No change, or the first step of a session
    Steady,
    /// Sign flipped against the last non-steady direction
    Oscillating,
}

/// Everything one `advance()` produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelStep {
    /// 1-based step number within the session
    pub step: usize,
    pub state: ThermodynamicState,
    /// Phase computed from the step inputs
    pub phase: Phase,
    pub trend: EntropyTrend,
    /// Canon index of the dominant operator
    pub dominant_index: u8,
    /// Operator name, e.g. "SPARK"
    pub dominant_operator: String,
    pub regime: Regime,
    /// 0.0-1.0, depth inside the lawful envelope
    pub lawfulness: f64,
    pub gray_events: Vec<GrayEvent>,
}
