//! Pipeline configuration
//!
//! Defaults come from the crate-level threshold constants. A JSON file may
//! override any subset of fields.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{CodexError, Phase};
use crate::{
    DEGENERACY_ENTROPY_MAX, DEGENERACY_MIN_CONSECUTIVE, DEGENERACY_NCD_MAX,
    DEGENERACY_REDUCTION_MIN, KERNEL_FREE_ENERGY_ENVELOPE, KERNEL_PRESSURE_ENVELOPE,
    KERNEL_SMOOTHING, NCD_WINDOW_BYTES, SESSION_WINDOW_OBSERVATIONS,
};

/// Degeneracy detector thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DegeneracyConfig {
    pub reduction_min: f64,
    pub entropy_max: f64,
    pub ncd_max: f64,
    pub min_consecutive: usize,
    pub window_bytes: usize,
    /// Observations kept per session
    pub observations: usize,
}

impl Default for DegeneracyConfig {
    fn default() -> Self {
        Self {
            reduction_min: DEGENERACY_REDUCTION_MIN,
            entropy_max: DEGENERACY_ENTROPY_MAX,
            ncd_max: DEGENERACY_NCD_MAX,
            min_consecutive: DEGENERACY_MIN_CONSECUTIVE,
            window_bytes: NCD_WINDOW_BYTES,
            observations: SESSION_WINDOW_OBSERVATIONS,
        }
    }
}

/// Kernel tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub smoothing: f64,
    pub free_energy_envelope: f64,
    pub pressure_envelope: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            smoothing: KERNEL_SMOOTHING,
            free_energy_envelope: KERNEL_FREE_ENERGY_ENVELOPE,
            pressure_envelope: KERNEL_PRESSURE_ENVELOPE,
        }
    }
}

/// Top-level verification config
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Least ordered phase that still verifies
    pub threshold: Phase,
    pub degeneracy: DegeneracyConfig,
    pub kernel: KernelConfig,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            threshold: Phase::default(),
            degeneracy: DegeneracyConfig::default(),
            kernel: KernelConfig::default(),
        }
    }
}

impl VerifyConfig {
    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> Result<Self, CodexError> {
        let config: VerifyConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CodexError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn with_threshold(mut self, threshold: Phase) -> Self {
        self.threshold = threshold;
        self
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), CodexError> {
        let k = &self.kernel;
        if !(k.smoothing > 0.0 && k.smoothing < 1.0) {
            return Err(CodexError::Config(format!(
                "kernel.smoothing must be in (0, 1), got {}",
                k.smoothing
            )));
        }
        if k.free_energy_envelope <= 0.0 || k.pressure_envelope <= 0.0 {
            return Err(CodexError::Config("kernel envelopes must be positive".to_string()));
        }
        let d = &self.degeneracy;
        if d.window_bytes < 2 {
            return Err(CodexError::Config("degeneracy.window_bytes must be at least 2".to_string()));
        }
        if d.observations == 0 || d.min_consecutive == 0 {
            return Err(CodexError::Config(
                "degeneracy.observations and min_consecutive must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override() {
        let config = VerifyConfig::from_json_str(
            r#"{"threshold": "RED_COMBUSTION", "kernel": {"smoothing": 0.5}}"#,
        )
        .unwrap();
        assert_eq!(config.threshold, Phase::RedCombustion);
        assert_eq!(config.kernel.smoothing, 0.5);
        assert_eq!(config.kernel.pressure_envelope, KERNEL_PRESSURE_ENVELOPE);
        assert_eq!(config.degeneracy, DegeneracyConfig::default());
    }

    #[test]
    fn test_rejects_bad_smoothing() {
        let err = VerifyConfig::from_json_str(r#"{"kernel": {"smoothing": 1.0}}"#).unwrap_err();
        assert!(matches!(err, CodexError::Config(_)));
    }

    #[test]
    fn test_rejects_unknown_phase() {
        let err = VerifyConfig::from_json_str(r#"{"threshold": "GRAY_LOOP"}"#).unwrap_err();
        assert!(matches!(err, CodexError::Json(_)));
    }
}
