//! Core types for Codex7

mod config;
mod error;
mod gray;
mod metrics;
mod phase;
mod result;
mod thermo;
mod token;
mod trace;

pub use config::{DegeneracyConfig, KernelConfig, VerifyConfig};
pub use error::CodexError;
pub use gray::{EventMetrics, GrayEvent, GrayKind, Severity};
pub use metrics::{DegeneracyReport, MetricsSummary, TextMetrics};
pub use phase::{Phase, PhaseDefinition, PhaseResult, PHASE_TABLE};
pub use result::{BatchEntry, BatchReport, CheckReport, VerificationResult};
pub use thermo::{EntropyTrend, KernelStep, Regime, ThermodynamicState};
pub use token::{AdjacencyRule, ColorToken, ParsedSequence, SequenceItem};
pub use trace::{ExecutionTrace, StepDirection, StepTrace};
