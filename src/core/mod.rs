//! Core modules for Codex7

pub mod canon;
pub mod tokens;
pub mod metrics;
pub mod phase;
pub mod degeneracy;
pub mod kernel;
pub mod verify;
pub mod api;

pub use canon::{AdjacencyValidator, CanonDefinition, CanonEntry, CanonTable, CANON};
pub use tokens::{parse_json_values, parse_tokens};
pub use metrics::{
    aligned_step, analyze_windows, compression_ratio, detect_plateau, entropy_bits, ncd,
    repeat_period, sequence_to_bytes, MetricsExtractor,
};
pub use phase::PhaseClassifier;
pub use degeneracy::DegeneracyDetector;
pub use kernel::ThermodynamicKernel;
pub use verify::{fingerprint, Session, Verifier};
pub use api::{create_router, create_router_with_config, create_router_with_limits, run_server, ApiLimits};
