//! Codex7: canon adjacency validation and thermodynamic phase classification
//!
//! Pipeline: text → MetricsExtractor → DegeneracyDetector → PhaseClassifier
//! → ThermodynamicKernel → VerificationResult

pub mod core;
pub mod types;

pub use types::CodexError;

// =============================================================================
// CANON [C] - 7-cycle adjacency law
// =============================================================================

/// Number of canonical tokens (the cycle length)
pub const CANON_MODULUS: u8 = 7;

/// Legal forward/backward deltas on the cycle
pub const CANON_VALID_DELTAS: [u8; 2] = [1, 6];

/// Version tag of the built-in canon table
pub const CANON_VERSION: &str = "1.0.0";

// =============================================================================
// COMPRESSION [C]
// =============================================================================

/// zlib level used for every compression measurement (ratio, NCD)
pub const COMPRESSION_LEVEL: u32 = 9;

// =============================================================================
// DEGENERACY THRESHOLDS [C]
// All three must hold at once for a degeneracy event
// =============================================================================

/// Minimum reduction (1 - ratio): 0.90 means compressed to 10% or less
pub const DEGENERACY_REDUCTION_MIN: f64 = 0.90;

/// Maximum entropy in bits/symbol
pub const DEGENERACY_ENTROPY_MAX: f64 = 3.0;

/// Maximum NCD between consecutive windows to count as "near identical"
pub const DEGENERACY_NCD_MAX: f64 = 0.10;

/// Consecutive low-NCD windows required for a plateau
pub const DEGENERACY_MIN_CONSECUTIVE: usize = 3;

/// Byte window for NCD analysis (step is half of this, or the largest
/// multiple of the content's repeat period that fits)
pub const NCD_WINDOW_BYTES: usize = 64;

/// Byte mismatch rate at which a lag still counts as the repeat period
pub const DEGENERACY_PERIOD_TOLERANCE: f64 = 0.10;

/// Observations kept per session by the detector
pub const SESSION_WINDOW_OBSERVATIONS: usize = 4;

// =============================================================================
// THERMODYNAMIC KERNEL [C]
// =============================================================================

/// Seed temperature for a fresh kernel (Kelvin)
pub const KERNEL_SEED_TEMPERATURE_K: f64 = 298.15;

/// Temperature floor reached by fully reducible input
pub const KERNEL_BASE_TEMPERATURE_K: f64 = 273.15;

/// Temperature span added for incompressible input
pub const KERNEL_TEMPERATURE_SPAN_K: f64 = 350.0;

/// Smoothing weight of the new temperature target, in (0, 1)
pub const KERNEL_SMOOTHING: f64 = 0.3;

/// Potential added per bit of entropy (ln 2, Landauer)
pub const KERNEL_LANDAUER_COST: f64 = std::f64::consts::LN_2;

/// |free_energy| bound of the LAWFUL envelope
pub const KERNEL_FREE_ENERGY_ENVELOPE: f64 = 2000.0;

/// |pressure| bound of the LAWFUL envelope (bits per call)
pub const KERNEL_PRESSURE_ENVELOPE: f64 = 1.5;

/// Consecutive RETURN selections that count as infinite mirroring
pub const KERNEL_MIRROR_LIMIT: u32 = 3;

/// Entropy changes smaller than this are treated as steady
pub const KERNEL_TREND_EPSILON: f64 = 1e-9;

// =============================================================================
// HTTP API LIMITS [C]
// =============================================================================

/// Largest request body accepted by the API
pub const API_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Most texts in one batch request
pub const API_MAX_BATCH_TEXTS: usize = 1000;

/// Most sessions held at once; the least recently used is evicted beyond this
pub const API_MAX_SESSIONS: usize = 10_000;

/// Idle time after which a session is dropped
pub const API_SESSION_IDLE_TTL_SECS: u64 = 30 * 60;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
