//! Phase definitions: 9 ordered disorder classes

use serde::{Deserialize, Serialize};
use crate::types::CodexError;

/// The nine phases, most ordered first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    CrystalWhite,
    WhiteLattice,
    YellowIgnition,
    GreenAccumulation,
    RedCombustion,
    OrangeHarvest,
    BlueDispersion,
    VioletDissolution,
    BlackCollapse,
}

impl Phase {
    pub const ALL: [Phase; 9] = [
        Phase::CrystalWhite,
        Phase::WhiteLattice,
        Phase::YellowIgnition,
        Phase::GreenAccumulation,
        Phase::RedCombustion,
        Phase::OrangeHarvest,
        Phase::BlueDispersion,
        Phase::VioletDissolution,
        Phase::BlackCollapse,
    ];

    pub fn rank(&self) -> u8 {
        *self as u8
    }

    pub fn from_rank(rank: u8) -> Option<Phase> {
        Self::ALL.get(rank as usize).copied()
    }

    pub fn name(&self) -> &'static str {
        self.definition().name
    }

    /// Threshold row for this phase
    pub fn definition(&self) -> &'static PhaseDefinition {
        &PHASE_TABLE[self.rank() as usize]
    }

    /// Parse a phase name (case-insensitive, `-` or `_` separated)
    pub fn from_name(name: &str) -> Result<Phase, CodexError> {
        let normalized = name.trim().replace('-', "_").to_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == normalized)
            .ok_or_else(|| CodexError::UnknownPhase(name.to_string()))
    }

    /// ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            Phase::CrystalWhite | Phase::WhiteLattice => "\x1b[97m",
            Phase::YellowIgnition => "\x1b[93m",
            Phase::GreenAccumulation => "\x1b[92m",
            Phase::RedCombustion => "\x1b[91m",
            Phase::OrangeHarvest => "\x1b[33m",
            Phase::BlueDispersion => "\x1b[94m",
            Phase::VioletDissolution => "\x1b[95m",
            Phase::BlackCollapse => "\x1b[90m",
        }
    }
}

impl Default for Phase {
    /// Default verification threshold
    fn default() -> Self {
        Phase::WhiteLattice
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One row of the phase table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseDefinition {
    pub name: &'static str,
    /// Upper entropy bound (bits/symbol), inclusive
    pub entropy_max: f64,
    /// Lower reduction bound (1 - compression ratio), inclusive
    pub compression_min: f64,
    pub rank: u8,
}

/// Phase thresholds [C], ordered by rank
pub const PHASE_TABLE: [PhaseDefinition; 9] = [
    PhaseDefinition { name: "CRYSTAL_WHITE", entropy_max: 3.5, compression_min: 0.40, rank: 0 },
    PhaseDefinition { name: "WHITE_LATTICE", entropy_max: 3.8, compression_min: 0.35, rank: 1 },
    PhaseDefinition { name: "YELLOW_IGNITION", entropy_max: 4.2, compression_min: 0.25, rank: 2 },
    PhaseDefinition { name: "GREEN_ACCUMULATION", entropy_max: 4.5, compression_min: 0.20, rank: 3 },
    PhaseDefinition { name: "RED_COMBUSTION", entropy_max: 4.8, compression_min: 0.15, rank: 4 },
    PhaseDefinition { name: "ORANGE_HARVEST", entropy_max: 5.2, compression_min: 0.10, rank: 5 },
    PhaseDefinition { name: "BLUE_DISPERSION", entropy_max: 5.5, compression_min: 0.05, rank: 6 },
    PhaseDefinition { name: "VIOLET_DISSOLUTION", entropy_max: 6.2, compression_min: 0.02, rank: 7 },
    PhaseDefinition { name: "BLACK_COLLAPSE", entropy_max: 7.0, compression_min: 0.0, rank: 8 },
];

/// Classifier output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase: Phase,
    /// 0.0-1.0, how far inside the phase the metrics sit
    pub confidence: f64,
    /// True when no row matched and BLACK_COLLAPSE was chosen as catch-all
    pub fallback: bool,
}

impl PhaseResult {
    pub fn rank(&self) -> u8 {
        self.phase.rank()
    }
}
