//! Thermodynamic kernel: per-session state driven by entropy and compressibility
//!
//! One kernel per session, advanced once per input. Every step is computed
//! from the previous state only:
//! 1. free_energy = H * T_prev - potential_prev
//! 2. T = (1-a) * T_prev + a * (T_base + T_span * ratio)
//! 3. pressure = H - H_prev (0 on the first step)
//! 4. potential += ln2 * H
//!
//! The dominant operator is chosen from the entropy trend and the phase rank.

use tracing::{debug, warn};

use crate::core::canon::CANON;
use crate::core::phase::PhaseClassifier;
use crate::types::{
    EntropyTrend, EventMetrics, GrayEvent, KernelConfig, KernelStep, Regime, ThermodynamicState,
};
use crate::{
    KERNEL_BASE_TEMPERATURE_K, KERNEL_LANDAUER_COST, KERNEL_MIRROR_LIMIT,
    KERNEL_SEED_TEMPERATURE_K, KERNEL_TEMPERATURE_SPAN_K, KERNEL_TREND_EPSILON,
};

// Canon indices of the operators the kernel selects
const CUT: u8 = 0;
const FRAME: u8 = 1;
const SPARK: u8 = 2;
const GROUND: u8 = 3;
const PULSE: u8 = 4;
const WEAVE: u8 = 5;
const RETURN: u8 = 6;

/// Session-local kernel state
#[derive(Debug, Clone)]
pub struct ThermodynamicKernel {
    config: KernelConfig,
    classifier: PhaseClassifier,
    state: ThermodynamicState,
    steps: usize,
    last_entropy: Option<f64>,
    /// Last Rising/Falling trend, for oscillation detection
    last_direction: Option<EntropyTrend>,
    return_streak: u32,
}

impl Default for ThermodynamicKernel {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}

impl ThermodynamicKernel {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            config,
            classifier: PhaseClassifier::new(),
            state: seed_state(),
            steps: 0,
            last_entropy: None,
            last_direction: None,
            return_streak: 0,
        }
    }

    /// State after the last step (seed state before any)
    pub fn state(&self) -> &ThermodynamicState {
        &self.state
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Advance one step with the metrics of the next input
    pub fn advance(&mut self, entropy_bits: f64, compression_ratio: f64) -> KernelStep {
        self.steps += 1;
        let step = self.steps;
        let prev = self.state;

        let alpha = self.config.smoothing;
        let ratio = compression_ratio.clamp(0.0, 1.0);
        let target = KERNEL_BASE_TEMPERATURE_K + KERNEL_TEMPERATURE_SPAN_K * ratio;

        let free_energy = entropy_bits * prev.temperature_k - prev.accumulated_potential;
        let temperature_k = (1.0 - alpha) * prev.temperature_k + alpha * target;
        let pressure = self.last_entropy.map_or(0.0, |h| entropy_bits - h);
        let accumulated_potential = prev.accumulated_potential + KERNEL_LANDAUER_COST * entropy_bits;

        self.state = ThermodynamicState {
            entropy_bits,
            free_energy,
            temperature_k,
            pressure,
            accumulated_potential,
        };

        let mut gray_events = Vec::new();
        if entropy_bits <= 0.0 {
            gray_events.push(GrayEvent::costless_operation(
                step,
                EventMetrics {
                    entropy_bits: Some(entropy_bits),
                    compression_ratio: Some(compression_ratio),
                    accumulated_potential: Some(accumulated_potential),
                    ..EventMetrics::default()
                },
            ));
        }

        let trend = self.update_trend(pressure);
        let phase = self.classifier.classify(entropy_bits, compression_ratio).phase;
        let dominant_index = dominant_operator(trend, phase.rank());

        if dominant_index == RETURN {
            self.return_streak += 1;
            if self.return_streak == KERNEL_MIRROR_LIMIT {
                gray_events.push(GrayEvent::infinite_mirroring(step, self.return_streak));
            }
        } else {
            self.return_streak = 0;
        }

        let (regime, lawfulness) = self.regime(free_energy, pressure);
        let dominant_operator = CANON
            .get(dominant_index)
            .map_or("RETURN", |t| t.operator)
            .to_string();

        debug!(
            step,
            entropy_bits,
            free_energy,
            temperature_k,
            pressure,
            accumulated_potential,
            operator = %dominant_operator,
            regime = %regime,
            "kernel step"
        );
        for event in &gray_events {
            warn!(step, kind = event.kind.code(), "{}", event.reason);
        }

        KernelStep {
            step,
            state: self.state,
            phase,
            trend,
            dominant_index,
            dominant_operator,
            regime,
            lawfulness,
            gray_events,
        }
    }

    fn update_trend(&mut self, pressure: f64) -> EntropyTrend {
        if self.last_entropy.is_none() {
            self.last_entropy = Some(self.state.entropy_bits);
            return EntropyTrend::Steady;
        }
        self.last_entropy = Some(self.state.entropy_bits);

        if pressure.abs() < KERNEL_TREND_EPSILON {
            return EntropyTrend::Steady;
        }
        let direction = if pressure > 0.0 {
            EntropyTrend::Rising
        } else {
            EntropyTrend::Falling
        };
        let flipped = self.last_direction.is_some_and(|d| d != direction);
        self.last_direction = Some(direction);
        if flipped {
            EntropyTrend::Oscillating
        } else {
            direction
        }
    }

    fn regime(&self, free_energy: f64, pressure: f64) -> (Regime, f64) {
        let f_env = self.config.free_energy_envelope;
        let p_env = self.config.pressure_envelope;

        let regime = if free_energy.abs() <= f_env && pressure.abs() <= p_env {
            Regime::Lawful
        } else {
            Regime::Volatile
        };
        let lawfulness = (1.0 - free_energy.abs() / f_env)
            .min(1.0 - pressure.abs() / p_env)
            .clamp(0.0, 1.0);
        (regime, lawfulness)
    }
}

fn seed_state() -> ThermodynamicState {
    ThermodynamicState {
        entropy_bits: 0.0,
        free_energy: 0.0,
        temperature_k: KERNEL_SEED_TEMPERATURE_K,
        pressure: 0.0,
        accumulated_potential: 0.0,
    }
}

/// Operator for a trend at a given phase rank
pub fn dominant_operator(trend: EntropyTrend, rank: u8) -> u8 {
    match trend {
        EntropyTrend::Oscillating => RETURN,
        EntropyTrend::Rising if rank <= 4 => SPARK,
        EntropyTrend::Rising => PULSE,
        EntropyTrend::Falling if rank <= 4 => FRAME,
        EntropyTrend::Falling => CUT,
        EntropyTrend::Steady => match rank {
            0..=2 => GROUND,
            3..=5 => WEAVE,
            _ => RETURN,
        },
    }
}

// =============================================================================
// TESTS
// =============================================================================
