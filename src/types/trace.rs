//! Step trace of a token sequence

use serde::{Deserialize, Serialize};

/// How a transition moved on the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDirection {
    /// delta = 1
    Forward,
    /// delta = 6
    Backward,
    /// delta = 0
    Hold,
    /// any other delta
    Jump,
}

/// One recorded transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTrace {
    pub step: usize,
    pub from: u8,
    pub to: u8,
    pub delta: u8,
    pub direction: StepDirection,
    pub legal: bool,
}

/// All transitions of a sequence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub steps: Vec<StepTrace>,
    pub legal_steps: usize,
    pub illegal_steps: usize,
}

impl ExecutionTrace {
    pub fn push(&mut self, step: StepTrace) {
        if step.legal {
            self.legal_steps += 1;
        } else {
            self.illegal_steps += 1;
        }
        self.steps.push(step);
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }
}
