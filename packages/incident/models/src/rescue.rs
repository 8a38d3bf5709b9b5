//! Rescue steps attached to an incident.
//!
//! Step numbers are 1-based, unique within an incident, and always assigned
//! server-side as one past the highest existing number. Numbers freed by a
//! removed step are never reused.

use serde::{Deserialize, Serialize};

/// An ordered, completable instruction attached to an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescueStep {
    /// 1-based position, unique within the incident.
    pub step_number: u32,
    /// What to do.
    pub instruction: String,
    /// Whether the step has been carried out.
    #[serde(default)]
    pub is_completed: bool,
}

impl RescueStep {
    /// Creates a new, not-yet-completed step.
    #[must_use]
    pub fn new(step_number: u32, instruction: impl Into<String>) -> Self {
        Self {
            step_number,
            instruction: instruction.into(),
            is_completed: false,
        }
    }

    /// Applies the supplied sub-fields, leaving the rest untouched.
    pub fn apply(&mut self, changes: &RescueStepChanges) {
        if let Some(instruction) = &changes.instruction {
            self.instruction.clone_from(instruction);
        }
        if let Some(is_completed) = changes.is_completed {
            self.is_completed = is_completed;
        }
    }
}

/// A partial update to a single rescue step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RescueStepChanges {
    /// New instruction text.
    pub instruction: Option<String>,
    /// New completion flag.
    pub is_completed: Option<bool>,
}

/// Returns the number the next appended step should get: one past the
/// current maximum, or 1 for an empty list.
#[must_use]
pub fn next_step_number(steps: &[RescueStep]) -> u32 {
    steps
        .iter()
        .map(|s| s.step_number)
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

/// Finds the step with the given number.
#[must_use]
pub fn find_step_mut(steps: &mut [RescueStep], step_number: u32) -> Option<&mut RescueStep> {
    steps.iter_mut().find(|s| s.step_number == step_number)
}
