//! Bounded random timing/velocity jitter

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::note::Note;

/// Which note fields humanize perturbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HumanizeMode {
    Velocity,
    Time,
    #[default]
    Both,
}

impl HumanizeMode {
    /// Parse a host-supplied mode name. Unknown names perturb both fields.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "velocity" => Self::Velocity,
            "time" => Self::Time,
            "both" => Self::Both,
            other => {
                debug!(mode = other, "Unknown humanize mode, using both");
                Self::Both
            }
        }
    }

    pub fn affects_time(self) -> bool {
        matches!(self, Self::Time | Self::Both)
    }

    pub fn affects_velocity(self) -> bool {
        matches!(self, Self::Velocity | Self::Both)
    }
}

/// Maximum jitter per field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanizeParams {
    /// Beats
    pub max_time_delta: f64,
    /// Velocity steps
    pub max_velocity_delta: f64,
}

impl Default for HumanizeParams {
    fn default() -> Self {
        Self {
            max_time_delta: 0.05,
            max_velocity_delta: 5.0,
        }
    }
}

impl HumanizeParams {
    /// Fill in whichever deltas the caller supplied
    pub fn with_overrides(self, max_time_delta: Option<f64>, max_velocity_delta: Option<f64>) -> Self {
        Self {
            max_time_delta: max_time_delta.unwrap_or(self.max_time_delta),
            max_velocity_delta: max_velocity_delta.unwrap_or(self.max_velocity_delta),
        }
    }
}

/// Source of uniform values in `[-1, 1]`
pub trait RandomSource {
    fn next_bipolar(&mut self) -> f64;
}

impl RandomSource for fastrand::Rng {
    fn next_bipolar(&mut self) -> f64 {
        self.f64() * 2.0 - 1.0
    }
}

/// Replays a fixed list of values, cycling when exhausted
#[derive(Debug, Clone)]
pub struct FixedSequence {
    values: Vec<f64>,
    pos: usize,
}

impl FixedSequence {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, pos: 0 }
    }
}

impl RandomSource for FixedSequence {
    fn next_bipolar(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let v = self.values[self.pos % self.values.len()];
        self.pos += 1;
        v.clamp(-1.0, 1.0)
    }
}

/// Jitter each note independently. Results are not clamped here; the note
/// accessors clamp on the way out.
pub fn humanize(
    notes: &[Note],
    mode: HumanizeMode,
    params: HumanizeParams,
    rng: &mut dyn RandomSource,
) -> Vec<Note> {
    notes
        .iter()
        .map(|&note| {
            let mut out = note;
            if mode.affects_time() {
                let offset = params.max_time_delta * rng.next_bipolar();
                out = out.with_start(note.raw_start() + offset);
            }
            if mode.affects_velocity() {
                let offset = params.max_velocity_delta * rng.next_bipolar();
                let velocity = (note.raw_velocity() as f64 + offset).round() as i32;
                out = out.with_velocity(velocity);
            }
            out
        })
        .collect()
}
