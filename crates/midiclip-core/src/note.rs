//! Reconstructed note intervals

use serde::{Deserialize, Serialize};

/// Highest MIDI pitch / velocity value the clip protocol accepts
pub const MAX_MIDI_VALUE: i32 = 127;

/// Shortest duration (in beats) the clip protocol will accept
pub const MIN_DURATION: f64 = 1.0 / 128.0;

/// A single reconstructed note.
///
/// Fields are stored exactly as captured (or as perturbed by humanize). The
/// accessors clamp at read time so the clip protocol only ever sees in-range,
/// finite values while the raw values stay available for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pitch: i32,
    /// Start offset in beats
    start: f64,
    /// Length in beats
    duration: f64,
    velocity: i32,
    muted: bool,
}

impl Note {
    pub fn new(pitch: i32, start: f64, duration: f64, velocity: i32, muted: bool) -> Self {
        Self {
            pitch,
            start,
            duration,
            velocity,
            muted,
        }
    }

    /// Pitch clamped to 0..=127
    pub fn pitch(&self) -> i32 {
        self.pitch.clamp(0, MAX_MIDI_VALUE)
    }

    /// Velocity clamped to 0..=127
    pub fn velocity(&self) -> i32 {
        self.velocity.clamp(0, MAX_MIDI_VALUE)
    }

    /// Start floored to 0.0 (NaN counts as non-positive)
    pub fn start(&self) -> f64 {
        if self.start > 0.0 && self.start.is_finite() {
            self.start
        } else {
            0.0
        }
    }

    /// Duration floored to [`MIN_DURATION`]
    pub fn duration(&self) -> f64 {
        if self.duration > MIN_DURATION && self.duration.is_finite() {
            self.duration
        } else {
            MIN_DURATION
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Muted flag as the protocol's 0/1 integer
    pub fn muted_flag(&self) -> i32 {
        i32::from(self.muted)
    }

    /// End position in beats, using the clamped values
    pub fn end(&self) -> f64 {
        self.start() + self.duration()
    }

    pub fn raw_pitch(&self) -> i32 {
        self.pitch
    }

    pub fn raw_start(&self) -> f64 {
        self.start
    }

    pub fn raw_duration(&self) -> f64 {
        self.duration
    }

    pub fn raw_velocity(&self) -> i32 {
        self.velocity
    }

    /// Copy with a different start; used by humanize
    pub fn with_start(self, start: f64) -> Self {
        Self { start, ..self }
    }

    /// Copy with a different velocity; used by humanize
    pub fn with_velocity(self, velocity: i32) -> Self {
        Self { velocity, ..self }
    }
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{pitch:{}, start:{}, duration:{}, velocity:{}, muted:{}}}",
            self.pitch, self.start, self.duration, self.velocity, self.muted
        )
    }
}
