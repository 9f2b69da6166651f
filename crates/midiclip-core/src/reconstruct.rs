//! Note-on/note-off pairing into note intervals

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::note::Note;

/// Number of pitches tracked by the open-note table
pub const PITCH_COUNT: usize = 128;

/// One already-decoded event from the host dispatch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Host time in milliseconds
    pub time_ms: f64,
    pub pitch: i32,
    pub velocity: i32,
    #[serde(default)]
    pub muted: bool,
}

impl NoteEvent {
    pub fn new(time_ms: f64, pitch: i32, velocity: i32, muted: bool) -> Self {
        Self {
            time_ms,
            pitch,
            velocity,
            muted,
        }
    }
}

/// A note-on still waiting for its note-off
#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenNote {
    start_ms: f64,
    velocity: i32,
}

/// Pitch-indexed tracker turning on/off events into completed notes.
///
/// Each pitch is a two-state machine: closed → open on the first event,
/// open → closed (emitting a [`Note`]) on the next one.
///
/// Host dispatch that cannot tell note-on from note-off uses the toggle form,
/// [`on_event`](Self::on_event). Hosts that do decode the direction call
/// [`note_on`](Self::note_on) / [`note_off`](Self::note_off) instead, which
/// keep the overwrite and stray-release policies explicit.
#[derive(Debug, Clone)]
pub struct NoteIntervalReconstructor {
    open: [Option<OpenNote>; PITCH_COUNT],
}

impl Default for NoteIntervalReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteIntervalReconstructor {
    pub fn new() -> Self {
        Self {
            open: [None; PITCH_COUNT],
        }
    }

    fn slot(pitch: i32) -> Option<usize> {
        usize::try_from(pitch).ok().filter(|&p| p < PITCH_COUNT)
    }

    /// Toggle form used by host dispatch: opens a closed pitch, closes an open one.
    pub fn on_event(&mut self, event: NoteEvent) -> Option<Note> {
        let Some(idx) = Self::slot(event.pitch) else {
            debug!(pitch = event.pitch, "Ignoring event outside pitch range");
            return None;
        };

        match self.open[idx] {
            None => {
                self.open[idx] = Some(OpenNote {
                    start_ms: event.time_ms,
                    velocity: event.velocity,
                });
                None
            }
            Some(_) => self.note_off(event.time_ms, event.pitch, event.muted),
        }
    }

    /// Explicit note-on. An already-open pitch is overwritten and its earlier
    /// note is dropped.
    pub fn note_on(&mut self, time_ms: f64, pitch: i32, velocity: i32) {
        let Some(idx) = Self::slot(pitch) else {
            debug!(pitch, "Ignoring note-on outside pitch range");
            return;
        };
        if let Some(prev) = self.open[idx] {
            debug!(pitch, dropped_start_ms = prev.start_ms, "Overwriting unterminated note");
        }
        self.open[idx] = Some(OpenNote {
            start_ms: time_ms,
            velocity,
        });
    }

    /// Explicit note-off. A closed pitch is a stray release and yields nothing.
    pub fn note_off(&mut self, time_ms: f64, pitch: i32, muted: bool) -> Option<Note> {
        let idx = Self::slot(pitch)?;
        let Some(open) = self.open[idx].take() else {
            debug!(pitch, "Stray note-off");
            return None;
        };

        let start = open.start_ms / 1000.0;
        let duration = (time_ms - open.start_ms) / 1000.0;
        Some(Note::new(pitch, start, duration, open.velocity, muted))
    }

    pub fn is_open(&self, pitch: i32) -> bool {
        Self::slot(pitch).is_some_and(|idx| self.open[idx].is_some())
    }

    /// Number of pitches currently held down
    pub fn open_count(&self) -> usize {
        self.open.iter().filter(|n| n.is_some()).count()
    }

    /// Pitches currently held down, ascending
    pub fn open_pitches(&self) -> Vec<i32> {
        self.open
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_some())
            .map(|(p, _)| p as i32)
            .collect()
    }

    /// Drop every pending note-on
    pub fn reset(&mut self) {
        self.open = [None; PITCH_COUNT];
    }
}
