//! Bulk JSON variant of the clip API

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::live::{Atom, LiveObject};
use crate::note::Note;

/// One entry of the `add_new_notes` payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BulkNote {
    pub pitch: i32,
    pub start_time: f64,
    pub duration: f64,
    pub velocity: i32,
}

impl From<&Note> for BulkNote {
    fn from(note: &Note) -> Self {
        Self {
            pitch: note.pitch(),
            start_time: note.start(),
            duration: note.duration(),
            velocity: note.velocity(),
        }
    }
}

/// `{"notes": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkNotes {
    pub notes: Vec<BulkNote>,
}

impl BulkNotes {
    pub fn from_notes(notes: &[Note]) -> Self {
        Self {
            notes: notes.iter().map(BulkNote::from).collect(),
        }
    }
}

/// Pitch/time window for `remove_notes_extended`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteRange {
    pub pitch_low: i32,
    pub pitch_high: i32,
    pub time_low: f64,
    pub time_high: f64,
}

impl NoteRange {
    /// Every pitch over the first `length` beats
    pub fn whole_clip(length: f64) -> Self {
        Self {
            pitch_low: 0,
            pitch_high: 127,
            time_low: 0.0,
            time_high: length,
        }
    }
}

/// Send every note in one `add_new_notes` call
pub fn encode_bulk(notes: &[Note], sink: &mut dyn LiveObject) -> Result<()> {
    let payload = serde_json::to_string(&BulkNotes::from_notes(notes))?;
    sink.call("add_new_notes", &[Atom::Symbol(payload)])?;
    Ok(())
}

pub fn remove_notes_extended(sink: &mut dyn LiveObject, range: NoteRange) -> Result<()> {
    sink.call(
        "remove_notes_extended",
        &[
            Atom::from(range.pitch_low),
            Atom::from(range.pitch_high),
            Atom::from(range.time_low),
            Atom::from(range.time_high),
        ],
    )?;
    Ok(())
}
