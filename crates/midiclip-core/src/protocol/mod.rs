//! Clip note-list protocol: note-by-note encoding, bulk JSON encoding and
//! decoding of host replies

mod bulk;
mod decode;

pub use bulk::{encode_bulk, remove_notes_extended, BulkNote, BulkNotes, NoteRange};
pub use decode::decode_note_list;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::live::{Atom, LiveObject};
use crate::note::Note;

/// Which command sequence a note list is written with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteEncoding {
    /// `select_all_notes`, `replace_selected_notes`, then the note list
    Replace,
    /// `set_notes`, then the note list
    #[default]
    Set,
    /// One `add_new_notes <json>` call
    Bulk,
}

impl std::str::FromStr for NoteEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "set" => Ok(Self::Set),
            "bulk" => Ok(Self::Bulk),
            other => Err(format!("unknown note encoding: {other}")),
        }
    }
}

/// How start/duration are rendered on the note-by-note protocol.
///
/// The receiving parser rejects bare integers and exponent notation, so both
/// fields go out as fixed-point decimal strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecimalPolicy {
    pub fractional_digits: usize,
}

impl Default for DecimalPolicy {
    fn default() -> Self {
        Self { fractional_digits: 4 }
    }
}

impl DecimalPolicy {
    pub fn render(&self, value: f64) -> Atom {
        Atom::Symbol(format!("{:.*}", self.fractional_digits, value))
    }
}

/// Serializes note lists into the clip object's command sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipNoteProtocolEncoder {
    pub encoding: NoteEncoding,
    pub decimals: DecimalPolicy,
}

impl ClipNoteProtocolEncoder {
    pub fn new(encoding: NoteEncoding) -> Self {
        Self {
            encoding,
            decimals: DecimalPolicy::default(),
        }
    }

    /// Arguments of one `note` command, all protocol-safe
    pub fn note_args(&self, note: &Note) -> Vec<Atom> {
        vec![
            Atom::from(note.pitch()),
            self.decimals.render(note.start()),
            self.decimals.render(note.duration()),
            Atom::from(note.velocity()),
            Atom::from(note.muted_flag()),
        ]
    }

    /// Write `notes` to `sink` in buffer order
    pub fn encode(&self, notes: &[Note], sink: &mut dyn LiveObject) -> Result<()> {
        debug!(encoding = ?self.encoding, count = notes.len(), path = sink.path(), "Encoding notes");

        match self.encoding {
            NoteEncoding::Replace => {
                sink.call("select_all_notes", &[])?;
                sink.call("replace_selected_notes", &[])?;
                self.send_note_list(notes, sink)
            }
            NoteEncoding::Set => {
                sink.call("set_notes", &[])?;
                self.send_note_list(notes, sink)
            }
            NoteEncoding::Bulk => encode_bulk(notes, sink),
        }
    }

    fn send_note_list(&self, notes: &[Note], sink: &mut dyn LiveObject) -> Result<()> {
        sink.call("notes", &[Atom::Int(notes.len() as i64)])?;
        for note in notes {
            sink.call("note", &self.note_args(note))?;
        }
        sink.call("done", &[])?;
        Ok(())
    }
}
