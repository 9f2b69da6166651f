//! Parsing of `get_notes` / `get_selected_notes` replies

use crate::error::{ClipError, Result};
use crate::live::Atom;
use crate::note::Note;

const FIELDS_PER_NOTE: usize = 6;

/// Parse `notes <n> note <pitch> <start> <duration> <velocity> <muted> ... done`
pub fn decode_note_list(reply: &[Atom]) -> Result<Vec<Note>> {
    let malformed = |msg: &str| ClipError::MalformedNoteData(msg.to_string());

    if reply.first().and_then(Atom::as_symbol) != Some("notes") {
        return Err(malformed("reply does not start with 'notes'"));
    }
    let count = reply
        .get(1)
        .and_then(Atom::as_f64)
        .filter(|c| *c >= 0.0 && c.fract() == 0.0)
        .ok_or_else(|| malformed("missing note count"))? as usize;

    let body = &reply[2..];
    let body = match body.last().and_then(Atom::as_symbol) {
        Some("done") => &body[..body.len() - 1],
        _ => body,
    };
    if count.checked_mul(FIELDS_PER_NOTE) != Some(body.len()) {
        return Err(ClipError::MalformedNoteData(format!(
            "expected {count} notes, got {} values",
            body.len()
        )));
    }

    body.chunks_exact(FIELDS_PER_NOTE)
        .map(|chunk| {
            if chunk[0].as_symbol() != Some("note") {
                return Err(malformed("note entry does not start with 'note'"));
            }
            let num = |i: usize| chunk[i].as_f64().ok_or_else(|| malformed("non-numeric note field"));
            Ok(Note::new(
                num(1)? as i32,
                num(2)?,
                num(3)?,
                num(4)?.round() as i32,
                num(5)? != 0.0,
            ))
        })
        .collect()
}
