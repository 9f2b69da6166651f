//! Ordered take buffer

use crate::note::Note;

/// Notes of the current take, in completion order (not start order).
#[derive(Debug, Clone, Default)]
pub struct NoteBuffer {
    notes: Vec<Note>,
}

impl NoteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, note: Note) {
        self.notes.push(note);
    }

    pub fn all(&self) -> &[Note] {
        &self.notes
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
