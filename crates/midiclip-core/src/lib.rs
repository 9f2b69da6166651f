//! midiclip-core: note-event reconstruction and clip note-list synthesis

pub mod buffer;
pub mod config;
mod error;
pub mod humanize;
pub mod live;
pub mod note;
pub mod protocol;
pub mod reconstruct;
pub mod session;

pub use buffer::NoteBuffer;
pub use config::{SessionConfig, DEFAULT_CLIP_LENGTH_BEATS};
pub use error::{ClipError, Result};
pub use humanize::{humanize, FixedSequence, HumanizeMode, HumanizeParams, RandomSource};
pub use live::{Atom, Command, LiveHost, LiveObject, LivePath, RecordingHost, Transcript};
pub use note::{Note, MIN_DURATION};
pub use protocol::{ClipNoteProtocolEncoder, DecimalPolicy, NoteEncoding, NoteRange};
pub use reconstruct::{NoteEvent, NoteIntervalReconstructor};
pub use session::{ClipSessionController, SessionInfo, SessionState, SharedClipSession};
