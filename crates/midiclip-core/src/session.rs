//! Clip lifecycle around one recording take

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::buffer::NoteBuffer;
use crate::config::SessionConfig;
use crate::error::{ClipError, Result};
use crate::humanize::{humanize, HumanizeMode, RandomSource};
use crate::live::{Atom, LiveHost, LiveObject, LivePath};
use crate::note::Note;
use crate::protocol::{
    decode_note_list, remove_notes_extended, ClipNoteProtocolEncoder, NoteEncoding, NoteRange,
};
use crate::reconstruct::{NoteEvent, NoteIntervalReconstructor};

/// Session lifecycle. Finalizing returns the session to `SlotBound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    SlotBound,
    ClipOpen,
}

/// Snapshot for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub track: Option<u32>,
    pub clip_slot: Option<u32>,
    pub state: SessionState,
    pub slot_path: Option<String>,
    pub clip_path: Option<String>,
    pub pending_notes: Vec<Note>,
    pub humanized: bool,
    pub open_pitches: Vec<i32>,
}

struct SlotTarget {
    track: u32,
    slot: u32,
    object: Box<dyn LiveObject>,
}

/// Single-mutex boundary for hosts that dispatch from several threads
pub type SharedClipSession<H> = Arc<Mutex<ClipSessionController<H>>>;

/// Owns one target clip slot and the notes of the take being recorded into it
pub struct ClipSessionController<H: LiveHost> {
    host: H,
    config: SessionConfig,
    target: Option<SlotTarget>,
    clip: Option<Box<dyn LiveObject>>,
    reconstructor: NoteIntervalReconstructor,
    buffer: NoteBuffer,
    /// Jittered view of `buffer`; the recorded take itself is never rewritten
    humanized: Option<Vec<Note>>,
    rng: Box<dyn RandomSource + Send>,
}

impl<H: LiveHost> ClipSessionController<H> {
    pub fn new(host: H, config: SessionConfig) -> Self {
        let rng = Box::new(config.rng());
        Self {
            host,
            config,
            target: None,
            clip: None,
            reconstructor: NoteIntervalReconstructor::new(),
            buffer: NoteBuffer::new(),
            humanized: None,
            rng,
        }
    }

    /// Replace the jitter source, e.g. with a scripted one
    pub fn with_random(mut self, rng: impl RandomSource + Send + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn into_shared(self) -> SharedClipSession<H> {
        Arc::new(Mutex::new(self))
    }

    pub fn state(&self) -> SessionState {
        match (&self.target, &self.clip) {
            (None, _) => SessionState::Uninitialized,
            (Some(_), None) => SessionState::SlotBound,
            (Some(_), Some(_)) => SessionState::ClipOpen,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn buffer(&self) -> &NoteBuffer {
        &self.buffer
    }

    pub fn reconstructor(&self) -> &NoteIntervalReconstructor {
        &self.reconstructor
    }

    /// Humanized copy of the take, if humanize ran since the last note completed
    pub fn humanized(&self) -> Option<&[Note]> {
        self.humanized.as_deref()
    }

    /// Notes finalize would write: the humanized copy when present, else the take
    pub fn pending_notes(&self) -> &[Note] {
        self.humanized.as_deref().unwrap_or(self.buffer.all())
    }

    fn target_mut(&mut self) -> Result<&mut SlotTarget> {
        match self.target.as_mut() {
            Some(target) => Ok(target),
            None => {
                warn!("No target slot bound");
                Err(ClipError::NoTarget)
            }
        }
    }

    fn clip_mut(&mut self) -> Result<&mut Box<dyn LiveObject>> {
        self.target_mut()?;
        match self.clip.as_mut() {
            Some(clip) => Ok(clip),
            None => {
                warn!("No clip open");
                Err(ClipError::NoClipOpen)
            }
        }
    }

    /// Bind a track/clip-slot pair. Rebinding drops any open clip handle and
    /// the pending take.
    pub fn init(&mut self, track: u32, slot: u32) -> Result<()> {
        let object = self.host.open(&LivePath::clip_slot(track, slot))?;
        if self.clip.take().is_some() {
            debug!("Dropping open clip on re-init");
        }
        self.clear();
        info!(track, slot, path = object.path(), "Clip slot bound");
        self.target = Some(SlotTarget { track, slot, object });
        Ok(())
    }

    /// Replace whatever is in the slot with a fresh clip. No-op when a clip is
    /// already open.
    pub fn open_clip(&mut self) -> Result<()> {
        let length = self.config.clip_length_beats;
        self.target_mut()?;
        if self.clip.is_some() {
            return Ok(());
        }
        let Some(target) = self.target.as_mut() else {
            return Err(ClipError::NoTarget);
        };

        target.object.call("delete_clip", &[])?;
        target.object.call("create_clip", &[Atom::Float(length)])?;
        let path = LivePath::clip(target.track, target.slot);
        let clip = self.host.open(&path)?;
        info!(path = clip.path(), length, "Clip initialized");
        self.clip = Some(clip);
        Ok(())
    }

    /// Feed one event. The first event of a take opens the clip.
    pub fn note_event(&mut self, event: NoteEvent) -> Result<Option<Note>> {
        self.open_clip()?;
        let note = self.reconstructor.on_event(event);
        if let Some(note) = note {
            debug!(%note, "Note completed");
            self.buffer.append(note);
            // a new note makes the jittered copy stale
            self.humanized = None;
        }
        Ok(note)
    }

    /// Write the take into the clip, fire it and get ready for the next take.
    /// Returns the number of notes written.
    pub fn finalize(&mut self) -> Result<usize> {
        let encoding = self.config.encoding;
        let length = self.config.clip_length_beats;
        let encoder = ClipNoteProtocolEncoder::new(encoding);

        // Borrow the fields separately: the clip is written while the buffer is read.
        self.clip_mut()?;
        let Some(clip) = self.clip.as_mut() else {
            return Err(ClipError::NoClipOpen);
        };
        if encoding == NoteEncoding::Bulk {
            remove_notes_extended(clip.as_mut(), NoteRange::whole_clip(length))?;
        }
        let notes = self.humanized.as_deref().unwrap_or(self.buffer.all());
        encoder.encode(notes, clip.as_mut())?;
        let count = notes.len();
        info!(count, "Clip notes set");
        clip.call("fire", &[])?;
        info!("Clip fired");

        self.clip = None;
        self.clear();
        Ok(count)
    }

    /// Drop the pending take and every held note. Sends nothing to the host.
    pub fn clear(&mut self) {
        if !self.buffer.is_empty() || self.reconstructor.open_count() > 0 {
            debug!(
                notes = self.buffer.len(),
                open = self.reconstructor.open_count(),
                "Clearing take"
            );
        }
        self.buffer.clear();
        self.humanized = None;
        self.reconstructor.reset();
    }

    /// Jitter a copy of the recorded take. Each call starts again from the
    /// recorded values, so jitter never accumulates. Returns the note count.
    pub fn humanize(
        &mut self,
        mode: HumanizeMode,
        max_time_delta: Option<f64>,
        max_velocity_delta: Option<f64>,
    ) -> Result<usize> {
        self.target_mut()?;
        let params = self.config.humanize.with_overrides(max_time_delta, max_velocity_delta);
        let jittered = humanize(self.buffer.all(), mode, params, self.rng.as_mut());
        let count = jittered.len();
        self.humanized = Some(jittered);
        debug!(?mode, count, "Humanized pending take");
        Ok(count)
    }

    /// Jitter the notes selected in the open clip and write them back.
    pub fn humanize_selection(
        &mut self,
        mode: HumanizeMode,
        max_time_delta: Option<f64>,
        max_velocity_delta: Option<f64>,
    ) -> Result<usize> {
        let params = self.config.humanize.with_overrides(max_time_delta, max_velocity_delta);
        self.clip_mut()?;
        let Some(clip) = self.clip.as_mut() else {
            return Err(ClipError::NoClipOpen);
        };

        let reply = clip.call("get_selected_notes", &[])?;
        let selected = decode_note_list(&reply)?;
        let jittered = humanize(&selected, mode, params, self.rng.as_mut());
        ClipNoteProtocolEncoder::new(NoteEncoding::Replace).encode(&jittered, clip.as_mut())?;
        debug!(?mode, count = jittered.len(), "Humanized selection");
        Ok(jittered.len())
    }

    /// Create a clip in the bound slot without opening it
    pub fn create_new_clip(&mut self) -> Result<()> {
        let length = self.config.clip_length_beats;
        self.target_mut()?.object.call("create_clip", &[Atom::Float(length)])?;
        Ok(())
    }

    /// Delete the clip in the bound slot, dropping any open handle to it
    pub fn delete_current_clip(&mut self) -> Result<()> {
        self.target_mut()?.object.call("delete_clip", &[])?;
        self.clip = None;
        Ok(())
    }

    /// Length of the open clip in beats, as reported by the host
    pub fn clip_length(&mut self) -> Result<f64> {
        let clip = self.clip_mut()?;
        let value = clip.get("length")?;
        value
            .first()
            .and_then(Atom::as_f64)
            .ok_or_else(|| ClipError::Host("clip reported no length".to_string()))
    }

    /// Read notes from the open clip. Unset bounds default to the whole clip:
    /// start 0, the clip's reported length, pitch 0 and a 128-pitch span.
    pub fn get_notes(
        &mut self,
        start: Option<f64>,
        time_range: Option<f64>,
        pitch_low: Option<i32>,
        pitch_range: Option<i32>,
    ) -> Result<Vec<Note>> {
        self.clip_mut()?;
        let time_range = match time_range {
            Some(range) => range,
            None => self.clip_length()?,
        };
        let clip = self.clip_mut()?;
        let reply = clip.call(
            "get_notes",
            &[
                Atom::Float(start.unwrap_or(0.0)),
                Atom::from(pitch_low.unwrap_or(0)),
                Atom::Float(time_range),
                Atom::from(pitch_range.unwrap_or(128)),
            ],
        )?;
        decode_note_list(&reply)
    }

    /// Move the open clip's loop end, in beats
    pub fn set_loop_end(&mut self, beats: f64) -> Result<()> {
        let clip = self.clip_mut()?;
        clip.set("loop_end", &[Atom::Float(beats)])?;
        debug!(beats, path = clip.path(), "Loop end set");
        Ok(())
    }

    pub fn info(&self) -> SessionInfo {
        let info = SessionInfo {
            track: self.target.as_ref().map(|t| t.track),
            clip_slot: self.target.as_ref().map(|t| t.slot),
            state: self.state(),
            slot_path: self.target.as_ref().map(|t| t.object.path().to_string()),
            clip_path: self.clip.as_ref().map(|c| c.path().to_string()),
            pending_notes: self.buffer.all().to_vec(),
            humanized: self.humanized.is_some(),
            open_pitches: self.reconstructor.open_pitches(),
        };
        info!(
            track = ?info.track,
            clip_slot = ?info.clip_slot,
            state = ?info.state,
            notes = info.pending_notes.len(),
            "Session info"
        );
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::FixedSequence;
    use crate::live::{RecordingHost, Transcript};

    fn session(config: SessionConfig) -> (ClipSessionController<RecordingHost>, Transcript) {
        let host = RecordingHost::new();
        let transcript = host.transcript();
        (ClipSessionController::new(host, config), transcript)
    }

    #[test]
    fn test_operations_need_target() {
        let (mut s, transcript) = session(SessionConfig::default());
        assert!(matches!(s.open_clip(), Err(ClipError::NoTarget)));
        assert!(matches!(s.note_event(NoteEvent::new(0.0, 60, 100, false)), Err(ClipError::NoTarget)));
        assert!(matches!(s.finalize(), Err(ClipError::NoTarget)));
        assert!(matches!(s.create_new_clip(), Err(ClipError::NoTarget)));
        assert!(matches!(s.delete_current_clip(), Err(ClipError::NoTarget)));
        assert!(matches!(s.humanize(HumanizeMode::Both, None, None), Err(ClipError::NoTarget)));
        assert_eq!(s.state(), SessionState::Uninitialized);
        assert!(transcript.commands().is_empty());
    }

    #[test]
    fn test_finalize_without_clip() {
        let (mut s, transcript) = session(SessionConfig::default());
        s.init(0, 0).unwrap();
        let err = s.finalize().unwrap_err();
        assert!(matches!(err, ClipError::NoClipOpen));
        assert!(err.is_precondition());
        assert_eq!(s.state(), SessionState::SlotBound);
        assert!(transcript.commands().is_empty());
    }

    #[test]
    fn test_open_clip_is_idempotent() {
        let (mut s, transcript) = session(SessionConfig::default());
        s.init(2, 3).unwrap();
        s.open_clip().unwrap();
        s.open_clip().unwrap();
        assert_eq!(transcript.lines(), vec!["delete_clip", "create_clip 16"]);
        let commands = transcript.commands();
        assert_eq!(commands[0].path, "live_set tracks 2 clip_slots 3");
        assert_eq!(s.state(), SessionState::ClipOpen);
        assert_eq!(s.info().clip_path.as_deref(), Some("live_set tracks 2 clip_slots 3 clip"));
    }

    #[test]
    fn test_first_event_opens_clip() {
        let (mut s, transcript) = session(SessionConfig::default());
        s.init(0, 0).unwrap();
        assert!(s.note_event(NoteEvent::new(0.0, 60, 100, false)).unwrap().is_none());
        assert_eq!(s.state(), SessionState::ClipOpen);
        assert_eq!(transcript.lines().len(), 2);
    }

    #[test]
    fn test_finalize_resets_take() {
        let (mut s, transcript) = session(SessionConfig::default());
        s.init(0, 0).unwrap();
        s.note_event(NoteEvent::new(0.0, 60, 100, false)).unwrap();
        s.note_event(NoteEvent::new(500.0, 60, 100, false)).unwrap();
        // left hanging, dropped by finalize
        s.note_event(NoteEvent::new(600.0, 62, 100, false)).unwrap();

        assert_eq!(s.finalize().unwrap(), 1);
        assert_eq!(s.state(), SessionState::SlotBound);
        assert!(s.buffer().is_empty());
        assert_eq!(s.reconstructor().open_count(), 0);
        assert_eq!(transcript.lines().last().map(String::as_str), Some("fire"));
    }

    #[test]
    fn test_clear_sends_nothing() {
        let (mut s, transcript) = session(SessionConfig::default());
        s.clear();
        s.init(0, 0).unwrap();
        s.note_event(NoteEvent::new(0.0, 60, 100, false)).unwrap();
        s.note_event(NoteEvent::new(10.0, 60, 100, false)).unwrap();
        s.note_event(NoteEvent::new(20.0, 61, 100, false)).unwrap();
        transcript.clear();

        s.clear();
        assert!(transcript.commands().is_empty());
        assert!(s.buffer().is_empty());
        assert_eq!(s.reconstructor().open_count(), 0);
        assert_eq!(s.state(), SessionState::ClipOpen);
    }

    #[test]
    fn test_reinit_drops_clip_and_take() {
        let (mut s, _) = session(SessionConfig::default());
        s.init(0, 0).unwrap();
        s.note_event(NoteEvent::new(0.0, 60, 100, false)).unwrap();
        s.note_event(NoteEvent::new(10.0, 60, 100, false)).unwrap();
        s.init(1, 1).unwrap();
        assert_eq!(s.state(), SessionState::SlotBound);
        assert!(s.buffer().is_empty());
        assert_eq!(s.info().track, Some(1));
    }

    #[test]
    fn test_humanize_live_buffer() {
        let (s, _) = session(SessionConfig::default());
        let mut s = s.with_random(FixedSequence::new(vec![1.0, -1.0]));
        s.init(0, 0).unwrap();
        s.note_event(NoteEvent::new(1000.0, 60, 100, false)).unwrap();
        s.note_event(NoteEvent::new(1500.0, 60, 100, false)).unwrap();

        assert_eq!(s.humanize(HumanizeMode::Both, Some(0.1), Some(10.0)).unwrap(), 1);
        let note = s.humanized().unwrap()[0];
        assert_eq!(note.raw_start(), 1.0 + 0.1);
        assert_eq!(note.raw_velocity(), 90);
        assert_eq!(s.pending_notes()[0], note);
    }

    #[test]
    fn test_humanize_keeps_recorded_take() {
        let (s, transcript) = session(SessionConfig::default());
        let mut s = s.with_random(FixedSequence::new(vec![1.0]));
        s.init(0, 0).unwrap();
        s.note_event(NoteEvent::new(1000.0, 60, 100, false)).unwrap();
        s.note_event(NoteEvent::new(1500.0, 60, 100, false)).unwrap();
        let recorded = s.buffer().all().to_vec();

        s.humanize(HumanizeMode::Time, None, None).unwrap();
        s.humanize(HumanizeMode::Time, None, None).unwrap();
        assert_eq!(s.buffer().all(), recorded.as_slice());
        let jittered = s.humanized().unwrap()[0];
        assert!((jittered.raw_start() - 1.0).abs() <= 0.05 + 1e-12);
        assert!(s.info().humanized);

        transcript.clear();
        s.finalize().unwrap();
        assert_eq!(transcript.lines()[2], "note 60 1.0500 0.5000 100 0");
        assert!(s.humanized().is_none());
    }

    #[test]
    fn test_new_note_drops_stale_humanized_copy() {
        let (mut s, _) = session(SessionConfig::default());
        s.init(0, 0).unwrap();
        s.note_event(NoteEvent::new(0.0, 60, 100, false)).unwrap();
        s.note_event(NoteEvent::new(100.0, 60, 100, false)).unwrap();
        s.humanize(HumanizeMode::Both, None, None).unwrap();
        s.note_event(NoteEvent::new(200.0, 62, 100, false)).unwrap();
        assert!(s.humanized().is_some());
        s.note_event(NoteEvent::new(300.0, 62, 100, false)).unwrap();
        assert!(s.humanized().is_none());
        assert_eq!(s.pending_notes().len(), 2);

        s.humanize(HumanizeMode::Both, None, None).unwrap();
        s.clear();
        assert!(s.humanized().is_none());
    }

    #[test]
    fn test_get_notes_defaults_to_whole_clip() {
        let (mut s, transcript) = session(SessionConfig::default());
        s.init(0, 0).unwrap();
        assert!(matches!(s.get_notes(None, None, None, None), Err(ClipError::NoClipOpen)));
        s.open_clip().unwrap();
        transcript.clear();
        transcript.set_property(&LivePath::clip(0, 0), "length", vec![Atom::Float(8.0)]);
        transcript.push_reply(
            "get_notes",
            vec![
                Atom::symbol("notes"),
                Atom::Int(1),
                Atom::symbol("note"),
                Atom::Int(60),
                Atom::Float(0.5),
                Atom::Float(1.0),
                Atom::Int(100),
                Atom::Int(0),
                Atom::symbol("done"),
            ],
        );

        let notes = s.get_notes(None, None, None, None).unwrap();
        assert_eq!(notes, vec![Note::new(60, 0.5, 1.0, 100, false)]);
        assert_eq!(transcript.lines(), vec!["get_notes 0 0 8 128"]);

        s.get_notes(Some(2.0), Some(4.0), Some(36), Some(12)).unwrap_err();
        assert_eq!(transcript.lines()[1], "get_notes 2 36 4 12");
    }

    #[test]
    fn test_set_loop_end() {
        let (mut s, transcript) = session(SessionConfig::default());
        s.init(1, 1).unwrap();
        assert!(matches!(s.set_loop_end(32.0), Err(ClipError::NoClipOpen)));
        s.open_clip().unwrap();
        s.set_loop_end(32.0).unwrap();
        assert_eq!(
            transcript.property(&LivePath::clip(1, 1), "loop_end"),
            Some(vec![Atom::Float(32.0)])
        );
    }

    #[test]
    fn test_humanize_selection_round_trip() {
        let (s, transcript) = session(SessionConfig::default());
        let mut s = s.with_random(FixedSequence::new(vec![0.0]));
        s.init(0, 0).unwrap();
        assert!(matches!(
            s.humanize_selection(HumanizeMode::Time, None, None),
            Err(ClipError::NoClipOpen)
        ));
        s.open_clip().unwrap();
        transcript.clear();
        transcript.push_reply(
            "get_selected_notes",
            vec![
                Atom::symbol("notes"),
                Atom::Int(1),
                Atom::symbol("note"),
                Atom::Int(64),
                Atom::Float(2.0),
                Atom::Float(0.5),
                Atom::Int(80),
                Atom::Int(0),
                Atom::symbol("done"),
            ],
        );

        assert_eq!(s.humanize_selection(HumanizeMode::Time, None, None).unwrap(), 1);
        assert_eq!(
            transcript.lines(),
            vec![
                "get_selected_notes",
                "select_all_notes",
                "replace_selected_notes",
                "notes 1",
                "note 64 2.0000 0.5000 80 0",
                "done",
            ]
        );
    }

    #[test]
    fn test_bulk_finalize_clears_range_first() {
        let config = SessionConfig { encoding: NoteEncoding::Bulk, clip_length_beats: 8.0, ..Default::default() };
        let (mut s, transcript) = session(config);
        s.init(0, 0).unwrap();
        s.note_event(NoteEvent::new(0.0, 60, 100, false)).unwrap();
        s.note_event(NoteEvent::new(250.0, 60, 100, false)).unwrap();
        s.finalize().unwrap();

        assert_eq!(
            transcript.lines(),
            vec![
                "delete_clip",
                "create_clip 8",
                "remove_notes_extended 0 127 0 8",
                r#"add_new_notes {"notes":[{"pitch":60,"start_time":0.0,"duration":0.25,"velocity":100}]}"#,
                "fire",
            ]
        );
    }

    #[test]
    fn test_delete_current_clip_drops_handle() {
        let (mut s, transcript) = session(SessionConfig::default());
        s.init(0, 0).unwrap();
        s.open_clip().unwrap();
        s.delete_current_clip().unwrap();
        assert_eq!(s.state(), SessionState::SlotBound);
        s.create_new_clip().unwrap();
        assert_eq!(
            transcript.lines(),
            vec!["delete_clip", "create_clip 16", "delete_clip", "create_clip 16"]
        );
    }

    #[test]
    fn test_clip_length_from_host() {
        let (mut s, transcript) = session(SessionConfig::default());
        s.init(0, 0).unwrap();
        s.open_clip().unwrap();
        transcript.set_property(&LivePath::clip(0, 0), "length", vec![Atom::Float(16.0)]);
        assert_eq!(s.clip_length().unwrap(), 16.0);
    }

    #[test]
    fn test_shared_session_across_threads() {
        let (mut s, transcript) = session(SessionConfig::default());
        s.init(0, 0).unwrap();
        let shared = s.into_shared();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || {
                    let mut s = shared.lock().unwrap();
                    s.note_event(NoteEvent::new(0.0, 60 + i, 100, false)).unwrap();
                    s.note_event(NoteEvent::new(100.0, 60 + i, 100, false)).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let mut s = shared.lock().unwrap();
        assert_eq!(s.buffer().len(), 4);
        assert_eq!(s.finalize().unwrap(), 4);
        assert_eq!(transcript.lines().iter().filter(|l| l.starts_with("note ")).count(), 4);
    }
}
