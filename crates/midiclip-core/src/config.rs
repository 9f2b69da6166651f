//! Session configuration

use serde::{Deserialize, Serialize};

use crate::humanize::HumanizeParams;
use crate::protocol::NoteEncoding;

/// Length of clips created by a session, in beats
pub const DEFAULT_CLIP_LENGTH_BEATS: f64 = 16.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub clip_length_beats: f64,
    /// Command sequence used on finalize
    pub encoding: NoteEncoding,
    pub humanize: HumanizeParams,
    /// Fixed seed for humanize jitter; random when unset
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            clip_length_beats: DEFAULT_CLIP_LENGTH_BEATS,
            encoding: NoteEncoding::default(),
            humanize: HumanizeParams::default(),
            seed: None,
        }
    }
}

impl SessionConfig {
    pub fn rng(&self) -> fastrand::Rng {
        match self.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        }
    }
}
