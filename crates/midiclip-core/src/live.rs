//! Narrow interface to the host's clip-editing objects

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One argument or reply value in the host's message protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Atom {
    Int(i64),
    Float(f64),
    Symbol(String),
}

impl Atom {
    pub fn symbol(s: impl Into<String>) -> Self {
        Self::Symbol(s.into())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Symbol(s) => s.parse().ok(),
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Self::Symbol(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i32> for Atom {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for Atom {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Atom {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Atom {
    fn from(v: &str) -> Self {
        Self::Symbol(v.to_string())
    }
}

impl std::fmt::Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Symbol(s) => f.write_str(s),
        }
    }
}

/// Object path in the host's object model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LivePath(String);

impl LivePath {
    pub fn clip_slot(track: u32, slot: u32) -> Self {
        Self(format!("live_set tracks {track} clip_slots {slot}"))
    }

    pub fn clip(track: u32, slot: u32) -> Self {
        Self(format!("live_set tracks {track} clip_slots {slot} clip"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LivePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A host object the core can send commands to
pub trait LiveObject: Send {
    fn path(&self) -> &str;
    fn call(&mut self, command: &str, args: &[Atom]) -> Result<Vec<Atom>>;
    fn get(&self, property: &str) -> Result<Vec<Atom>>;
    fn set(&mut self, property: &str, value: &[Atom]) -> Result<()>;
}

/// Resolves object paths to handles
pub trait LiveHost: Send {
    fn open(&mut self, path: &LivePath) -> Result<Box<dyn LiveObject>>;
}

// ============================================================================
// Recording host
// ============================================================================

/// A command as received by a [`RecordingHost`] object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub path: String,
    pub name: String,
    pub args: Vec<Atom>,
}

impl Command {
    /// `name arg arg ...` without the path
    pub fn line(&self) -> String {
        let mut line = self.name.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string());
        }
        line
    }
}

#[derive(Debug, Default)]
struct HostState {
    commands: Vec<Command>,
    replies: HashMap<String, VecDeque<Vec<Atom>>>,
    properties: HashMap<(String, String), Vec<Atom>>,
}

/// Shared view of everything a [`RecordingHost`] has received
#[derive(Debug, Clone, Default)]
pub struct Transcript(Arc<Mutex<HostState>>);

impl Transcript {
    fn state(&self) -> MutexGuard<'_, HostState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state().commands.clone()
    }

    /// Command lines without paths, in order
    pub fn lines(&self) -> Vec<String> {
        self.state().commands.iter().map(Command::line).collect()
    }

    pub fn clear(&self) {
        self.state().commands.clear();
    }

    /// Queue a reply for the next `command` call on any object
    pub fn push_reply(&self, command: &str, reply: Vec<Atom>) {
        self.state()
            .replies
            .entry(command.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Seed a property value returned by `get`
    pub fn set_property(&self, path: &LivePath, property: &str, value: Vec<Atom>) {
        self.state()
            .properties
            .insert((path.as_str().to_string(), property.to_string()), value);
    }

    pub fn property(&self, path: &LivePath, property: &str) -> Option<Vec<Atom>> {
        self.state()
            .properties
            .get(&(path.as_str().to_string(), property.to_string()))
            .cloned()
    }
}

/// In-memory host that records every command it receives
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    transcript: Transcript,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }
}

impl LiveHost for RecordingHost {
    fn open(&mut self, path: &LivePath) -> Result<Box<dyn LiveObject>> {
        Ok(Box::new(RecordingObject {
            path: path.as_str().to_string(),
            transcript: self.transcript.clone(),
        }))
    }
}

struct RecordingObject {
    path: String,
    transcript: Transcript,
}

impl LiveObject for RecordingObject {
    fn path(&self) -> &str {
        &self.path
    }

    fn call(&mut self, command: &str, args: &[Atom]) -> Result<Vec<Atom>> {
        let mut state = self.transcript.state();
        state.commands.push(Command {
            path: self.path.clone(),
            name: command.to_string(),
            args: args.to_vec(),
        });
        let reply = state
            .replies
            .get_mut(command)
            .and_then(VecDeque::pop_front)
            .unwrap_or_default();
        Ok(reply)
    }

    fn get(&self, property: &str) -> Result<Vec<Atom>> {
        let state = self.transcript.state();
        Ok(state
            .properties
            .get(&(self.path.clone(), property.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn set(&mut self, property: &str, value: &[Atom]) -> Result<()> {
        self.transcript
            .state()
            .properties
            .insert((self.path.clone(), property.to_string()), value.to_vec());
        Ok(())
    }
}
