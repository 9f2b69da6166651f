//! Event file parsing: `time pitch velocity muted` per line

use anyhow::{bail, Context, Result};
use midiclip_core::NoteEvent;

pub(crate) fn parse_events(text: &str) -> Result<Vec<NoteEvent>> {
    let mut events = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        events.push(parse_line(line).with_context(|| format!("line {}", lineno + 1))?);
    }
    Ok(events)
}

fn parse_line(line: &str) -> Result<NoteEvent> {
    let fields: Vec<&str> = line.split(|c: char| c.is_whitespace() || c == ',').filter(|f| !f.is_empty()).collect();
    if !(3..=4).contains(&fields.len()) {
        bail!("expected `time pitch velocity [muted]`, got {} fields", fields.len());
    }
    let time_ms: f64 = fields[0].parse().context("time")?;
    let pitch: i32 = fields[1].parse().context("pitch")?;
    let velocity: i32 = fields[2].parse().context("velocity")?;
    let muted = match fields.get(3) {
        None | Some(&"0") | Some(&"false") => false,
        Some(&"1") | Some(&"true") => true,
        Some(other) => bail!("muted must be 0/1, got {other}"),
    };
    Ok(NoteEvent::new(time_ms, pitch, velocity, muted))
}
