//! midiclip: replay a captured note-event stream into a clip and print the
//! resulting host command transcript

mod config;
mod events;

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use midiclip_core::{ClipSessionController, HumanizeMode, NoteEncoding, RecordingHost};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "midiclip", version, about = "Rebuild a clip from note-on/note-off events")]
struct Args {
    /// Event file (`time_ms pitch velocity [muted]` per line), `-` for stdin
    events: String,
    /// TOML config, defaults to <config dir>/midiclip/config.toml
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    track: Option<u32>,
    #[arg(long)]
    slot: Option<u32>,
    /// replace | set | bulk
    #[arg(long)]
    encoding: Option<NoteEncoding>,
    /// Clip length in beats
    #[arg(long)]
    length: Option<f64>,
    /// Humanize the take before writing it: velocity | time | both
    #[arg(long)]
    humanize: Option<String>,
    #[arg(long)]
    max_time_delta: Option<f64>,
    #[arg(long)]
    max_velocity_delta: Option<f64>,
    /// Seed for humanize jitter
    #[arg(long)]
    seed: Option<u64>,
    /// Print the transcript as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("midiclip=debug".parse()?)
            .add_directive("midiclip_core=debug".parse()?))
        .init();

    print!("{}", run(Args::parse())?);
    Ok(())
}

/// Replay one take and render the host transcript
fn run(args: Args) -> Result<String> {
    let cli_config = config::load_config(args.config.as_deref());
    let mut session_config = cli_config.session;
    if let Some(encoding) = args.encoding {
        session_config.encoding = encoding;
    }
    if let Some(length) = args.length {
        session_config.clip_length_beats = length;
    }
    if args.seed.is_some() {
        session_config.seed = args.seed;
    }
    let track = args.track.unwrap_or(cli_config.target.track);
    let slot = args.slot.unwrap_or(cli_config.target.clip_slot);

    let text = read_events(&args.events)?;
    let events = events::parse_events(&text)?;
    info!(count = events.len(), "Loaded events");

    let host = RecordingHost::new();
    let transcript = host.transcript();
    let mut session = ClipSessionController::new(host, session_config);
    session.init(track, slot)?;
    session.open_clip()?;

    for event in events {
        session.note_event(event)?;
    }
    if let Some(mode) = args.humanize.as_deref() {
        session.humanize(HumanizeMode::from_name(mode), args.max_time_delta, args.max_velocity_delta)?;
    }
    session.info();
    let written = session.finalize()?;
    info!(written, "Take written");

    let commands = transcript.commands();
    if args.json {
        return Ok(serde_json::to_string_pretty(&commands)? + "\n");
    }
    let mut out = String::new();
    for command in &commands {
        out.push_str(&format!("{}: {}\n", command.path, command.line()));
    }
    Ok(out)
}

fn read_events(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).context("reading events from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(source).with_context(|| format!("reading {source}"))
}
