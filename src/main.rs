mod analysis;
mod audio;
mod audio_api;
mod cli;
mod config;
mod error;
mod inference;
mod middle;
mod music;
mod pipeline;
mod sequencer;
mod session;
mod shared;
mod tui;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use crossterm::terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use audio::SampleBuffer;
use audio_api::AudioCommand;
use cli::{Cli, Command, JamArgs};
use config::AppConfig;
use inference::{GeminiClient, KeyOracle};
use middle::Middle;
use pipeline::persistence;
use pipeline::recordings::RecordingStore;
use sequencer::AccompanimentEngine;
use session::SessionController;
use shared::InputEvent;

const LOG_FILE: &str = "jampilot.log";
// lets the device buffer drain before the stream is dropped
const PLAYBACK_TAIL: Duration = Duration::from_millis(250);

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let data_dir = config.resolve_data_dir(cli.data_dir.as_deref())?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("cannot create data dir {}", data_dir.display()))?;
    init_tracing(&data_dir)?;

    match cli.command() {
        Command::Jam(args) => jam(&config, &data_dir, &args),
        Command::List => list(&data_dir),
        Command::Play { id } => play(&data_dir, &id),
        Command::Delete { id } => delete(&data_dir, &id),
        Command::Genres { name } => print_genres(name.as_deref()),
    }
}

// the terminal belongs to the stage, so logs go to a file in the data dir
fn init_tracing(data_dir: &Path) -> anyhow::Result<()> {
    let path = data_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn jam(config: &AppConfig, data_dir: &Path, args: &JamArgs) -> anyhow::Result<()> {
    let settings = args.apply(persistence::load_settings(data_dir).unwrap_or_default());

    let oracle: Arc<dyn KeyOracle> = Arc::new(GeminiClient::new(&config.gemini)?);
    if config.gemini.api_key.is_none() {
        warn!("no GEMINI_API_KEY set; the band will wait for a key forever");
    }

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope
    let audio = audio::start_audio()?;
    info!(sample_rate = audio.sample_rate(), "stage open");

    let engine = AccompanimentEngine::new(audio.sender()).with_lookahead(config.lookahead());
    let controller = SessionController::new(
        engine,
        Box::new(audio::CpalMicrophone),
        oracle,
        RecordingStore::new(data_dir),
        config.sampling.cadence(),
    );
    let mut middle = Middle::new(settings, controller);

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = Duration::from_millis(16); // ~60fps
    let mut last_tick = Instant::now();
    let blink_start = Instant::now();

    loop {
        let blink_on = (blink_start.elapsed().as_millis() / 500) % 2 == 0;
        let ds = middle.display_state().clone();

        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds, blink_on);
        })?;

        let events = tui::input::poll_input(tick_rate)?;
        for event in events {
            if event == InputEvent::Quit {
                // a live session is stopped and saved before quitting
                middle.shutdown();
                if let Err(e) = persistence::save_settings(data_dir, &middle.settings) {
                    warn!("could not save settings: {e:#}");
                }
                drop(term);
                drop(middle);
                drop(audio);
                return Ok(());
            }
            middle.handle_input(event);
        }

        let elapsed = last_tick.elapsed();
        last_tick = Instant::now();
        middle.tick(elapsed);
    }
}

fn list(data_dir: &Path) -> anyhow::Result<()> {
    let store = RecordingStore::new(data_dir);
    let records = store.list();
    if records.is_empty() {
        println!("no recordings yet");
        return Ok(());
    }
    for r in records {
        let audio = r
            .raw_audio
            .as_deref()
            .map(|p| store.resolve(p).display().to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{}  {}  {:<10} {:<10} {:<12} {:>3} bpm  key {:<3} {:>6.1}s  {}",
            r.id,
            r.date.format("%Y-%m-%d %H:%M"),
            r.genre,
            r.instrument,
            r.locality,
            r.bpm,
            r.key,
            r.duration,
            audio,
        );
    }
    Ok(())
}

fn play(data_dir: &Path, id: &str) -> anyhow::Result<()> {
    let store = RecordingStore::new(data_dir);
    let record = store.find(id).with_context(|| format!("no recording with id {id}"))?;
    let raw = record
        .raw_audio
        .as_deref()
        .with_context(|| format!("{id} has no recorded audio"))?;

    let audio = audio::start_audio()?;
    let clip = SampleBuffer::load_wav(&store.resolve(raw), audio.sample_rate())?;
    let length = clip.duration();
    info!(id, frames = clip.len(), "playing recording");
    println!(
        "playing {id}: {} / {} in {}, {:.1}s",
        record.genre,
        record.instrument,
        record.key,
        length.as_secs_f64()
    );
    audio
        .sender()
        .send(AudioCommand::Play(Arc::new(clip)))
        .context("audio output closed")?;
    std::thread::sleep(length + PLAYBACK_TAIL);
    Ok(())
}

fn delete(data_dir: &Path, id: &str) -> anyhow::Result<()> {
    let store = RecordingStore::new(data_dir);
    if store.delete(id)? {
        println!("deleted {id}");
        Ok(())
    } else {
        anyhow::bail!("no recording with id {id}")
    }
}

fn print_genres(name: Option<&str>) -> anyhow::Result<()> {
    let profiles: Vec<&music::GenreProfile> = match name {
        Some(n) => vec![music::profile_by_name(n)?],
        None => music::genre::all().iter().collect(),
    };
    for p in profiles {
        let mask: String = p.rhythm_pattern.iter().map(|&s| if s == 1 { 'x' } else { '.' }).collect();
        let keys: Vec<&str> = p.keys().collect();
        println!(
            "{:<10} {:<22} swing {:.2}  {}  keys {}",
            p.genre,
            p.feel,
            p.swing_amount,
            mask,
            keys.join(" "),
        );
    }
    Ok(())
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
