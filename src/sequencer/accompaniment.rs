//! The accompaniment engine: a 16th-note step loop locked to the transport.
//!
//! Every step fires the same backing-band template regardless of genre:
//! kick and bass on the half-bar downbeats (steps 0 and 8), snare on the
//! backbeats (4 and 12), hi-hat on every even step, and the harmony
//! instruments wherever the genre's rhythm mask is set. Genre and detected
//! key only change the mask, swing, tempo and chords.
//!
//! States: idle (no band) -> configured (band built) -> running (transport
//! ticking). `start` while running is a clean restart from step zero, which
//! is how a newly detected key takes effect on a bar boundary.

use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::audio_api::AudioCommand;
use crate::music::{chord, voicing, GenreProfile, DEFAULT_CHORD};
use crate::music::note;
use crate::shared::{Instrument, STEPS_PER_BAR};

use super::band::Band;
use super::transport::Transport;

pub const DEFAULT_LOOKAHEAD: Duration = Duration::from_millis(100);

const BASS_OCTAVE: u8 = 2;
const KICK_NOTE: &str = "C1";

/// Where the loop is, reported before the step sounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct StepPosition {
    pub counter: u64,
    pub step: usize,
    pub bar: usize,
}

impl StepPosition {
    pub fn at(counter: u64, progression_len: usize) -> Self {
        let step = (counter % STEPS_PER_BAR as u64) as usize;
        let bar = ((counter / STEPS_PER_BAR as u64) % progression_len.max(1) as u64) as usize;
        Self { counter, step, bar }
    }
}

pub type StepCallback = Box<dyn FnMut(StepPosition) + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Configured,
    Running,
}

struct PlaybackState {
    profile: &'static GenreProfile,
    progression: Vec<String>,
    counter: u64,
    on_step: StepCallback,
}

pub struct AccompanimentEngine {
    tx: Sender<AudioCommand>,
    transport: Transport,
    band: Band,
    playback: Option<PlaybackState>,
    lookahead: Duration,
    rng: fastrand::Rng,
}

impl AccompanimentEngine {
    pub fn new(tx: Sender<AudioCommand>) -> Self {
        Self {
            tx,
            transport: Transport::new(120.0),
            band: Band::default(),
            playback: None,
            lookahead: DEFAULT_LOOKAHEAD,
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_lookahead(mut self, lookahead: Duration) -> Self {
        self.lookahead = lookahead;
        self
    }

    /// Fixed seed for the velocity humanization.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    pub fn state(&self) -> EngineState {
        if self.playback.is_some() {
            EngineState::Running
        } else if self.band.is_empty() {
            EngineState::Idle
        } else {
            EngineState::Configured
        }
    }

    pub fn is_running(&self) -> bool {
        self.playback.is_some()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn band(&self) -> &Band {
        &self.band
    }

    pub fn progression(&self) -> Option<&[String]> {
        self.playback.as_ref().map(|p| p.progression.as_slice())
    }

    pub fn configure_instruments(&mut self, selection: Instrument) {
        self.dispose_instruments();
        self.band = Band::for_selection(selection, &self.tx);
        debug!(%selection, patches = ?self.band.patches(), "band configured");
    }

    pub fn start(
        &mut self,
        profile: &'static GenreProfile,
        bpm: f64,
        progression: &[&str],
        on_step: StepCallback,
    ) {
        self.stop();
        for symbol in progression.iter().filter(|c| !chord::is_known(c)) {
            warn!(chord = %symbol, "no voicing, will play {DEFAULT_CHORD}");
        }
        self.transport.set_tempo(bpm);
        self.transport.set_swing(profile.swing_amount);
        self.playback = Some(PlaybackState {
            profile,
            progression: progression.iter().map(|c| c.to_string()).collect(),
            counter: 0,
            on_step,
        });
        self.transport.start();
        info!(genre = %profile.genre, bpm, ?progression, "band started");
    }

    pub fn stop(&mut self) {
        if self.playback.take().is_none() {
            return;
        }
        if self.transport.stop() {
            // anything still queued in the lookahead window belongs to the old run
            if let Err(e) = self.tx.try_send(AudioCommand::CancelPending) {
                warn!("could not cancel queued steps: {e}");
            }
        }
        debug!("band stopped");
    }

    pub fn dispose_instruments(&mut self) {
        let failed = self.band.dispose();
        if failed > 0 {
            debug!(failed, "some generators failed to release");
        }
    }

    /// Moves the transport forward and plays every step that became due.
    pub fn advance(&mut self, elapsed: Duration) {
        if self.playback.is_none() {
            return;
        }
        let due = self.transport.advance(elapsed, self.lookahead);
        for step in due {
            self.fire_step(step.offset);
        }
    }

    fn fire_step(&mut self, time: f64) {
        let Some(playback) = self.playback.as_mut() else {
            return;
        };
        let pos = StepPosition::at(playback.counter, playback.progression.len());
        let chord = playback
            .progression
            .get(pos.bar)
            .map_or(DEFAULT_CHORD, String::as_str);
        let notes = voicing(chord);

        (playback.on_step)(pos);

        let d = self.transport.step_duration();
        let eighth = d * 2.0;
        let quarter = d * 4.0;
        let thirty_second = d / 2.0;
        let band = &self.band;
        let rng = &mut self.rng;

        if playback.profile.harmony_on(pos.step) {
            if let Some(guitar) = &band.guitar {
                guitar.trigger(notes, eighth, 0.5 + rng.f32() * 0.2, time);
            }
            if let Some(piano) = &band.piano {
                piano.trigger(notes, eighth, 0.4 + rng.f32() * 0.2, time);
            }
        }
        if pos.step == 0 || pos.step == 8 {
            if let (Some(bass), Some(root)) = (&band.bass, notes.first()) {
                let low = note::with_octave(root, BASS_OCTAVE);
                bass.trigger(&[low.as_str()], quarter, 0.7, time);
            }
            if let Some(kick) = &band.kick {
                kick.trigger(&[KICK_NOTE], eighth, 0.9, time);
            }
        }
        if pos.step == 4 || pos.step == 12 {
            if let Some(snare) = &band.snare {
                snare.hit(eighth, 0.6, time);
            }
        }
        if pos.step % 2 == 0 {
            if let Some(hihat) = &band.hihat {
                let accent = if pos.step % 4 == 0 { 0.15 } else { 0.0 };
                hihat.hit(thirty_second, 0.2 + accent, time);
            }
        }

        playback.counter += 1;
    }
}
