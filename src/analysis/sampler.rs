//! The slow loop: every few seconds, snapshot the microphone spectrum and,
//! if someone is actually playing, ask the oracle for a key.
//!
//! Runs on its own thread so a slow inference round trip never touches the
//! band. The next sample is scheduled only after the current one finished,
//! and a cancelled token stops both the rescheduling and the publishing of
//! any result that was still in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use tracing::{debug, info};

use super::features::{AnalyserWindow, AudioFeatures, SpectrumAnalyser};
use crate::inference::{KeyOracle, KeyReading};
use crate::shared::Genre;

#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cadence {
    pub first_delay: Duration,
    pub interval: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            first_delay: Duration::from_secs(1),
            interval: Duration::from_secs(5),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SampleOutcome {
    /// Below the silence threshold; the oracle was not asked.
    Silent(AudioFeatures),
    /// Asked, nothing usable came back.
    NoReading(AudioFeatures),
    Detected(KeyReading),
}

/// One sampling tick: gate on amplitude, then ask the oracle.
pub fn sample_once(features: AudioFeatures, genre: Genre, oracle: &dyn KeyOracle) -> SampleOutcome {
    if !features.is_audible() {
        return SampleOutcome::Silent(features);
    }
    match oracle.detect_key(&features, genre) {
        Some(reading) => SampleOutcome::Detected(reading),
        None => SampleOutcome::NoReading(features),
    }
}

pub struct Sampler {
    token: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl Sampler {
    pub fn spawn(
        window: Arc<Mutex<AnalyserWindow>>,
        sample_rate: u32,
        oracle: Arc<dyn KeyOracle>,
        genre: Genre,
        cadence: Cadence,
        tx: Sender<SampleOutcome>,
    ) -> std::io::Result<Self> {
        let token = CancelToken::new();
        let thread_token = token.clone();
        let handle = thread::Builder::new()
            .name("jampilot-sampler".into())
            .spawn(move || {
                let mut analyser = SpectrumAnalyser::new();
                let mut delay = cadence.first_delay;
                loop {
                    if !sleep_unless_cancelled(delay, &thread_token) {
                        break;
                    }
                    let samples = match window.lock() {
                        Ok(w) => w.snapshot(),
                        Err(_) => break,
                    };
                    let features = analyser.features(&samples, sample_rate);
                    let outcome = sample_once(features, genre, oracle.as_ref());
                    if thread_token.is_cancelled() {
                        debug!("session ended during sampling, dropping result");
                        break;
                    }
                    if tx.send(outcome).is_err() {
                        break;
                    }
                    delay = cadence.interval;
                }
                debug!("sampler finished");
            })?;
        info!(?cadence, "sampler started");
        Ok(Self { token, handle: Some(handle) })
    }

    /// Stops rescheduling. Does not wait for an inference call that is
    /// still running; its result will be dropped.
    pub fn cancel(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.cancel();
    }
}

// Parks in slices until the deadline; unpark wakes it early on cancel.
fn sleep_unless_cancelled(delay: Duration, token: &CancelToken) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if token.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::park_timeout(deadline - now);
    }
}
