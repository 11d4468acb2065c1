//! Orchestrates one jam session: microphone capture, the background key
//! sampler, the band, and saving the result.
//!
//! Everything here runs on the host loop thread. The sampler publishes its
//! outcomes over a channel that `tick` drains, so a slow inference call
//! never delays a step. Stop order is sampler, then band, then capture.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use tracing::{debug, warn};

use super::log::LogStream;
use crate::analysis::{Cadence, SampleOutcome, Sampler};
use crate::audio::{CaptureStream, Microphone, RecordedAudio};
use crate::error::SessionError;
use crate::inference::{KeyOracle, KeyReading};
use crate::music::profile;
use crate::pipeline::recordings::{RecordingStore, SessionRecord};
use crate::pipeline::settings::JamSettings;
use crate::sequencer::{AccompanimentEngine, StepPosition};

struct LiveSession {
    settings: JamSettings,
    capture: Box<dyn CaptureStream>,
    sampler: Sampler,
    outcomes: Receiver<SampleOutcome>,
    started_at: DateTime<Utc>,
    started: Instant,
}

pub struct SessionController {
    engine: AccompanimentEngine,
    mic: Box<dyn Microphone>,
    oracle: Arc<dyn KeyOracle>,
    store: RecordingStore,
    cadence: Cadence,
    log: LogStream,
    live: Option<LiveSession>,
    key: Option<String>,
    chords: Vec<String>,
    position: Arc<Mutex<Option<StepPosition>>>,
}

impl SessionController {
    pub fn new(
        engine: AccompanimentEngine,
        mic: Box<dyn Microphone>,
        oracle: Arc<dyn KeyOracle>,
        store: RecordingStore,
        cadence: Cadence,
    ) -> Self {
        Self {
            engine,
            mic,
            oracle,
            store,
            cadence,
            log: LogStream::new(),
            live: None,
            key: None,
            chords: Vec::new(),
            position: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_running()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn chords(&self) -> &[String] {
        &self.chords
    }

    /// Last step the band reported, if it is playing.
    pub fn position(&self) -> Option<StepPosition> {
        self.position.lock().ok().and_then(|p| *p)
    }

    pub fn log(&self) -> &LogStream {
        &self.log
    }

    pub fn engine(&self) -> &AccompanimentEngine {
        &self.engine
    }

    pub fn store(&self) -> &RecordingStore {
        &self.store
    }

    pub fn start(&mut self, settings: JamSettings) -> Result<(), SessionError> {
        if self.live.is_some() {
            return Err(SessionError::AlreadyLive);
        }
        let capture = match self.mic.open() {
            Ok(c) => c,
            Err(e) => {
                self.log.error(format!("Error: {e}"));
                return Err(e);
            }
        };

        self.key = None;
        self.chords.clear();
        self.set_position(None);
        self.engine.configure_instruments(settings.instrument);

        let (tx, outcomes) = crossbeam_channel::unbounded();
        let sampler = match Sampler::spawn(
            capture.window(),
            capture.sample_rate(),
            Arc::clone(&self.oracle),
            settings.genre,
            self.cadence,
            tx,
        ) {
            Ok(s) => s,
            Err(e) => {
                self.engine.dispose_instruments();
                drop(capture.finish());
                let err = SessionError::Sampler(e);
                self.log.error(format!("Error: {err}"));
                return Err(err);
            }
        };

        self.live = Some(LiveSession {
            settings,
            capture,
            sampler,
            outcomes,
            started_at: Utc::now(),
            started: Instant::now(),
        });
        self.log
            .info(format!("Session started: {} / {}", settings.genre, settings.instrument));
        Ok(())
    }

    /// One host-loop iteration.
    pub fn tick(&mut self, elapsed: Duration) {
        let mut detected = Vec::new();
        if let Some(live) = self.live.as_mut() {
            live.capture.drain();
            while let Ok(outcome) = live.outcomes.try_recv() {
                match outcome {
                    SampleOutcome::Silent(f) => debug!(amplitude = f.amplitude, "too quiet to sample"),
                    SampleOutcome::NoReading(_) => debug!("no key this cycle"),
                    SampleOutcome::Detected(reading) => detected.push(reading),
                }
            }
        }
        for reading in detected {
            self.apply_reading(reading);
        }
        self.engine.advance(elapsed);
    }

    fn apply_reading(&mut self, reading: KeyReading) {
        let Some(live) = self.live.as_ref() else {
            return;
        };
        let settings = live.settings;
        let genre_profile = profile(settings.genre);
        let progression = genre_profile.progression_for(&reading.key);

        self.chords = progression.iter().map(|c| c.to_string()).collect();
        self.set_position(None);
        let position = Arc::clone(&self.position);
        self.engine.start(
            genre_profile,
            settings.bpm as f64,
            progression,
            Box::new(move |pos| {
                if let Ok(mut p) = position.lock() {
                    *p = Some(pos);
                }
            }),
        );
        self.log.info(format!(
            "Detected Key: {} ({}% confidence)",
            reading.key,
            (reading.confidence * 100.0).round() as i32
        ));
        self.key = Some(reading.key);
    }

    /// Ends the live session and stores it. `Ok(None)` when nothing was live.
    pub fn stop(&mut self) -> Result<Option<SessionRecord>, SessionError> {
        let Some(mut live) = self.live.take() else {
            return Ok(None);
        };
        live.sampler.cancel();
        self.engine.stop();
        self.engine.dispose_instruments();
        self.set_position(None);

        let duration = live.started.elapsed().as_secs_f64();
        let audio = live.capture.finish();
        let mut record =
            SessionRecord::new(live.started_at, &live.settings, self.key.as_deref(), duration);

        match self.persist(&mut record, &audio) {
            Ok(()) => {
                self.log.info("Session saved to recordings.");
                Ok(Some(record))
            }
            Err(e) => {
                self.log.error(format!("Error: {e}"));
                Err(e)
            }
        }
    }

    fn persist(&self, record: &mut SessionRecord, audio: &RecordedAudio) -> Result<(), SessionError> {
        record.raw_audio = self.store.save_raw_audio(&record.id, audio)?;
        if record.raw_audio.is_none() {
            warn!(id = %record.id, "no audio captured");
        }
        self.store.add(record.clone())?;
        Ok(())
    }

    fn set_position(&self, pos: Option<StepPosition>) {
        if let Ok(mut p) = self.position.lock() {
            *p = pos;
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(live) = self.live.as_mut() {
            live.sampler.cancel();
        }
        self.engine.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crossbeam_channel::Sender;

    use super::*;
    use crate::analysis::{AnalyserWindow, AudioFeatures};
    use crate::audio_api::AudioCommand;
    use crate::shared::{Genre, Instrument, Locality};

    struct FakeCapture {
        window: Arc<Mutex<AnalyserWindow>>,
        drained: Arc<AtomicUsize>,
    }

    impl CaptureStream for FakeCapture {
        fn drain(&mut self) {
            self.drained.fetch_add(1, Ordering::SeqCst);
        }
        fn window(&self) -> Arc<Mutex<AnalyserWindow>> {
            Arc::clone(&self.window)
        }
        fn sample_rate(&self) -> u32 {
            8000
        }
        fn finish(self: Box<Self>) -> RecordedAudio {
            RecordedAudio { samples: vec![0.1; 800], sample_rate: 8000 }
        }
    }

    /// Hands out a capture whose window is already full of noise.
    struct FakeMic {
        drained: Arc<AtomicUsize>,
    }

    impl Microphone for FakeMic {
        fn open(&self) -> Result<Box<dyn CaptureStream>, SessionError> {
            let mut rng = fastrand::Rng::with_seed(5);
            let noise: Vec<f32> = (0..2048).map(|_| rng.f32() - 0.5).collect();
            let mut window = AnalyserWindow::new();
            window.push(&noise);
            Ok(Box::new(FakeCapture {
                window: Arc::new(Mutex::new(window)),
                drained: Arc::clone(&self.drained),
            }))
        }
    }

    struct NoMic;

    impl Microphone for NoMic {
        fn open(&self) -> Result<Box<dyn CaptureStream>, SessionError> {
            Err(SessionError::Capture("permission denied".into()))
        }
    }

    struct FixedOracle(Option<KeyReading>);

    impl KeyOracle for FixedOracle {
        fn detect_key(&self, _: &AudioFeatures, _: Genre) -> Option<KeyReading> {
            self.0.clone()
        }
    }

    fn g_major() -> KeyReading {
        KeyReading { key: "G".into(), confidence: 0.9, mood: "bright".into() }
    }

    fn settings() -> JamSettings {
        JamSettings {
            genre: Genre::Highlife,
            locality: Locality::Ghana,
            instrument: Instrument::FullBand,
            bpm: 120,
        }
    }

    fn fast() -> Cadence {
        Cadence { first_delay: Duration::ZERO, interval: Duration::from_millis(10) }
    }

    fn controller(
        mic: Box<dyn Microphone>,
        oracle: Arc<dyn KeyOracle>,
        dir: &std::path::Path,
    ) -> (SessionController, Receiver<AudioCommand>) {
        let (tx, rx): (Sender<AudioCommand>, _) = crossbeam_channel::unbounded();
        let engine = AccompanimentEngine::new(tx).with_seed(1);
        let c = SessionController::new(engine, mic, oracle, RecordingStore::new(dir), fast());
        (c, rx)
    }

    fn tick_until(c: &mut SessionController, done: impl Fn(&SessionController) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(3);
        while !done(c) {
            assert!(Instant::now() < deadline, "timed out");
            std::thread::sleep(Duration::from_millis(5));
            c.tick(Duration::from_millis(5));
        }
    }

    #[test]
    fn detected_key_starts_the_band() {
        let dir = tempfile::tempdir().unwrap();
        let drained = Arc::new(AtomicUsize::new(0));
        let mic = Box::new(FakeMic { drained: Arc::clone(&drained) });
        let (mut c, rx) = controller(mic, Arc::new(FixedOracle(Some(g_major()))), dir.path());

        c.start(settings()).unwrap();
        assert!(c.is_live());
        assert_eq!(c.log().latest().unwrap().message, "Session started: highlife / full_band");

        tick_until(&mut c, |c| c.is_playing());
        assert_eq!(c.key(), Some("G"));
        assert_eq!(c.chords(), ["G", "Em", "C", "D"]);
        assert_eq!(c.engine().transport().tempo(), 120.0);
        assert!(c.log().entries().any(|e| e.message == "Detected Key: G (90% confidence)"));
        assert!(drained.load(Ordering::SeqCst) > 0);

        tick_until(&mut c, |c| c.position().is_some());
        assert_eq!(c.position().unwrap().bar, 0);
        assert!(rx.try_iter().any(|cmd| matches!(cmd, AudioCommand::Trigger(_))));
    }

    #[test]
    fn stop_saves_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let mic = Box::new(FakeMic { drained: Arc::new(AtomicUsize::new(0)) });
        let (mut c, rx) = controller(mic, Arc::new(FixedOracle(Some(g_major()))), dir.path());

        c.start(settings()).unwrap();
        tick_until(&mut c, |c| c.is_playing());
        let record = c.stop().unwrap().unwrap();

        assert!(!c.is_live());
        assert!(!c.is_playing());
        assert_eq!(record.key, "G");
        assert_eq!(record.bpm, 120);
        assert!(record.id.starts_with("rec_"));
        assert!(record.duration >= 0.0);
        assert!(record.mixed_audio.is_none());
        let wav = c.store().resolve(record.raw_audio.as_deref().unwrap());
        assert!(wav.exists());
        assert_eq!(c.store().list(), vec![record]);
        assert_eq!(c.log().latest().unwrap().message, "Session saved to recordings.");

        let cmds: Vec<_> = rx.try_iter().collect();
        assert!(cmds.contains(&AudioCommand::CancelPending));
        assert!(cmds.iter().any(|cmd| matches!(cmd, AudioCommand::Release(_))));
    }

    #[test]
    fn silence_never_starts_the_band() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(FixedOracle(None));
        let mic = Box::new(FakeMic { drained: Arc::new(AtomicUsize::new(0)) });
        let (mut c, _rx) = controller(mic, oracle, dir.path());
        c.start(settings()).unwrap();
        for _ in 0..10 {
            std::thread::sleep(Duration::from_millis(5));
            c.tick(Duration::from_millis(5));
        }
        assert!(!c.is_playing());
        let record = c.stop().unwrap().unwrap();
        assert_eq!(record.key, "?");
    }

    #[test]
    fn capture_failure_creates_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let (mut c, _rx) = controller(Box::new(NoMic), Arc::new(FixedOracle(None)), dir.path());
        let err = c.start(settings()).unwrap_err();
        assert!(matches!(err, SessionError::Capture(_)));
        assert!(!c.is_live());
        let latest = c.log().latest().unwrap();
        assert!(latest.is_error);
        assert_eq!(latest.message, "Error: microphone unavailable: permission denied");
        assert!(c.stop().unwrap().is_none());
        assert!(c.store().list().is_empty());
    }

    #[test]
    fn second_start_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mic = Box::new(FakeMic { drained: Arc::new(AtomicUsize::new(0)) });
        let (mut c, _rx) = controller(mic, Arc::new(FixedOracle(None)), dir.path());
        c.start(settings()).unwrap();
        assert!(matches!(c.start(settings()), Err(SessionError::AlreadyLive)));
        c.stop().unwrap();
    }

    #[test]
    fn late_result_after_stop_is_discarded() {
        struct SlowOracle {
            entered: Sender<()>,
            release: Receiver<()>,
        }
        impl KeyOracle for SlowOracle {
            fn detect_key(&self, _: &AudioFeatures, _: Genre) -> Option<KeyReading> {
                let _ = self.entered.send(());
                let _ = self.release.recv();
                Some(KeyReading { key: "Eb".into(), confidence: 1.0, mood: String::new() })
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
        let (release_tx, release_rx) = crossbeam_channel::unbounded();
        let oracle = Arc::new(SlowOracle { entered: entered_tx, release: release_rx });
        let mic = Box::new(FakeMic { drained: Arc::new(AtomicUsize::new(0)) });
        let (mut c, _rx) = controller(mic, oracle, dir.path());

        c.start(settings()).unwrap();
        entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let record = c.stop().unwrap().unwrap();
        release_tx.send(()).unwrap();

        std::thread::sleep(Duration::from_millis(50));
        c.tick(Duration::from_millis(50));
        assert_eq!(record.key, "?");
        assert_eq!(c.key(), None);
        assert!(!c.is_playing());
    }
}
