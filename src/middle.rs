// Sits between the tui and the session backend: turns input events into
// controller calls and rebuilds the DisplayState the tui draws each frame.

use std::time::Duration;

use tracing::debug;

use crate::music::profile;
use crate::pipeline::recordings::SessionRecord;
use crate::pipeline::settings::JamSettings;
use crate::session::SessionController;
use crate::shared::{DisplayState, InputEvent, LedState, STEPS_PER_BAR};

pub struct Middle {
    pub settings: JamSettings,
    controller: SessionController,
    display: DisplayState,
}

impl Middle {
    pub fn new(settings: JamSettings, controller: SessionController) -> Self {
        let display = build_display(&settings, &controller);
        Self { settings, controller, display }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn display_state(&self) -> &DisplayState {
        &self.display
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::ToggleSession => self.toggle_session(),
            InputEvent::Quit => {
                self.shutdown();
            }
            // the selection is what the live session was started with
            _ if self.controller.is_live() => debug!(?event, "settings locked while live"),
            InputEvent::NextGenre => self.settings.genre = self.settings.genre.next(),
            InputEvent::PrevGenre => self.settings.genre = self.settings.genre.prev(),
            InputEvent::NextInstrument => self.settings.instrument = self.settings.instrument.next(),
            InputEvent::NextLocality => self.settings.locality = self.settings.locality.next(),
            InputEvent::NudgeBpm(delta) => self.settings.nudge_bpm(delta),
        }
        self.refresh();
    }

    fn toggle_session(&mut self) {
        if self.controller.is_live() {
            // failures are already in the session log
            let _ = self.controller.stop();
        } else {
            let _ = self.controller.start(self.settings);
        }
    }

    /// Stops a live session so it gets saved. Called before quitting.
    pub fn shutdown(&mut self) -> Option<SessionRecord> {
        let record = self.controller.stop().ok().flatten();
        self.refresh();
        record
    }

    pub fn tick(&mut self, elapsed: Duration) {
        self.controller.tick(elapsed);
        self.refresh();
    }

    fn refresh(&mut self) {
        self.display = build_display(&self.settings, &self.controller);
    }
}

fn build_display(settings: &JamSettings, controller: &SessionController) -> DisplayState {
    let genre_profile = profile(settings.genre);
    let position = controller.position();
    let leds = std::array::from_fn(|i| {
        if position.is_some_and(|p| p.step == i) {
            LedState::OnHigh
        } else if genre_profile.harmony_on(i) {
            LedState::OnMedium
        } else {
            LedState::Off
        }
    });
    let leds: [LedState; STEPS_PER_BAR] = leds;

    DisplayState {
        leds,
        live: controller.is_live(),
        playing: controller.is_playing(),
        key: controller.key().map(str::to_string),
        chords: controller.chords().to_vec(),
        current_bar: position.map_or(0, |p| p.bar),
        genre: settings.genre,
        feel: genre_profile.feel,
        swing: genre_profile.swing_amount,
        instrument: settings.instrument,
        locality: settings.locality,
        bpm: settings.bpm,
        logs: controller.log().lines(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::analysis::{AnalyserWindow, AudioFeatures, Cadence};
    use crate::audio::{CaptureStream, Microphone, RecordedAudio};
    use crate::error::SessionError;
    use crate::inference::{KeyOracle, KeyReading};
    use crate::pipeline::recordings::RecordingStore;
    use crate::sequencer::AccompanimentEngine;
    use crate::shared::{Genre, Instrument, Locality, MAX_BPM};

    struct SilentCapture(Arc<Mutex<AnalyserWindow>>);

    impl CaptureStream for SilentCapture {
        fn drain(&mut self) {}
        fn window(&self) -> Arc<Mutex<AnalyserWindow>> {
            Arc::clone(&self.0)
        }
        fn sample_rate(&self) -> u32 {
            44100
        }
        fn finish(self: Box<Self>) -> RecordedAudio {
            RecordedAudio::default()
        }
    }

    struct SilentMic;

    impl Microphone for SilentMic {
        fn open(&self) -> Result<Box<dyn CaptureStream>, SessionError> {
            Ok(Box::new(SilentCapture(Arc::new(Mutex::new(AnalyserWindow::new())))))
        }
    }

    struct NeverOracle;

    impl KeyOracle for NeverOracle {
        fn detect_key(&self, _: &AudioFeatures, _: Genre) -> Option<KeyReading> {
            None
        }
    }

    fn middle(dir: &std::path::Path) -> Middle {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let controller = SessionController::new(
            AccompanimentEngine::new(tx),
            Box::new(SilentMic),
            Arc::new(NeverOracle),
            RecordingStore::new(dir),
            Cadence::default(),
        );
        Middle::new(JamSettings::default(), controller)
    }

    #[test]
    fn selection_keys_cycle_while_idle() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = middle(dir.path());
        m.handle_input(InputEvent::NextGenre);
        m.handle_input(InputEvent::NextInstrument);
        m.handle_input(InputEvent::NextLocality);
        m.handle_input(InputEvent::NudgeBpm(100));
        let ds = m.display_state();
        assert_eq!(ds.genre, Genre::Afrobeats);
        assert_eq!(ds.feel, "Driving & Percussive");
        assert_eq!(ds.instrument, Instrument::Guitar);
        assert_eq!(ds.locality, Locality::Nigeria);
        assert_eq!(ds.bpm, MAX_BPM);
        m.handle_input(InputEvent::PrevGenre);
        assert_eq!(m.display_state().genre, Genre::Highlife);
    }

    #[test]
    fn settings_are_locked_while_live() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = middle(dir.path());
        m.handle_input(InputEvent::ToggleSession);
        assert!(m.display_state().live);
        m.handle_input(InputEvent::NextGenre);
        m.handle_input(InputEvent::NudgeBpm(5));
        assert_eq!(m.settings, JamSettings::default());

        m.handle_input(InputEvent::ToggleSession);
        assert!(!m.display_state().live);
        assert_eq!(m.controller().store().list().len(), 1);
        m.handle_input(InputEvent::NudgeBpm(5));
        assert_eq!(m.display_state().bpm, 115);
    }

    #[test]
    fn leds_show_the_mask_when_idle() {
        let dir = tempfile::tempdir().unwrap();
        let m = middle(dir.path());
        let ds = m.display_state();
        let highlife = profile(Genre::Highlife);
        for (i, led) in ds.leds.iter().enumerate() {
            let expected = if highlife.harmony_on(i) { LedState::OnMedium } else { LedState::Off };
            assert_eq!(*led, expected);
        }
        assert!(!ds.playing);
        assert_eq!(ds.key, None);
    }

    #[test]
    fn quit_saves_a_live_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = middle(dir.path());
        m.handle_input(InputEvent::ToggleSession);
        let record = m.shutdown().unwrap();
        assert_eq!(record.key, "?");
        assert!(record.raw_audio.is_none());
        assert!(m.shutdown().is_none());
        let last = &m.display_state().logs[0];
        assert_eq!(last.message, "Session saved to recordings.");
    }
}
