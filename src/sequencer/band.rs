//! The backing band: one optional sound generator per instrument family.
//! An empty slot means that family sits out; the sequencer checks for
//! presence instead of looking generators up by name.

use crossbeam_channel::{Sender, TrySendError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::audio_api::{AudioCommand, Patch, TriggerParams};
use crate::music::note;
use crate::shared::Instrument;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("synth queue full, dropped {0:?} command")]
    QueueFull(Patch),
    #[error("synth is gone, cannot reach {0:?}")]
    Disconnected(Patch),
}

/// Handle to one synth patch living in the audio callback.
#[derive(Debug)]
pub struct Generator {
    patch: Patch,
    tx: Sender<AudioCommand>,
}

impl Generator {
    pub fn new(patch: Patch, tx: Sender<AudioCommand>) -> Self {
        Self { patch, tx }
    }

    pub fn patch(&self) -> Patch {
        self.patch
    }

    /// Plays `notes` (pitch names) for `duration` seconds, `time` seconds
    /// from now. Unparseable note names are skipped. A full queue drops the
    /// hit rather than stalling the sequencer.
    pub fn trigger(&self, notes: &[&str], duration: f64, velocity: f32, time: f64) {
        let freqs: Vec<f32> = notes.iter().filter_map(|n| note::frequency(n)).collect();
        if freqs.is_empty() {
            debug!(patch = ?self.patch, ?notes, "no playable notes");
            return;
        }
        self.send_trigger(freqs, duration, velocity, time);
    }

    /// For unpitched drums.
    pub fn hit(&self, duration: f64, velocity: f32, time: f64) {
        self.send_trigger(vec![0.0], duration, velocity, time);
    }

    fn send_trigger(&self, freqs: Vec<f32>, duration: f64, velocity: f32, time: f64) {
        let cmd = AudioCommand::Trigger(TriggerParams {
            patch: self.patch,
            freqs,
            duration: duration as f32,
            velocity: velocity.clamp(0.0, 1.0),
            delay: time.max(0.0) as f32,
        });
        if let Err(e) = self.tx.try_send(cmd) {
            debug!(patch = ?self.patch, "trigger dropped: {e}");
        }
    }

    pub fn dispose(self) -> Result<(), GeneratorError> {
        self.tx
            .try_send(AudioCommand::Release(self.patch))
            .map_err(|e| match e {
                TrySendError::Full(_) => GeneratorError::QueueFull(self.patch),
                TrySendError::Disconnected(_) => GeneratorError::Disconnected(self.patch),
            })
    }
}

#[derive(Debug, Default)]
pub struct Band {
    pub guitar: Option<Generator>,
    pub bass: Option<Generator>,
    pub piano: Option<Generator>,
    pub kick: Option<Generator>,
    pub snare: Option<Generator>,
    pub hihat: Option<Generator>,
}

impl Band {
    pub fn for_selection(selection: Instrument, tx: &Sender<AudioCommand>) -> Self {
        let full = selection == Instrument::FullBand;
        let slot = |wanted: bool, patch: Patch| wanted.then(|| Generator::new(patch, tx.clone()));
        let drums = full || selection == Instrument::Drums;
        Self {
            guitar: slot(full || selection == Instrument::Guitar, Patch::Guitar),
            bass: slot(full || selection == Instrument::Bass, Patch::Bass),
            piano: slot(full || selection == Instrument::Piano, Patch::Piano),
            kick: slot(drums, Patch::Kick),
            snare: slot(drums, Patch::Snare),
            hihat: slot(drums, Patch::HiHat),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patches().is_empty()
    }

    pub fn patches(&self) -> Vec<Patch> {
        [&self.guitar, &self.bass, &self.piano, &self.kick, &self.snare, &self.hihat]
            .into_iter()
            .flatten()
            .map(Generator::patch)
            .collect()
    }

    /// Releases every generator. A failure on one is logged and the rest are
    /// still released. Returns how many failed.
    pub fn dispose(&mut self) -> usize {
        let slots = [
            self.guitar.take(),
            self.bass.take(),
            self.piano.take(),
            self.kick.take(),
            self.snare.take(),
            self.hihat.take(),
        ];
        let mut failed = 0;
        for generator in slots.into_iter().flatten() {
            if let Err(e) = generator.dispose() {
                warn!("generator release failed: {e}");
                failed += 1;
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_fills_matching_slots() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        assert_eq!(Band::for_selection(Instrument::Guitar, &tx).patches(), vec![Patch::Guitar]);
        assert_eq!(Band::for_selection(Instrument::Bass, &tx).patches(), vec![Patch::Bass]);
        assert_eq!(Band::for_selection(Instrument::Piano, &tx).patches(), vec![Patch::Piano]);
        assert_eq!(
            Band::for_selection(Instrument::Drums, &tx).patches(),
            vec![Patch::Kick, Patch::Snare, Patch::HiHat]
        );
        assert_eq!(Band::for_selection(Instrument::FullBand, &tx).patches().len(), 6);
    }

    #[test]
    fn trigger_converts_note_names() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let g = Generator::new(Patch::Piano, tx);
        g.trigger(&["A4", "nope"], 0.25, 0.5, 0.01);
        let AudioCommand::Trigger(t) = rx.try_recv().unwrap() else {
            panic!("expected trigger");
        };
        assert_eq!(t.patch, Patch::Piano);
        assert_eq!(t.freqs.len(), 1);
        assert!((t.freqs[0] - 440.0).abs() < 1e-3);
        assert!((t.delay - 0.01).abs() < 1e-6);
    }

    #[test]
    fn dispose_releases_all_even_when_some_fail() {
        // capacity 2: the third and later releases hit a full queue
        let (tx, rx) = crossbeam_channel::bounded(2);
        let mut band = Band::for_selection(Instrument::FullBand, &tx);
        let failed = band.dispose();
        assert_eq!(failed, 4);
        assert!(band.is_empty());
        let released: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            released,
            vec![AudioCommand::Release(Patch::Guitar), AudioCommand::Release(Patch::Bass)]
        );
    }

    #[test]
    fn dispose_survives_a_dead_synth() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut band = Band::for_selection(Instrument::Drums, &tx);
        drop(rx);
        assert_eq!(band.dispose(), 3);
        assert!(band.is_empty());
    }
}
