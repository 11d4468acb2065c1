// What the stage remembers between runs: the last selection.

use serde::{Deserialize, Serialize};

use crate::shared::{Genre, Instrument, Locality, MAX_BPM, MIN_BPM};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JamSettings {
    pub genre: Genre,
    pub locality: Locality,
    pub instrument: Instrument,
    pub bpm: u16,
}

impl Default for JamSettings {
    fn default() -> Self {
        Self {
            genre: Genre::Highlife,
            locality: Locality::Ghana,
            instrument: Instrument::FullBand,
            bpm: 110,
        }
    }
}

impl JamSettings {
    pub fn with_bpm(mut self, bpm: u16) -> Self {
        self.bpm = clamp_bpm(bpm as i32);
        self
    }

    /// Moves the tempo by `delta`, staying inside the playable range.
    pub fn nudge_bpm(&mut self, delta: i16) {
        self.bpm = clamp_bpm(self.bpm as i32 + delta as i32);
    }

    // a hand-edited file can carry anything
    pub fn sanitized(self) -> Self {
        self.with_bpm(self.bpm)
    }
}

pub fn clamp_bpm(bpm: i32) -> u16 {
    bpm.clamp(MIN_BPM as i32, MAX_BPM as i32) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_stage() {
        let s = JamSettings::default();
        assert_eq!(s.genre, Genre::Highlife);
        assert_eq!(s.locality, Locality::Ghana);
        assert_eq!(s.instrument, Instrument::FullBand);
        assert_eq!(s.bpm, 110);
    }

    #[test]
    fn bpm_stays_in_range() {
        let mut s = JamSettings::default().with_bpm(178);
        s.nudge_bpm(5);
        assert_eq!(s.bpm, MAX_BPM);
        let mut s = s.with_bpm(62);
        s.nudge_bpm(-5);
        assert_eq!(s.bpm, MIN_BPM);
        assert_eq!(JamSettings::default().with_bpm(400).bpm, MAX_BPM);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let s: JamSettings = serde_json::from_str(r#"{"genre":"jazz","bpm":20}"#).unwrap();
        let s = s.sanitized();
        assert_eq!(s.genre, Genre::Jazz);
        assert_eq!(s.instrument, Instrument::FullBand);
        assert_eq!(s.bpm, MIN_BPM);
    }
}
