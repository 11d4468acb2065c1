// Types shared by the middle layer, the tui and the session backend.
//
// Stage keys:
//   Space         //  start / stop the live session (mic toggle)
//   g / G         //  next / previous genre
//   i             //  next instrument
//   l             //  next locality
//   - / =         //  bpm down / up by BPM_NUDGE
//   Esc           //  quit (a live session is stopped and saved first)
//
// The middle layer owns all session state; the tui only renders the
// DisplayState it gets every frame.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::LookupError;

pub const STEPS_PER_BAR: usize = 16;
pub const MIN_BPM: u16 = 60;
pub const MAX_BPM: u16 = 180;
pub const BPM_NUDGE: i16 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    Highlife,
    Afrobeats,
    Jazz,
    Reggae,
    Blues,
    Hiphop,
    Amapiano,
    Gospel,
}

impl Genre {
    pub const ALL: [Genre; 8] = [
        Genre::Highlife,
        Genre::Afrobeats,
        Genre::Jazz,
        Genre::Reggae,
        Genre::Blues,
        Genre::Hiphop,
        Genre::Amapiano,
        Genre::Gospel,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Genre::Highlife => "highlife",
            Genre::Afrobeats => "afrobeats",
            Genre::Jazz => "jazz",
            Genre::Reggae => "reggae",
            Genre::Blues => "blues",
            Genre::Hiphop => "hiphop",
            Genre::Amapiano => "amapiano",
            Genre::Gospel => "gospel",
        }
    }

    pub fn next(self) -> Self {
        cycle(&Self::ALL, self, 1)
    }

    pub fn prev(self) -> Self {
        cycle(&Self::ALL, self, Self::ALL.len() - 1)
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Genre {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Genre::ALL
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LookupError::UnknownGenre(s.to_string()))
    }
}

/// What the band plays along with you.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    Guitar,
    Bass,
    Piano,
    Drums,
    #[value(name = "full_band")]
    FullBand,
}

impl Instrument {
    pub const ALL: [Instrument; 5] = [
        Instrument::Guitar,
        Instrument::Bass,
        Instrument::Piano,
        Instrument::Drums,
        Instrument::FullBand,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Instrument::Guitar => "guitar",
            Instrument::Bass => "bass",
            Instrument::Piano => "piano",
            Instrument::Drums => "drums",
            Instrument::FullBand => "full_band",
        }
    }

    pub fn next(self) -> Self {
        cycle(&Self::ALL, self, 1)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

// Only stored with the session record, the band doesn't use it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Locality {
    Ghana,
    Nigeria,
    #[value(name = "south_africa")]
    SouthAfrica,
    Jamaica,
    Usa,
    Uk,
}

impl Locality {
    pub const ALL: [Locality; 6] = [
        Locality::Ghana,
        Locality::Nigeria,
        Locality::SouthAfrica,
        Locality::Jamaica,
        Locality::Usa,
        Locality::Uk,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Locality::Ghana => "ghana",
            Locality::Nigeria => "nigeria",
            Locality::SouthAfrica => "south_africa",
            Locality::Jamaica => "jamaica",
            Locality::Usa => "usa",
            Locality::Uk => "uk",
        }
    }

    pub fn next(self) -> Self {
        cycle(&Self::ALL, self, 1)
    }
}

impl fmt::Display for Locality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: T, offset: usize) -> T {
    let idx = all.iter().position(|x| *x == current).unwrap_or(0);
    all[(idx + offset) % all.len()]
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    ToggleSession, // space
    NextGenre,
    PrevGenre,
    NextInstrument,
    NextLocality,
    NudgeBpm(i16),
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedState {
    Off,
    OnMedium, // harmony hits on this step
    OnHigh,   // the step being played
}

#[derive(Clone, Debug)]
pub struct LogLine {
    pub time: DateTime<Local>,
    pub message: String,
    pub is_error: bool,
}

#[derive(Clone, Debug)]
pub struct DisplayState {
    pub leds: [LedState; STEPS_PER_BAR],
    pub live: bool,
    pub playing: bool, // band running (a key has been detected)
    pub key: Option<String>,
    pub chords: Vec<String>,
    pub current_bar: usize,
    pub genre: Genre,
    pub feel: &'static str,
    pub swing: f64,
    pub instrument: Instrument,
    pub locality: Locality,
    pub bpm: u16,
    pub logs: Vec<LogLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_names_parse_back() {
        for g in Genre::ALL {
            assert_eq!(g.name().parse::<Genre>(), Ok(g));
        }
        assert_eq!(
            "polka".parse::<Genre>(),
            Err(LookupError::UnknownGenre("polka".into()))
        );
    }

    #[test]
    fn cycling_wraps() {
        assert_eq!(Genre::Gospel.next(), Genre::Highlife);
        assert_eq!(Genre::Highlife.prev(), Genre::Gospel);
        assert_eq!(Instrument::FullBand.next(), Instrument::Guitar);
        assert_eq!(Locality::Uk.next(), Locality::Ghana);
    }

    #[test]
    fn instrument_serializes_snake_case() {
        let json = serde_json::to_string(&Instrument::FullBand).unwrap();
        assert_eq!(json, "\"full_band\"");
        let loc: Locality = serde_json::from_str("\"south_africa\"").unwrap();
        assert_eq!(loc, Locality::SouthAfrica);
    }
}
