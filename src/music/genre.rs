//! Genre profiles: chord progressions per root key, a 16-step rhythm mask
//! that gates the harmony instruments, and a swing amount for the transport.

use crate::error::LookupError;
use crate::shared::{Genre, STEPS_PER_BAR};

/// One loop of the band: a chord per bar.
pub type Progression = [&'static str; 4];

#[derive(Debug)]
pub struct GenreProfile {
    pub genre: Genre,
    /// Declaration order matters: the first entry is the fallback.
    pub progressions: &'static [(&'static str, Progression)],
    pub feel: &'static str,
    pub rhythm_pattern: [u8; STEPS_PER_BAR],
    pub swing_amount: f64,
}

impl GenreProfile {
    /// Progression authored for `key`, or the first-declared one when the
    /// detected key has no entry.
    pub fn progression_for(&self, key: &str) -> &'static Progression {
        let found = self
            .progressions
            .iter()
            .find(|(root, _)| *root == key)
            .or_else(|| self.progressions.first());
        match found {
            Some((_, chords)) => chords,
            None => &EMPTY_FALLBACK,
        }
    }

    pub fn harmony_on(&self, step: usize) -> bool {
        self.rhythm_pattern[step % STEPS_PER_BAR] == 1
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.progressions.iter().map(|(root, _)| *root)
    }
}

// Unreachable with the table below; keeps progression_for total.
const EMPTY_FALLBACK: Progression = ["C", "C", "C", "C"];

static PROFILES: [GenreProfile; 8] = [
    GenreProfile {
        genre: Genre::Highlife,
        progressions: &[
            ("C", ["C", "Am", "F", "G"]),
            ("D", ["D", "Bm", "G", "A"]),
            ("G", ["G", "Em", "C", "D"]),
            ("E", ["E", "C#m", "A", "B"]),
            ("F", ["F", "Dm", "Bb", "C"]),
            ("A", ["A", "F#m", "D", "E"]),
        ],
        feel: "Relaxed & Groovy",
        rhythm_pattern: [1, 0, 1, 0, 0, 1, 0, 1, 0, 0, 1, 0, 1, 0, 0, 1],
        swing_amount: 0.2,
    },
    GenreProfile {
        genre: Genre::Afrobeats,
        progressions: &[
            ("C", ["C", "G", "Am", "F"]),
            ("D", ["D", "A", "Bm", "G"]),
            ("G", ["G", "D", "Em", "C"]),
            ("E", ["E", "B", "C#m", "A"]),
            ("F", ["F", "C", "Dm", "Bb"]),
            ("A", ["A", "E", "F#m", "D"]),
        ],
        feel: "Driving & Percussive",
        rhythm_pattern: [1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 1, 0],
        swing_amount: 0.1,
    },
    GenreProfile {
        genre: Genre::Jazz,
        progressions: &[
            ("C", ["Cmaj7", "Dm7", "G7", "Cmaj7"]),
            ("D", ["Dmaj7", "Em7", "A7", "Dmaj7"]),
            ("G", ["Gmaj7", "Am7", "D7", "Gmaj7"]),
            ("F", ["Fmaj7", "Gm7", "C7", "Fmaj7"]),
            ("Bb", ["Bbmaj7", "Cm7", "F7", "Bbmaj7"]),
            ("Eb", ["Ebmaj7", "Fm7", "Bb7", "Ebmaj7"]),
        ],
        feel: "Smooth & Chromatic",
        rhythm_pattern: [1, 0, 0, 1, 0, 1, 0, 0, 1, 0, 1, 0, 0, 1, 0, 0],
        swing_amount: 0.6,
    },
    GenreProfile {
        genre: Genre::Reggae,
        progressions: &[
            ("C", ["C", "G", "Am", "F"]),
            ("D", ["D", "A", "Bm", "G"]),
            ("G", ["G", "D", "Em", "C"]),
            ("A", ["A", "E", "F#m", "D"]),
            ("E", ["E", "B", "C#m", "A"]),
            ("F", ["F", "C", "Dm", "Bb"]),
        ],
        feel: "Off-beat & Laid-back",
        rhythm_pattern: [0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0],
        swing_amount: 0.3,
    },
    GenreProfile {
        genre: Genre::Blues,
        progressions: &[
            ("E", ["E7", "E7", "A7", "E7"]),
            ("A", ["A7", "A7", "D7", "A7"]),
            ("G", ["G7", "G7", "C7", "G7"]),
            ("C", ["C7", "C7", "F7", "C7"]),
            ("D", ["D7", "D7", "G7", "D7"]),
            ("B", ["B7", "B7", "E7", "B7"]),
        ],
        feel: "Soulful & Swinging",
        rhythm_pattern: [1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 0],
        swing_amount: 0.5,
    },
    GenreProfile {
        genre: Genre::Hiphop,
        progressions: &[
            ("C", ["Cm", "Ab", "Eb", "Bb"]),
            ("D", ["Dm", "Bb", "F", "C"]),
            ("G", ["Gm", "Eb", "Bb", "F"]),
            ("A", ["Am", "F", "C", "G"]),
            ("E", ["Em", "C", "G", "D"]),
            ("F", ["Fm", "Db", "Ab", "Eb"]),
        ],
        feel: "Hard & Rhythmic",
        rhythm_pattern: [1, 0, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 0, 1, 0],
        swing_amount: 0.05,
    },
    GenreProfile {
        genre: Genre::Amapiano,
        progressions: &[
            ("C", ["Cm", "Ab", "Fm", "G"]),
            ("D", ["Dm", "Bb", "Gm", "A"]),
            ("A", ["Am", "F", "Dm", "E"]),
            ("G", ["Gm", "Eb", "Cm", "D"]),
            ("E", ["Em", "C", "Am", "B"]),
            ("F", ["Fm", "Db", "Bbm", "C"]),
        ],
        feel: "Bouncy & Deep",
        rhythm_pattern: [1, 0, 1, 0, 0, 1, 0, 0, 1, 0, 1, 0, 0, 1, 0, 0],
        swing_amount: 0.15,
    },
    GenreProfile {
        genre: Genre::Gospel,
        progressions: &[
            ("C", ["C", "Am7", "Dm7", "G7"]),
            ("D", ["D", "Bm7", "Em7", "A7"]),
            ("G", ["G", "Em7", "Am7", "D7"]),
            ("F", ["F", "Dm7", "Gm7", "C7"]),
            ("Bb", ["Bb", "Gm7", "Cm7", "F7"]),
            ("Eb", ["Eb", "Cm7", "Fm7", "Bb7"]),
        ],
        feel: "Uplifting & Rich",
        rhythm_pattern: [1, 0, 0, 1, 0, 1, 0, 0, 1, 0, 0, 1, 0, 1, 0, 0],
        swing_amount: 0.3,
    },
];

pub fn profile(genre: Genre) -> &'static GenreProfile {
    // PROFILES is declared in Genre::ALL order
    &PROFILES[Genre::ALL.iter().position(|g| *g == genre).unwrap_or(0)]
}

pub fn profile_by_name(name: &str) -> Result<&'static GenreProfile, LookupError> {
    let genre: Genre = name.parse()?;
    Ok(profile(genre))
}

pub fn all() -> &'static [GenreProfile] {
    &PROFILES
}
