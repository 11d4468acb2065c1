/// Chord played when a symbol is missing from the table.
pub const DEFAULT_CHORD: &str = "C";

const DEFAULT_VOICING: &[&str] = &["C4", "E4", "G4"];

// symbol -> notes the guitar and piano play for it
const VOICINGS: &[(&str, &[&str])] = &[
    ("C", &["C4", "E4", "G4"]),
    ("Cm", &["C4", "Eb4", "G4"]),
    ("C7", &["C4", "E4", "G4", "Bb4"]),
    ("Cmaj7", &["C4", "E4", "G4", "B4"]),
    ("Cm7", &["C4", "Eb4", "G4", "Bb4"]),
    ("D", &["D4", "F#4", "A4"]),
    ("Dm", &["D4", "F4", "A4"]),
    ("D7", &["D4", "F#4", "A4", "C5"]),
    ("Dmaj7", &["D4", "F#4", "A4", "C#5"]),
    ("Dm7", &["D4", "F4", "A4", "C5"]),
    ("E", &["E4", "G#4", "B4"]),
    ("Em", &["E4", "G4", "B4"]),
    ("E7", &["E4", "G#4", "B4", "D5"]),
    ("Emaj7", &["E4", "G#4", "B4", "D#5"]),
    ("Em7", &["E4", "G4", "B4", "D5"]),
    ("F", &["F3", "A3", "C4"]),
    ("Fm", &["F3", "Ab3", "C4"]),
    ("F7", &["F3", "A3", "C4", "Eb4"]),
    ("Fmaj7", &["F3", "A3", "C4", "E4"]),
    ("Fm7", &["F3", "Ab3", "C4", "Eb4"]),
    ("G", &["G3", "B3", "D4"]),
    ("Gm", &["G3", "Bb3", "D4"]),
    ("G7", &["G3", "B3", "D4", "F4"]),
    ("Gmaj7", &["G3", "B3", "D4", "F#4"]),
    ("Gm7", &["G3", "Bb3", "D4", "F4"]),
    ("A", &["A3", "C#4", "E4"]),
    ("Am", &["A3", "C4", "E4"]),
    ("A7", &["A3", "C#4", "E4", "G4"]),
    ("Amaj7", &["A3", "C#4", "E4", "G#4"]),
    ("Am7", &["A3", "C4", "E4", "G4"]),
    ("B", &["B3", "D#4", "F#4"]),
    ("Bm", &["B3", "D4", "F#4"]),
    ("B7", &["B3", "D#4", "F#4", "A4"]),
    ("Bmaj7", &["B3", "D#4", "F#4", "A#4"]),
    ("Bm7", &["B3", "D4", "F#4", "A4"]),
    ("Bb", &["Bb3", "D4", "F4"]),
    ("Bbmaj7", &["Bb3", "D4", "F4", "A4"]),
    ("Bb7", &["Bb3", "D4", "F4", "Ab4"]),
    ("Eb", &["Eb4", "G4", "Bb4"]),
    ("Ebmaj7", &["Eb4", "G4", "Bb4", "D5"]),
    ("Ab", &["Ab3", "C4", "Eb4"]),
    ("Db", &["Db4", "F4", "Ab4"]),
    ("Bbm", &["Bb3", "Db4", "F4"]),
    ("C#m", &["C#4", "E4", "G#4"]),
    ("F#m", &["F#3", "A3", "C#4"]),
    ("F#m7", &["F#3", "A3", "C#4", "E4"]),
];

/// Notes for a chord symbol. Unknown symbols get the C major triad so the
/// band always has something to play.
pub fn voicing(symbol: &str) -> &'static [&'static str] {
    lookup(symbol).unwrap_or(DEFAULT_VOICING)
}

pub fn is_known(symbol: &str) -> bool {
    lookup(symbol).is_some()
}

fn lookup(symbol: &str) -> Option<&'static [&'static str]> {
    VOICINGS
        .iter()
        .find(|(name, _)| *name == symbol)
        .map(|(_, notes)| *notes)
}
