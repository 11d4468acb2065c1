// Pitch names like "C#4" or "Bb3": letter, optional accidental, octave.

/// MIDI note number for a pitch name, C4 = 60.
pub fn midi_number(name: &str) -> Option<i32> {
    let mut chars = name.chars();
    let letter = chars.next()?;
    let base = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let rest = chars.as_str();
    let (shift, octave_str) = match rest.chars().next()? {
        '#' => (1, &rest[1..]),
        'b' => (-1, &rest[1..]),
        _ => (0, rest),
    };
    let octave: i32 = octave_str.parse().ok()?;
    Some((octave + 1) * 12 + base + shift)
}

/// Frequency in Hz, equal temperament with A4 = 440.
pub fn frequency(name: &str) -> Option<f32> {
    let midi = midi_number(name)?;
    Some(440.0 * 2.0_f32.powf((midi - 69) as f32 / 12.0))
}

/// Same pitch class moved to `octave`; the first digit run is replaced.
pub fn with_octave(name: &str, octave: u8) -> String {
    match name.find(|c: char| c.is_ascii_digit()) {
        Some(idx) => {
            let end = name[idx..]
                .find(|c: char| !c.is_ascii_digit())
                .map_or(name.len(), |n| idx + n);
            format!("{}{}{}", &name[..idx], octave, &name[end..])
        }
        None => format!("{name}{octave}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_accidentals() {
        assert_eq!(midi_number("C4"), Some(60));
        assert_eq!(midi_number("C#4"), Some(61));
        assert_eq!(midi_number("Bb3"), Some(58));
        assert_eq!(midi_number("C1"), Some(24));
        assert_eq!(midi_number("H2"), None);
        assert_eq!(midi_number("C"), None);
    }

    #[test]
    fn a4_is_440() {
        let f = frequency("A4").unwrap();
        assert!((f - 440.0).abs() < 1e-3);
        let c4 = frequency("C4").unwrap();
        assert!((c4 - 261.63).abs() < 0.01);
    }

    #[test]
    fn reoctaves_root() {
        assert_eq!(with_octave("G3", 2), "G2");
        assert_eq!(with_octave("C#4", 2), "C#2");
        assert_eq!(with_octave("Bb3", 2), "Bb2");
    }
}
