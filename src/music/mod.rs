//! Static music data: genre profiles, chord voicings and pitch names.

pub mod chord;
pub mod genre;
pub mod note;

pub use chord::{voicing, DEFAULT_CHORD};
pub use genre::{profile, profile_by_name, GenreProfile, Progression};
