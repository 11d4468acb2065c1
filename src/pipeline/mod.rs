pub mod persistence;
pub mod recordings;
pub mod settings;
