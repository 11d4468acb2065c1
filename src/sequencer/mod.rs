//! Backing-band sequencer: transport, instrument slots and the step loop.

pub mod accompaniment;
pub mod band;
pub mod transport;

pub use accompaniment::{AccompanimentEngine, EngineState, StepCallback, StepPosition};
pub use band::{Band, Generator};
pub use transport::Transport;
