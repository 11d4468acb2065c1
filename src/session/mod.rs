pub mod controller;
pub mod log;

pub use controller::SessionController;
pub use log::{LogEntry, LogStream};
