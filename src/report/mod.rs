//! Human-readable views over a job's build state.

pub mod console;
pub mod email;

pub use console::ConsoleReport;
pub use email::EmailReport;
