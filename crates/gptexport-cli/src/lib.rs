//! Wiring for the `gptexport` binary.

pub mod command;
pub mod session;

pub use command::{Command, Selection};
pub use session::{MenuOutcome, Session};
