//! The external command boundary.
//!
//! Plugins never touch `std::process` directly; they see only the
//! [`CommandRunner`] trait — run a command line, check a file, read a file's
//! lines. [`SystemRunner`] is the real implementation; [`ScriptedRunner`]
//! replays canned outputs for tests.

pub mod command;
pub mod platform;
pub mod script;

pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use platform::{detect_platform, Platform};
pub use script::ScriptedRunner;
