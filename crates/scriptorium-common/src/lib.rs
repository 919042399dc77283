//! scriptorium-common: shared error type and the sandboxed HTTP client used across Scriptorium crates.

pub mod error;
pub mod sandbox;

pub use error::{Result, ScriptoriumError};
pub use sandbox::SandboxClient;
