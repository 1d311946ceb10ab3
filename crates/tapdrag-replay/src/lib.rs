#![forbid(unsafe_code)]

//! Replay harness for the tap/drag gesture engine.
//!
//! Feeds a JSONL script of encoded DOM events and clock steps into a demo
//! page with one draggable card, and prints one JSON line per outcome.

pub mod cli;
pub mod demo;
pub mod error;
pub mod replay;

pub use cli::run_from_env;
pub use error::{ReplayError, Result};
