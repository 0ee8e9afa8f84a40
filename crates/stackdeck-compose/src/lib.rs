//! docker compose CLI integration for stackdeck
//!
//! Every interaction with the orchestrator goes through a [`ComposeRunner`],
//! which executes one compose subcommand inside a service directory and
//! returns its stdout. [`ComposeClient`] builds the concrete operations
//! (ps, up, down, logs) on top of it.
//!
//! # Requirements
//!
//! - `docker compose` (v2) or `docker-compose` (v1) must be on `PATH`
//! - `ps --format json` support (line-delimited JSON, or a JSON array on older releases)

pub mod client;
pub mod error;
pub mod ps;
pub mod runner;

pub use client::{ComposeClient, ComposeTimeouts};
pub use error::{ComposeError, Result};
pub use ps::parse_ps_output;
pub use runner::{CliRunner, ComposeCommand, ComposeMode, ComposeRunner};
