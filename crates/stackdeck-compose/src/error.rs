//! docker compose integration error types

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error(
        "Neither 'docker compose' (v2) nor 'docker-compose' (v1) was found. Please install Docker Compose."
    )]
    ComposeNotFound,

    #[error("Invalid compose mode: {0} (expected auto, v2 or v1)")]
    InvalidMode(String),

    #[error("'{command}' failed (exit code {}): {stderr}", exit_code_label(.exit_code))]
    CommandFailed {
        command: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    #[error("'{command}' timed out after {}s", .timeout.as_secs_f64())]
    Timeout { command: String, timeout: Duration },

    #[error("Failed to execute '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl ComposeError {
    /// Whether the deadline expired before the command finished
    pub fn is_timeout(&self) -> bool {
        matches!(self, ComposeError::Timeout { .. })
    }
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ComposeError>;
