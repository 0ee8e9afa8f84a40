//! compose subprocess execution
//!
//! All compose invocations go through [`ComposeRunner::run`], which applies
//! the caller's deadline and maps failures to [`ComposeError`].

use crate::error::{ComposeError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Executes compose subcommands
#[async_trait]
pub trait ComposeRunner: Send + Sync {
    /// Run `compose <args>` with `dir` as the working directory and return stdout.
    ///
    /// Non-zero exit, spawn failure and deadline expiry are all errors.
    async fn run(&self, dir: &Path, args: &[&str], timeout: Duration) -> Result<String>;
}

/// Docker Compose command flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeCommand {
    /// docker compose
    V2,
    /// docker-compose
    V1,
}

impl ComposeCommand {
    /// Program and leading arguments
    pub fn program_and_args(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            ComposeCommand::V2 => ("docker", &["compose"]),
            ComposeCommand::V1 => ("docker-compose", &[]),
        }
    }

    /// Human readable command line for logs and errors
    pub fn display(&self, args: &[&str]) -> String {
        let (program, base) = self.program_and_args();
        let mut parts = vec![program];
        parts.extend_from_slice(base);
        parts.extend_from_slice(args);
        parts.join(" ")
    }

    /// Detect which compose command is available
    async fn detect() -> Result<ComposeCommand> {
        let v2_check = Command::new("docker")
            .args(["compose", "version"])
            .stdin(Stdio::null())
            .output()
            .await;
        if let Ok(output) = v2_check
            && output.status.success()
        {
            debug!("Using 'docker compose' (v2)");
            return Ok(ComposeCommand::V2);
        }

        let v1_check = Command::new("docker-compose")
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await;
        if let Ok(output) = v1_check
            && output.status.success()
        {
            debug!("Using 'docker-compose' (v1)");
            return Ok(ComposeCommand::V1);
        }

        warn!("No docker compose command found");
        Err(ComposeError::ComposeNotFound)
    }
}

/// Which compose command to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ComposeMode {
    /// Detect on first use (v2 preferred)
    #[default]
    Auto,
    V2,
    V1,
}

impl FromStr for ComposeMode {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ComposeMode::Auto),
            "v2" | "docker compose" => Ok(ComposeMode::V2),
            "v1" | "docker-compose" => Ok(ComposeMode::V1),
            other => Err(ComposeError::InvalidMode(other.to_string())),
        }
    }
}

/// Runs compose as a child process
pub struct CliRunner {
    mode: ComposeMode,
    detected: OnceCell<ComposeCommand>,
}

impl CliRunner {
    pub fn new(mode: ComposeMode) -> Self {
        Self {
            mode,
            detected: OnceCell::new(),
        }
    }

    /// Resolve the compose command (detection result is cached)
    pub async fn command(&self) -> Result<ComposeCommand> {
        match self.mode {
            ComposeMode::V2 => Ok(ComposeCommand::V2),
            ComposeMode::V1 => Ok(ComposeCommand::V1),
            ComposeMode::Auto => self
                .detected
                .get_or_try_init(ComposeCommand::detect)
                .await
                .copied(),
        }
    }
}

#[async_trait]
impl ComposeRunner for CliRunner {
    async fn run(&self, dir: &Path, args: &[&str], timeout: Duration) -> Result<String> {
        let compose = self.command().await?;
        let (program, base_args) = compose.program_and_args();
        let command = compose.display(args);

        let mut cmd = Command::new(program);
        cmd.args(base_args)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = %command, dir = %dir.display(), "Running compose command");

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(ComposeError::Spawn { command, source }),
            Err(_) => return Err(ComposeError::Timeout { command, timeout }),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ComposeError::CommandFailed {
                command,
                stderr,
                exit_code: output.status.code(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
