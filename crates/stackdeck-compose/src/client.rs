//! Compose operations used by stackdeck

use crate::error::Result;
use crate::ps::parse_ps_output;
use crate::runner::ComposeRunner;
use stackdeck_core::Container;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Deadlines for compose invocations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeTimeouts {
    /// ps and logs
    pub probe: Duration,
    /// up and down
    pub lifecycle: Duration,
}

impl Default for ComposeTimeouts {
    fn default() -> Self {
        Self {
            probe: Duration::from_secs(30),
            lifecycle: Duration::from_secs(120),
        }
    }
}

/// High level compose client
#[derive(Clone)]
pub struct ComposeClient {
    runner: Arc<dyn ComposeRunner>,
    timeouts: ComposeTimeouts,
}

impl ComposeClient {
    pub fn new(runner: Arc<dyn ComposeRunner>, timeouts: ComposeTimeouts) -> Self {
        Self { runner, timeouts }
    }

    /// List the containers of the stack in `dir`, including stopped ones
    pub async fn ps(&self, dir: &Path) -> Result<Vec<Container>> {
        let output = self
            .runner
            .run(dir, &["ps", "--all", "--format", "json"], self.timeouts.probe)
            .await?;
        Ok(parse_ps_output(&output))
    }

    /// Bring the stack up in detached mode
    pub async fn up(&self, dir: &Path) -> Result<()> {
        self.runner
            .run(dir, &["up", "-d"], self.timeouts.lifecycle)
            .await?;
        Ok(())
    }

    /// Tear the stack down
    pub async fn down(&self, dir: &Path) -> Result<()> {
        self.runner
            .run(dir, &["down"], self.timeouts.lifecycle)
            .await?;
        Ok(())
    }

    /// Collect recent log lines. `lines == 0` returns the whole log.
    pub async fn logs(&self, dir: &Path, lines: usize) -> Result<String> {
        let tail = lines.to_string();
        let mut args = vec!["logs", "--no-color"];
        if lines > 0 {
            args.push("--tail");
            args.push(tail.as_str());
        }
        self.runner.run(dir, &args, self.timeouts.probe).await
    }
}
