//! Child process execution
//!
//! Children inherit stdio so npm and cdk output reaches the caller unchanged.
//! The process-wide working directory is never touched; each child gets its
//! own `current_dir`.

use std::future::Future;
use std::process::ExitStatus;
use std::time::Duration;

use log::{debug, warn};
use tokio::process::Command;
use tokio::time::timeout;

use super::steps::CommandSpec;
use crate::error::BootstrapError;

/// How a finished child exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Success,
    Failed(i32),
    Signalled(i32),
}

impl From<ExitStatus> for StepStatus {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            return StepStatus::Success;
        }
        if let Some(code) = status.code() {
            return StepStatus::Failed(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return StepStatus::Signalled(signal);
            }
        }
        StepStatus::Failed(1)
    }
}

/// Runs one planned command to completion.
pub trait CommandRunner {
    fn run(
        &self,
        command: &CommandSpec,
    ) -> impl Future<Output = Result<StepStatus, BootstrapError>> + Send;
}

/// Spawns real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    step_timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(step_timeout: Option<Duration>) -> Self {
        Self { step_timeout }
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &CommandSpec) -> Result<StepStatus, BootstrapError> {
        let program = which::which_in(
            &command.program,
            std::env::var_os("PATH"),
            &command.cwd,
        )
        .map_err(|_| BootstrapError::ToolNotFound {
            program: command.program.clone(),
        })?;
        debug!("Resolved `{}` to {}", command.program, program.display());

        let mut child = Command::new(&program)
            .args(command.argv())
            .current_dir(&command.cwd)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BootstrapError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let status = match self.step_timeout {
            Some(limit) => {
                let waited = timeout(limit, child.wait()).await;
                match waited {
                    Ok(status) => status?,
                    Err(_) => {
                        warn!(
                            "{} exceeded {}s, killing pid {:?}",
                            command.step,
                            limit.as_secs(),
                            child.id()
                        );
                        let _ = child.kill().await;
                        return Err(BootstrapError::Timeout {
                            step: command.step,
                            secs: limit.as_secs(),
                        });
                    }
                }
            }
            None => child.wait().await?,
        };

        Ok(StepStatus::from(status))
    }
}
