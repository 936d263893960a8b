use std::{
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use log::{debug, info, warn};

/// Events that run a user-supplied executable
///
/// Hooks live in the configured hooks directory and are named after the
/// event. They run alongside the countdown, which does not wait for them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Hook {
    Finished,
    Reset,
    Paused,
    Resumed,
}

/// Values passed to a hook through its environment
#[derive(Clone, Debug)]
pub struct HookContext<'a> {
    pub task: &'a str,
    pub minutes: u32,
    pub alarm_url: &'a str,
}

impl Hook {
    pub fn file_name(&self) -> &'static str {
        match *self {
            Self::Finished => "finished",
            Self::Reset => "reset",
            Self::Paused => "paused",
            Self::Resumed => "resumed",
        }
    }

    /// Start the hook if it exists
    ///
    /// Returns `None` when there is no hook for this event. Failing to start
    /// the hook is an error; a hook that exits unsuccessfully is logged once
    /// it has finished.
    pub fn run(&self, hooks_directory: &Path, context: &HookContext<'_>) -> Result<Option<RunningHook>> {
        let hook_path = hooks_directory.join(self.file_name());

        if !hook_path.exists() {
            debug!("No {} hook at {}", self.file_name(), hook_path.display());
            return Ok(None);
        }

        info!(
            "Executing hook at {}",
            hook_path.display().to_string().cyan()
        );

        let mut child = Command::new(&hook_path)
            .env("COUNTDOWN_TASK", context.task)
            .env("COUNTDOWN_MINUTES", context.minutes.to_string())
            .env("COUNTDOWN_ALARM_URL", context.alarm_url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to execute hook {}", hook_path.display()))?;

        let path = hook_path.clone();
        let waiter = thread::spawn(move || {
            let status = child.wait();

            match &status {
                Ok(status) if !status.success() => {
                    warn!("Hook {} exited with {}", path.display(), status)
                }
                Ok(_) => debug!("Hook {} finished", path.display()),
                Err(e) => warn!("Unable to wait for hook {}: {}", path.display(), e),
            }

            status
        });

        Ok(Some(RunningHook {
            path: hook_path,
            waiter,
        }))
    }
}

/// A hook executing in the background
///
/// Dropping it leaves the hook running; its exit status is still logged.
#[derive(Debug)]
pub struct RunningHook {
    path: PathBuf,
    waiter: JoinHandle<std::io::Result<ExitStatus>>,
}

impl RunningHook {
    /// Block until the hook exits
    pub fn wait(self) -> Result<ExitStatus> {
        self.waiter
            .join()
            .map_err(|_| anyhow!("Waiting for hook {} panicked", self.path.display()))?
            .with_context(|| format!("Unable to wait for hook {}", self.path.display()))
    }
}
