//! Subprocess execution with enforced deadlines.
//!
//! Every invocation the engine makes goes through [`run_with_deadline`]: the
//! child is spawned with piped output, awaited under a timeout, and killed if
//! the deadline expires. There is deliberately no code path that waits on a
//! child without a deadline.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::errors::EngineError;

/// Specification for one subprocess invocation.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

/// Raw outcome of a finished subprocess.
#[derive(Debug)]
pub struct RunOutcome {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// The most useful diagnostic text for a failed run: stderr if the
    /// program produced any, otherwise stdout, otherwise a fixed message.
    pub fn diagnostic(&self) -> String {
        if !self.stderr.trim().is_empty() {
            self.stderr.clone()
        } else if !self.stdout.trim().is_empty() {
            self.stdout.clone()
        } else {
            "Execution failed".to_string()
        }
    }
}

/// Run a subprocess to completion, killing it once `deadline` elapses.
pub async fn run_with_deadline(
    spec: &CommandSpec,
    deadline: Duration,
) -> Result<RunOutcome, EngineError> {
    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &spec.current_dir {
        command.current_dir(dir);
    }

    log::debug!(
        "spawning {} {:?} (deadline {:?})",
        spec.program,
        spec.args,
        deadline
    );
    let started = Instant::now();
    let child = command.spawn().map_err(|e| {
        EngineError::Workspace(format!("failed to spawn '{}': {}", spec.program, e))
    })?;

    let output = match tokio::time::timeout(deadline, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            // kill_on_drop reaps the child when the future is dropped.
            log::warn!(
                "'{}' exceeded its {:?} deadline and was killed",
                spec.program,
                deadline
            );
            return Err(EngineError::Timeout(deadline));
        }
    };

    let outcome = RunOutcome {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration: started.elapsed(),
    };
    log::debug!(
        "'{}' exited with {:?} in {:?}",
        spec.program,
        outcome.exit_code,
        outcome.duration
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let spec = CommandSpec::new("sh").arg("-c").arg("echo hello; exit 0");
        let outcome = run_with_deadline(&spec, Duration::from_secs(5)).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.stdout, "hello\n");
    }

    #[tokio::test]
    async fn nonzero_exit_reports_stderr_diagnostic() {
        let spec = CommandSpec::new("sh").arg("-c").arg("echo oops >&2; exit 3");
        let outcome = run_with_deadline(&spec, Duration::from_secs(5)).await.unwrap();
        assert!(!outcome.is_success());
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.diagnostic(), "oops\n");
    }

    #[tokio::test]
    async fn deadline_kills_the_child() {
        let spec = CommandSpec::new("sleep").arg("30");
        let started = Instant::now();
        let err = run_with_deadline(&spec, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn missing_program_is_a_workspace_error() {
        let spec = CommandSpec::new("definitely-not-a-real-binary");
        let err = run_with_deadline(&spec, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Workspace(_)));
    }
}
