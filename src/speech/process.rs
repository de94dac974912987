//! Running external commands with an optional deadline
//!
//! Commands are always built as argument vectors; nothing goes through a
//! shell, so user text can never be interpreted as shell syntax.

use crate::{PicoError, Result};
use log::{debug, error, warn};
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running child is polled while waiting on a deadline
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Pipeline stage an external command belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Synthesis,
    Transcode,
}

impl Stage {
    /// Wrap a message in this stage's error kind
    pub fn error(self, msg: String) -> PicoError {
        match self {
            Stage::Synthesis => PicoError::Synthesis(msg),
            Stage::Transcode => PicoError::Transcode(msg),
        }
    }
}

/// Render a command for log output
pub fn describe(cmd: &Command) -> String {
    let mut out = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        out.push(' ');
        out.push_str(&arg.to_string_lossy());
    }
    out
}

/// Run `cmd` to completion, or kill it once `timeout` elapses
///
/// A spawn failure or non-zero exit becomes `stage`'s error kind with the
/// child's stderr attached. Hitting the deadline yields
/// [`PicoError::Timeout`].
pub fn run(mut cmd: Command, timeout: Option<Duration>, stage: Stage) -> Result<()> {
    let description = describe(&cmd);
    debug!("Running {}", description);

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| {
        error!("Failed to spawn {}: {}", description, e);
        stage.error(format!("failed to start {}: {}", description, e))
    })?;

    // Drain stderr on a helper thread so a chatty child never blocks on a full pipe
    let stderr_reader = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            buf
        })
    });

    let status = match timeout {
        None => child
            .wait()
            .map_err(|e| wait_error(stage, &description, e))?,
        Some(limit) => match wait_deadline(&mut child, limit)
            .map_err(|e| wait_error(stage, &description, e))?
        {
            Some(status) => status,
            None => {
                warn!("{} timed out after {:?}, killing it", description, limit);
                kill(&mut child);
                return Err(PicoError::Timeout {
                    command: description,
                    seconds: limit.as_secs_f64(),
                });
            }
        },
    };

    let stderr = stderr_reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    if status.success() {
        debug!("{} finished", description);
        return Ok(());
    }

    warn!("Command {} exited with {}", description, status);
    let stderr = stderr.trim();
    let msg = if stderr.is_empty() {
        format!("{} exited with {}", description, status)
    } else {
        format!("{} exited with {}: {}", description, status, stderr)
    };
    Err(stage.error(msg))
}

/// Verify a stage left a non-empty file at `path`
///
/// A zero-byte or missing artifact counts as a failure of that stage
/// rather than being passed downstream.
pub fn check_output(path: &Path, stage: Stage) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        Ok(_) => Err(stage.error(format!("{} is empty", path.display()))),
        Err(e) => Err(stage.error(format!("no output at {}: {}", path.display(), e))),
    }
}

/// Losing track of a running child fails its stage like a bad exit would
fn wait_error(stage: Stage, description: &str, e: io::Error) -> PicoError {
    error!("Waiting for {} failed: {}", description, e);
    stage.error(format!("waiting for {} failed: {}", description, e))
}

/// Poll until the child exits or the deadline passes
fn wait_deadline(child: &mut Child, limit: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn kill(child: &mut Child) {
    match child.kill() {
        Ok(()) => {
            let _ = child.wait(); // Clean up zombie
        }
        Err(e) => debug!("Failed to kill child process: {}", e),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        assert!(run(Command::new("true"), None, Stage::Synthesis).is_ok());
    }

    #[test]
    fn test_failure_maps_to_stage() {
        let err = run(Command::new("false"), None, Stage::Transcode).unwrap_err();
        assert!(matches!(err, PicoError::Transcode(_)));

        let err = run(Command::new("false"), None, Stage::Synthesis).unwrap_err();
        assert!(matches!(err, PicoError::Synthesis(_)));
    }

    #[test]
    fn test_missing_program() {
        let err = run(
            Command::new("definitely-not-a-real-program-picosay"),
            None,
            Stage::Synthesis,
        )
        .unwrap_err();
        assert!(matches!(err, PicoError::Synthesis(_)));
    }

    #[test]
    fn test_timeout_kills_child() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");

        let started = Instant::now();
        let err = run(cmd, Some(Duration::from_millis(100)), Stage::Transcode).unwrap_err();
        assert!(matches!(err, PicoError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_check_output() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.wav");
        let full = dir.path().join("full.wav");
        fs::write(&empty, b"").unwrap();
        fs::write(&full, b"RIFF").unwrap();

        assert!(check_output(&full, Stage::Synthesis).is_ok());
        assert!(matches!(
            check_output(&empty, Stage::Synthesis),
            Err(PicoError::Synthesis(_))
        ));
        assert!(matches!(
            check_output(&dir.path().join("missing"), Stage::Transcode),
            Err(PicoError::Transcode(_))
        ));
    }

    #[test]
    fn test_wait_error_is_stage_failure() {
        let e = io::Error::new(io::ErrorKind::Interrupted, "no child");
        let err = wait_error(Stage::Transcode, "sox in.wav", e);
        assert!(matches!(err, PicoError::Transcode(_)));
        assert!(err.is_pipeline_failure());

        let e = io::Error::new(io::ErrorKind::Other, "no child");
        assert!(wait_error(Stage::Synthesis, "pico2wave", e).is_pipeline_failure());
    }

    #[test]
    fn test_describe() {
        let mut cmd = Command::new("pico2wave");
        cmd.args(["-w", "/tmp/out.wav", "--", "it's; rm -rf /"]);
        assert_eq!(describe(&cmd), "pico2wave -w /tmp/out.wav -- it's; rm -rf /");
    }
}
