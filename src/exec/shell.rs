// src/exec/shell.rs

//! Line-by-line script execution with `tokio::process::Command`.

use std::future::Future;
use std::io::SeekFrom;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, anyhow};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::exec::backend::{ScriptOutcome, ScriptRunner};

/// Runs every non-blank line of a script as its own OS command.
///
/// - Lines run sequentially; no shell state carries over between them.
/// - A failing line does not stop the script; later lines still run.
/// - The aggregate exit status is the bitwise OR of all exit codes.
/// - With a timeout configured, the command running when it elapses is
///   killed, the remaining lines are skipped and the status becomes -1.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    timeout: Option<Duration>,
}

enum LineError {
    TimedOut,
    Failed(anyhow::Error),
}

impl ShellRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    async fn run_script(&self, script: String) -> ScriptOutcome {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut exit_status = 0i32;
        let mut output = String::new();

        for line in script.lines().filter(|l| !l.trim().is_empty()) {
            match run_line(line, deadline).await {
                Ok((code, text)) => {
                    debug!(cmd = %line, exit_code = code, "script line finished");
                    output.push_str(&text);
                    exit_status |= code;
                }
                Err(LineError::Failed(err)) => {
                    warn!(cmd = %line, error = %err, "script line could not run");
                    output.push_str(&format!("{err:#}\n"));
                    exit_status |= -1;
                }
                Err(LineError::TimedOut) => {
                    warn!(cmd = %line, timeout = ?self.timeout, "script timed out; killing");
                    output.push_str(&format!("timed out while running: {line}\n"));
                    exit_status |= -1;
                    break;
                }
            }
        }

        info!(exit_status, "script finished");
        ScriptOutcome {
            exit_status,
            output,
        }
    }
}

impl ScriptRunner for ShellRunner {
    fn run(&self, script: String) -> Pin<Box<dyn Future<Output = ScriptOutcome> + Send + '_>> {
        Box::pin(self.run_script(script))
    }
}

/// Build a shell command appropriate for the platform.
fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}

/// Run one line with stdout and stderr both writing into the same temporary
/// file, so the captured text keeps the order the command wrote it in.
async fn run_line(
    line: &str,
    deadline: Option<Instant>,
) -> std::result::Result<(i32, String), LineError> {
    let sink = tempfile::tempfile()
        .context("creating output capture file")
        .map_err(LineError::Failed)?;
    let (stdout, stderr) = sink
        .try_clone()
        .and_then(|out| Ok((out, sink.try_clone()?)))
        .context("sharing output capture file")
        .map_err(LineError::Failed)?;

    let mut cmd = shell_command(line);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for '{line}'"))
        .map_err(LineError::Failed)?;

    let status = match deadline {
        Some(deadline) => {
            let waited = tokio::time::timeout_at(deadline, child.wait()).await;
            let Ok(res) = waited else {
                if let Err(err) = child.kill().await {
                    debug!(cmd = %line, error = %err, "kill after timeout failed");
                }
                return Err(LineError::TimedOut);
            };
            res
        }
        None => child.wait().await,
    }
    .with_context(|| format!("waiting for '{line}'"))
    .map_err(LineError::Failed)?;

    let code = match status.code() {
        Some(code) => code,
        None => {
            return Err(LineError::Failed(anyhow!(
                "'{line}' was terminated by a signal"
            )));
        }
    };

    let text = read_capture(sink)
        .await
        .with_context(|| format!("reading output of '{line}'"))
        .map_err(LineError::Failed)?;
    Ok((code, text))
}

async fn read_capture(sink: std::fs::File) -> std::io::Result<String> {
    let mut file = tokio::fs::File::from_std(sink);
    file.seek(SeekFrom::Start(0)).await?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_every_line_and_ors_exit_codes() {
        let runner = ShellRunner::default();
        let outcome = runner
            .run("echo one\nexit 2\n\necho three >&2\nexit 1".to_string())
            .await;

        assert_eq!(outcome.exit_status, 3);
        assert_eq!(outcome.output, "one\nthree\n");
    }

    #[tokio::test]
    async fn stdout_and_stderr_keep_write_order() {
        let outcome = ShellRunner::default()
            .run("echo a; echo b >&2; echo c".to_string())
            .await;

        assert_eq!(outcome.exit_status, 0);
        assert_eq!(outcome.output, "a\nb\nc\n");
    }

    #[tokio::test]
    async fn shell_state_does_not_persist_between_lines() {
        let runner = ShellRunner::default();
        let outcome = runner
            .run("FOO=bar; echo $FOO\necho \"[$FOO]\"".to_string())
            .await;

        assert_eq!(outcome.exit_status, 0);
        assert_eq!(outcome.output, "bar\n[]\n");
    }

    #[tokio::test]
    async fn empty_script_succeeds_without_output() {
        let outcome = ShellRunner::default().run(String::new()).await;
        assert_eq!(outcome.exit_status, 0);
        assert!(outcome.output.is_empty());
    }

    #[tokio::test]
    async fn timeout_kills_and_skips_remaining_lines() {
        let runner = ShellRunner::new(Some(Duration::from_millis(200)));
        let outcome = runner.run("sleep 5\necho never".to_string()).await;

        assert_eq!(outcome.exit_status, -1);
        assert!(outcome.output.contains("timed out"));
        assert!(!outcome.output.contains("never"));
    }
}
