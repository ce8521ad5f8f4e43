use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::debug;

use crate::error::ActionError;

// ─── ScriptProcess ────────────────────────────────────────────────────────

/// A running automation script whose stdout carries the status protocol.
///
/// Stdout is read line by line as raw bytes; stderr is drained by a background task and
/// only surfaced in debug logs once the script exits.
pub(crate) struct ScriptProcess {
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr_buf: Arc<Mutex<String>>,
}

impl ScriptProcess {
    /// Run `<interpreter> <script> <args…>`.
    pub(crate) fn spawn(
        interpreter: &str,
        script: &Path,
        args: &[String],
    ) -> Result<Self, ActionError> {
        let mut cmd = build_command(interpreter, script, args);
        cmd.kill_on_drop(true);
        Self::from_command(cmd).map_err(|source| ActionError::ProcessSpawn {
            script: script_label(script),
            source,
        })
    }

    fn from_command(mut cmd: Command) -> std::io::Result<Self> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("stdout not captured"))?;

        let stderr_buf = Arc::new(Mutex::new(String::new()));
        if let Some(stderr) = child.stderr.take() {
            let buf = Arc::clone(&stderr_buf);
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr);
                let mut line = Vec::new();
                while let Ok(n) = reader.read_until(b'\n', &mut line).await {
                    if n == 0 {
                        break;
                    }
                    if let Ok(mut b) = buf.lock() {
                        if !b.is_empty() {
                            b.push('\n');
                        }
                        b.push_str(&decode_line(&line));
                    }
                    line.clear();
                }
            });
        }

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            stderr_buf,
        })
    }

    /// Drain stdout to EOF and return the last line read.
    ///
    /// Earlier lines are diagnostics and are only logged at debug level.
    /// Lines need not be UTF-8; the last one is decoded lossily. Returns
    /// `Ok(None)` when the script printed nothing at all.
    pub(crate) async fn last_line(&mut self) -> std::io::Result<Option<String>> {
        let mut last: Option<Vec<u8>> = None;
        loop {
            let mut line = Vec::new();
            if self.stdout.read_until(b'\n', &mut line).await? == 0 {
                break;
            }
            if let Some(previous) = last.replace(line) {
                debug!(line = %decode_line(&previous), "script diagnostic output");
            }
        }
        Ok(last.as_deref().map(decode_line))
    }

    /// Reap the child and log how it exited.
    pub(crate) async fn finish(&mut self) -> Option<ExitStatus> {
        let status = match self.child.wait().await {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, "failed to wait for script");
                return None;
            }
        };
        let stderr = self.stderr();
        if status.success() {
            debug!(%status, "script exited");
        } else if stderr.is_empty() {
            debug!(%status, "script exited unsuccessfully");
        } else {
            debug!(%status, %stderr, "script exited unsuccessfully");
        }
        Some(status)
    }

    pub(crate) fn stderr(&self) -> String {
        self.stderr_buf
            .lock()
            .ok()
            .map(|b| b.clone())
            .unwrap_or_default()
    }

    /// Kill the script. Best effort: a failure is only logged.
    pub(crate) async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            debug!(error = %e, "failed to kill script");
        }
    }
}

// ─── Fire-and-forget ──────────────────────────────────────────────────────

/// Spawn a script without waiting for it. A background task reaps the
/// child so it never lingers as a zombie.
pub(crate) fn spawn_detached(
    interpreter: &str,
    script: &Path,
    args: &[String],
) -> std::io::Result<()> {
    let mut cmd = build_command(interpreter, script, args);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let mut child = cmd.spawn()?;
    let label = script_label(script);
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => debug!(script = %label, %status, "detached script exited"),
            Err(e) => debug!(script = %label, error = %e, "failed to reap detached script"),
        }
    });
    Ok(())
}

// ─── Command builder ──────────────────────────────────────────────────────

fn build_command(interpreter: &str, script: &Path, args: &[String]) -> Command {
    let mut cmd = Command::new(interpreter);
    cmd.arg(script).args(args);
    cmd
}

/// Strip the line terminator (`\n` or `\r\n`) and decode, replacing
/// invalid UTF-8.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

fn script_label(script: &Path) -> String {
    script
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| script.display().to_string())
}

// ─── Tests ────────────────────────────────────────────────────────────────
