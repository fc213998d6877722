//! Single-process runner with a wall-clock deadline.
//!
//! stdout and stderr are drained on background threads *while* the child
//! runs. Otherwise a child writing more than the pipe buffer (~64KB) blocks
//! on write and we deadlock waiting for it to exit.

use crate::cancel::CancelToken;
use crate::error::{ExecutionError, LaunchError};
use crate::template::RenderedCommand;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Child, ExitStatus, Stdio};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// How often the child is polled for exit, cancellation and deadline.
pub const POLL_INTERVAL_MS: u64 = 10;

/// How long to wait for pipe readers after the child is gone. Readers only
/// outlive the child when an escaped descendant still holds the pipe.
pub const READER_GRACE_MS: u64 = 250;

/// What happened to one spawned process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited on its own. `output` is stdout and stderr merged.
    Exited { exit_code: i32, output: String },
    /// The deadline passed and the process group was killed.
    TimedOut { partial_output: String },
    /// The cancel token fired and the process group was killed.
    Cancelled,
}

/// Spawns one command, feeds it stdin and waits with a deadline.
///
/// Stateless apart from the poll interval, so one runner is shared by all
/// concurrent invocations.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    poll_interval: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
        }
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run `command` in `cwd` with `stdin` as its standard input.
    ///
    /// A non-zero exit is reported in [`RunOutcome::Exited`], never as an
    /// error. Errors are `Launch` when the program cannot be started and
    /// `Unknown` when waiting on the child itself fails.
    pub fn run(
        &self,
        command: &RenderedCommand,
        stdin: &str,
        timeout: Duration,
        cwd: &Path,
        cancel: &CancelToken,
    ) -> Result<RunOutcome, ExecutionError> {
        let mut cmd = command.to_command();
        cmd.current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group so a timeout can take down everything the
        // command started (e.g. the program launched by a shell template).
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        tracing::debug!(command = %command, cwd = %cwd.display(), "Spawning process");
        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|source| LaunchError {
            program: command.program().to_string(),
            source,
        })?;

        feed_stdin(&mut child, stdin);
        let mut drain = Drain::start(&mut child);

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    if !drain.wait_readers() {
                        // Something the command started still holds the
                        // pipes; take the rest of its group down.
                        kill_group(&child);
                        drain.wait_readers();
                    }
                    let output = drain.take();
                    let exit_code = exit_code(status);
                    tracing::debug!(
                        exit_code,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Process exited"
                    );
                    return Ok(RunOutcome::Exited { exit_code, output });
                }
                Ok(None) => {}
                Err(e) => {
                    kill_tree(&mut child);
                    let _ = drain.finish();
                    return Err(ExecutionError::Unknown(format!(
                        "Failed to wait for process: {}",
                        e
                    )));
                }
            }

            if cancel.is_cancelled() {
                kill_tree(&mut child);
                let _ = drain.finish();
                tracing::info!(command = %command, "Process cancelled");
                return Ok(RunOutcome::Cancelled);
            }

            if start.elapsed() >= timeout {
                kill_tree(&mut child);
                let partial_output = drain.finish();
                tracing::warn!(
                    command = %command,
                    timeout_ms = timeout.as_millis() as u64,
                    "Process killed: exceeded timeout"
                );
                return Ok(RunOutcome::TimedOut { partial_output });
            }

            thread::sleep(self.poll_interval);
        }
    }
}

/// Write stdin on a detached thread, then close the pipe. A child that
/// never reads its input (broken pipe) is not an error.
fn feed_stdin(child: &mut Child, stdin: &str) {
    let Some(mut pipe) = child.stdin.take() else {
        return;
    };
    let data = stdin.as_bytes().to_vec();
    thread::spawn(move || {
        if let Err(e) = pipe.write_all(&data) {
            if e.kind() != io::ErrorKind::BrokenPipe {
                tracing::debug!(error = %e, "Failed to write stdin");
            }
        }
    });
}

/// Background readers merging stdout and stderr into one buffer in arrival
/// order. Interleaving across the two streams is best-effort.
struct Drain {
    buffer: Arc<Mutex<Vec<u8>>>,
    done_rx: mpsc::Receiver<()>,
    pending: usize,
}

impl Drain {
    fn start(child: &mut Child) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = mpsc::channel();
        let mut pending = 0;
        if let Some(out) = child.stdout.take() {
            spawn_reader(out, buffer.clone(), done_tx.clone());
            pending += 1;
        }
        if let Some(err) = child.stderr.take() {
            spawn_reader(err, buffer.clone(), done_tx);
            pending += 1;
        }
        Self {
            buffer,
            done_rx,
            pending,
        }
    }

    /// Wait up to `READER_GRACE_MS` for the readers to hit EOF. Returns
    /// whether all of them did.
    fn wait_readers(&mut self) -> bool {
        let deadline = Instant::now() + Duration::from_millis(READER_GRACE_MS);
        while self.pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if self.done_rx.recv_timeout(remaining).is_err() {
                tracing::debug!(pending = self.pending, "Output reader still blocked");
                return false;
            }
            self.pending -= 1;
        }
        true
    }

    /// Bounded wait for the readers, then take what was captured.
    fn finish(mut self) -> String {
        self.wait_readers();
        self.take()
    }

    fn take(self) -> String {
        let bytes = match self.buffer.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    mut reader: R,
    sink: Arc<Mutex<Vec<u8>>>,
    done: mpsc::Sender<()>,
) {
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if let Ok(mut out) = sink.lock() {
                        out.extend_from_slice(&buf[..n]);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        let _ = done.send(());
    });
}

/// Signal deaths are reported shell-style as 128 + signal number.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

#[cfg(unix)]
fn kill_group(child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;
    // The group may already be empty; ESRCH is expected.
    let _ = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL);
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

fn kill_tree(child: &mut Child) {
    kill_group(child);
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> RenderedCommand {
        RenderedCommand::Direct {
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
        }
    }

    fn run(script: &str, stdin: &str, timeout: Duration) -> Result<RunOutcome, ExecutionError> {
        let cwd = std::env::temp_dir();
        ProcessRunner::new().run(&sh(script), stdin, timeout, &cwd, &CancelToken::new())
    }

    #[test]
    fn test_stdin_round_trip() {
        let outcome = run("cat", "hello world\n", Duration::from_secs(5)).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Exited {
                exit_code: 0,
                output: "hello world\n".into()
            }
        );
    }

    #[test]
    fn test_stderr_is_merged() {
        let outcome = run("echo out; echo err >&2; exit 3", "", Duration::from_secs(5)).unwrap();
        match outcome {
            RunOutcome::Exited { exit_code, output } => {
                assert_eq!(exit_code, 3);
                assert!(output.contains("out"));
                assert!(output.contains("err"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_large_output_does_not_deadlock() {
        let outcome = run(
            "head -c 1000000 /dev/zero | tr '\\0' 'a'",
            "",
            Duration::from_secs(10),
        )
        .unwrap();
        match outcome {
            RunOutcome::Exited { exit_code, output } => {
                assert_eq!(exit_code, 0);
                assert_eq!(output.len(), 1_000_000);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_timeout_kills_and_returns_promptly() {
        let start = Instant::now();
        let outcome = run("echo started; sleep 30", "", Duration::from_millis(300)).unwrap();
        assert!(start.elapsed() < Duration::from_secs(3));
        match outcome {
            RunOutcome::TimedOut { partial_output } => assert!(partial_output.contains("started")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_timeout_kills_background_children() {
        let start = Instant::now();
        let outcome = run("sleep 30 & sleep 30; wait", "", Duration::from_millis(300)).unwrap();
        assert!(matches!(outcome, RunOutcome::TimedOut { .. }));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_unread_stdin_is_not_an_error() {
        let big = "x".repeat(1 << 20);
        let outcome = run("exit 0", &big, Duration::from_secs(5)).unwrap();
        assert!(matches!(outcome, RunOutcome::Exited { exit_code: 0, .. }));
    }

    #[test]
    fn test_signal_exit_code() {
        let outcome = run("kill -9 $$", "", Duration::from_secs(5)).unwrap();
        assert!(matches!(outcome, RunOutcome::Exited { exit_code: 137, .. }));
    }

    #[test]
    fn test_launch_failure() {
        let cmd = RenderedCommand::Direct {
            program: "lazycph-no-such-program".into(),
            args: vec![],
        };
        let err = ProcessRunner::new()
            .run(
                &cmd,
                "",
                Duration::from_secs(1),
                &std::env::temp_dir(),
                &CancelToken::new(),
            )
            .unwrap_err();
        match err {
            ExecutionError::Launch(launch) => {
                assert_eq!(launch.program, "lazycph-no-such-program");
                assert_eq!(launch.source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected launch error, got {:?}", other),
        }
    }

    #[test]
    fn test_cancel_stops_run() {
        let token = CancelToken::new();
        let remote = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            remote.cancel();
        });
        let start = Instant::now();
        let outcome = ProcessRunner::new()
            .run(
                &sh("sleep 30"),
                "",
                Duration::from_secs(20),
                &std::env::temp_dir(),
                &token,
            )
            .unwrap();
        canceller.join().unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let outcome = ProcessRunner::new()
            .run(
                &sh("cat marker.txt"),
                "",
                Duration::from_secs(5),
                dir.path(),
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Exited {
                exit_code: 0,
                output: "here".into()
            }
        );
    }
}
