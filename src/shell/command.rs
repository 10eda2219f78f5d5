//! Step process execution.
//!
//! Children are waited on by polling `try_wait`, so a timeout or a
//! cancellation is noticed within one poll interval. Stopping a child sends
//! SIGTERM, waits for the grace period, then kills it. Output is read on
//! separate threads and collected with the same grace period, so a
//! background process holding the pipes cannot stall the run.

use std::collections::{BTreeMap, VecDeque};
use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{OrchestrateError, Result};
use crate::registry::StepCommand;
use crate::runner::CancellationToken;

use super::platform::{self, detect_shell};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Everything needed to run one step process.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Step id, for error messages.
    pub label: String,
    pub command: StepCommand,
    pub cwd: Option<PathBuf>,
    /// Added to the inherited environment.
    pub env: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
    /// Time between SIGTERM and kill.
    pub grace_period: Duration,
    /// Lines of stdout/stderr to keep.
    pub summary_lines: usize,
}

impl CommandSpec {
    pub fn new(label: impl Into<String>, command: StepCommand) -> Self {
        Self {
            label: label.into(),
            command,
            cwd: None,
            env: BTreeMap::new(),
            timeout: None,
            grace_period: Duration::from_secs(5),
            summary_lines: 20,
        }
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited on its own. `None` when killed by an outside signal.
    Exited(Option<i32>),
    /// Stopped after exceeding its timeout.
    TimedOut,
    /// Stopped because the run was cancelled.
    Cancelled,
}

/// Result of running a step process.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub termination: Termination,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Run a step process to completion, timeout or cancellation.
///
/// Only a failure to start or track the process is an error
/// ([`OrchestrateError::Spawn`] or [`OrchestrateError::Io`]); a non-zero
/// exit is a normal outcome.
pub fn execute(spec: &CommandSpec, cancel: &CancellationToken) -> Result<CommandOutcome> {
    let start = Instant::now();
    let mut cmd = build_command(spec)?;

    let mut child = cmd.spawn().map_err(|e| OrchestrateError::Spawn {
        step: spec.label.clone(),
        message: e.to_string(),
    })?;
    debug!("Spawned '{}' (pid {})", spec.label, child.id());

    let (tx, rx) = mpsc::channel();
    let mut streams = 0;
    if let Some(out) = child.stdout.take() {
        tail_reader(out, Stream::Stdout, spec.summary_lines, tx.clone());
        streams += 1;
    }
    if let Some(err) = child.stderr.take() {
        tail_reader(err, Stream::Stderr, spec.summary_lines, tx.clone());
        streams += 1;
    }
    drop(tx);

    let termination = wait(&mut child, spec, cancel, start)?;
    let (stdout, stderr) = collect_output(&rx, streams, child.id(), spec);

    Ok(CommandOutcome {
        termination,
        stdout,
        stderr,
    })
}
fn build_command(spec: &CommandSpec) -> Result<Command> {
    let mut cmd = match &spec.command {
        StepCommand::Shell(line) => {
            let shell = detect_shell();
            let mut cmd = Command::new(&shell.executable);
            cmd.arg(shell.flag()).arg(line);
            cmd
        }
        StepCommand::Exec(argv) => {
            let Some((program, args)) = argv.split_first() else {
                return Err(OrchestrateError::Spawn {
                    step: spec.label.clone(),
                    message: "empty command".to_string(),
                });
            };
            let mut cmd = Command::new(program);
            cmd.args(args);
            cmd
        }
    };

    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }
    cmd.envs(&spec.env);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group, so terminating reaches grandchildren too.
        cmd.process_group(0);
    }

    Ok(cmd)
}

fn wait(
    child: &mut Child,
    spec: &CommandSpec,
    cancel: &CancellationToken,
    start: Instant,
) -> Result<Termination> {
    loop {
        let polled = child.try_wait();
        if let Some(status) = kill_on_error(child, polled)? {
            return Ok(Termination::Exited(status.code()));
        }

        if cancel.is_cancelled() {
            debug!("Cancelling '{}'", spec.label);
            stop(child, spec.grace_period)?;
            return Ok(Termination::Cancelled);
        }

        if let Some(timeout) = spec.timeout {
            if start.elapsed() >= timeout {
                warn!(
                    "Step '{}' timed out after {}s",
                    spec.label,
                    timeout.as_secs()
                );
                stop(child, spec.grace_period)?;
                return Ok(Termination::TimedOut);
            }
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// SIGTERM, wait up to `grace`, then kill.
fn stop(child: &mut Child, grace: Duration) -> Result<()> {
    platform::terminate(child);

    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        let polled = child.try_wait();
        if kill_on_error(child, polled)?.is_some() {
            return Ok(());
        }
        thread::sleep(POLL_INTERVAL);
    }

    debug!("Grace period elapsed, killing pid {}", child.id());
    platform::kill(child);
    child.wait()?;
    Ok(())
}

/// Pass `result` through, killing the child's process group first when it
/// is an error. A child we can no longer poll must not outlive the step.
fn kill_on_error<T>(child: &mut Child, result: io::Result<T>) -> Result<T> {
    result.map_err(|e| {
        warn!("Lost track of pid {} ({}); killing it", child.id(), e);
        platform::kill(child);
        if let Err(reap) = child.wait() {
            debug!("Could not reap pid {}: {}", child.id(), reap);
        }
        OrchestrateError::Io(e)
    })
}

/// Drain `stream` to EOF on its own thread, keeping the last `lines` lines.
/// Invalid UTF-8 is replaced rather than ending the read, so the child never
/// sees a closed pipe.
fn tail_reader<R: Read + Send + 'static>(
    stream: R,
    kind: Stream,
    lines: usize,
    tx: Sender<(Stream, String)>,
) {
    thread::spawn(move || {
        let mut tail = TailBuffer::new(lines);
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => tail.push(decode_line(&buf)),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("Stopped reading {:?}: {}", kind, e);
                    break;
                }
            }
        }
        if tx.send((kind, tail.into_string())).is_err() {
            debug!("{:?} collected after the step was given up on", kind);
        }
    });
}

fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

/// Wait for the reader threads after the step's own process has ended.
///
/// A background process that inherited the pipes keeps them open; after
/// one grace period its process group gets SIGTERM, after another SIGKILL,
/// and after a third the output is abandoned.
fn collect_output(
    rx: &Receiver<(Stream, String)>,
    mut pending: usize,
    pid: u32,
    spec: &CommandSpec,
) -> (String, String) {
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut escalation = 0;

    while pending > 0 {
        match rx.recv_timeout(spec.grace_period) {
            Ok((Stream::Stdout, text)) => {
                stdout = text;
                pending -= 1;
            }
            Ok((Stream::Stderr, text)) => {
                stderr = text;
                pending -= 1;
            }
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                match escalation {
                    0 => {
                        debug!(
                            "Output of '{}' still open after exit; terminating its process group",
                            spec.label
                        );
                        platform::terminate_group(pid);
                    }
                    1 => platform::kill_group(pid),
                    _ => {
                        warn!("Giving up on remaining output of '{}'", spec.label);
                        break;
                    }
                }
                escalation += 1;
            }
        }
    }

    (stdout, stderr)
}

/// Keeps the last `capacity` lines pushed into it.
#[derive(Debug, Clone)]
pub struct TailBuffer {
    lines: VecDeque<String>,
    capacity: usize,
    dropped: usize,
}

impl TailBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(256)),
            capacity,
            dropped: 0,
        }
    }

    pub fn push(&mut self, line: String) {
        if self.capacity == 0 {
            self.dropped += 1;
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
            self.dropped += 1;
        }
        self.lines.push_back(line);
    }

    /// Lines discarded from the front.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Kept lines joined with newlines, prefixed by a marker when truncated.
    pub fn into_string(self) -> String {
        let mut out = String::new();
        if self.dropped > 0 && !self.lines.is_empty() {
            out.push_str(&format!("... ({} lines omitted)\n", self.dropped));
        }
        for line in self.lines {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}
