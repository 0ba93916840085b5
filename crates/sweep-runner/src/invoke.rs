use crate::command::CommandLine;
use std::io::{self, Read};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const PIPE_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn status_label(&self) -> String {
        self.exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string())
    }
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("empty_command: nothing to execute")]
    EmptyCommand,
    #[error("spawn_failed: {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("timed_out: benchmark still running after {timeout:?}, killed")]
    TimedOut {
        timeout: Duration,
        stdout: String,
        stderr: String,
    },
    #[error("wait_failed: {0}")]
    Wait(#[from] io::Error),
}

pub trait Invoker {
    fn invoke(&self, command: &CommandLine) -> Result<ProcessOutput, InvokeError>;
}

#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {
    pub timeout: Option<Duration>,
}

impl ProcessInvoker {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl Invoker for ProcessInvoker {
    fn invoke(&self, command: &CommandLine) -> Result<ProcessOutput, InvokeError> {
        let program = command.program().ok_or(InvokeError::EmptyCommand)?;
        let mut cmd = Command::new(program);
        cmd.args(command.args());
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        if self.timeout.is_some() {
            own_process_group(&mut cmd);
        }

        debug!(command = %command, "spawning benchmark");
        let child = cmd.spawn().map_err(|source| InvokeError::Spawn {
            program: program.to_string(),
            source,
        })?;

        match self.timeout {
            None => {
                let output = child.wait_with_output()?;
                Ok(ProcessOutput {
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
            Some(timeout) => wait_with_deadline(child, timeout),
        }
    }
}

struct PipeReader {
    buf: Arc<Mutex<Vec<u8>>>,
    eof: mpsc::Receiver<()>,
}

impl PipeReader {
    fn spawn<R: Read + Send + 'static>(pipe: Option<R>) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let (tx, eof) = mpsc::channel();
        let sink = Arc::clone(&buf);
        thread::spawn(move || {
            if let Some(mut pipe) = pipe {
                let mut chunk = [0u8; 8192];
                loop {
                    match pipe.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => {
                            if let Ok(mut b) = sink.lock() {
                                b.extend_from_slice(&chunk[..n]);
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                        Err(_) => break,
                    }
                }
            }
            let _ = tx.send(());
        });
        Self { buf, eof }
    }

    fn settle(&self, until: Instant) -> bool {
        self.eof
            .recv_timeout(until.saturating_duration_since(Instant::now()))
            .is_ok()
    }

    fn text(&self) -> String {
        self.buf
            .lock()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug)]
enum WaitOutcome {
    Exited(ExitStatus),
    Expired,
    Failed(io::Error),
}

fn poll_until<F>(deadline: Instant, mut try_wait: F) -> WaitOutcome
where
    F: FnMut() -> io::Result<Option<ExitStatus>>,
{
    loop {
        match try_wait() {
            Ok(Some(status)) => return WaitOutcome::Exited(status),
            Ok(None) if Instant::now() >= deadline => return WaitOutcome::Expired,
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return WaitOutcome::Failed(e),
        }
    }
}

// Launcher scripts fork the JVM; a group lets the timeout reach it.
#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_cmd: &mut Command) {}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    if let Ok(pgid) = libc::pid_t::try_from(pgid) {
        // ESRCH once the group is gone; nothing to do then.
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

fn kill_and_reap(child: &mut Child) {
    kill_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

fn wait_with_deadline(mut child: Child, timeout: Duration) -> Result<ProcessOutput, InvokeError> {
    // Readers keep the pipes flowing while we poll, otherwise a child that
    // fills its stdout buffer never exits.
    let stdout = PipeReader::spawn(child.stdout.take());
    let stderr = PipeReader::spawn(child.stderr.take());
    let pgid = child.id();

    let deadline = Instant::now() + timeout;
    let status = match poll_until(deadline, || child.try_wait()) {
        WaitOutcome::Exited(status) => Some(status),
        WaitOutcome::Expired => {
            kill_and_reap(&mut child);
            None
        }
        WaitOutcome::Failed(e) => {
            kill_and_reap(&mut child);
            return Err(InvokeError::Wait(e));
        }
    };

    // Leftovers the benchmark forked still hold the pipes open.
    kill_group(pgid);
    let until = Instant::now() + PIPE_GRACE;
    let closed = stdout.settle(until) & stderr.settle(until);
    if !closed {
        warn!(pgid, "benchmark output pipes still open after kill; returning partial output");
    }

    let (stdout, stderr) = (stdout.text(), stderr.text());
    match status {
        Some(status) => Ok(ProcessOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        }),
        None => Err(InvokeError::TimedOut {
            timeout,
            stdout,
            stderr,
        }),
    }
}
