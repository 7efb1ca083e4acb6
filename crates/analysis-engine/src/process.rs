//! UCI engine subprocess with a non-blocking line channel (async I/O)
//!
//! A reader task moves stdout lines into an unbounded channel. The owner
//! queues commands with [`EngineProcess::send`] and pumps both directions
//! with [`EngineProcess::drain_available`], one command per call.

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::{sleep, timeout, Instant};

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// Upper bound on lines returned by a single drain
pub const MAX_LINES_PER_DRAIN: usize = 100;

const INIT_WINDOW: Duration = Duration::from_secs(1);
const INIT_TICK: Duration = Duration::from_millis(10);
const QUIT_GRACE: Duration = Duration::from_millis(500);
const EXIT_WAIT: Duration = Duration::from_secs(2);

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

pub struct EngineProcess {
    name: String,
    is_maia: bool,
    child: Option<Child>,
    stdin: Writer,
    lines: mpsc::UnboundedReceiver<String>,
    pending: VecDeque<String>,
    initialized: bool,
    alive: bool,
}

impl EngineProcess {
    /// Launch the engine binary and start its stdout/stderr reader tasks
    pub fn spawn(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let mut child = Command::new(&config.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                path: config.path.clone(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Crashed(format!("{}: stdin unavailable", config.path)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Crashed(format!("{}: stdout unavailable", config.path)))?;

        if let Some(stderr) = child.stderr.take() {
            let name = config.path.clone();
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    debug!(engine = %name, line = %line, "engine stderr");
                }
            });
        }

        info!(engine = %config.path, maia = config.is_maia(), "Engine process started");

        let mut process = Self::from_io(config.path.clone(), config.is_maia(), stdin, stdout);
        process.child = Some(child);
        Ok(process)
    }

    /// Wrap an already-connected pair of pipes (no child process to supervise)
    pub fn from_io<W, R>(name: impl Into<String>, is_maia: bool, stdin: W, stdout: R) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Self {
            name: name.into(),
            is_maia,
            child: None,
            stdin: Box::new(stdin),
            lines: rx,
            pending: VecDeque::new(),
            initialized: false,
            alive: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_maia(&self) -> bool {
        self.is_maia
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Number of queued commands not yet written
    pub fn pending_commands(&self) -> usize {
        self.pending.len()
    }

    /// Queue a command. Blank commands are ignored.
    pub fn send(&mut self, command: &str) {
        let command = command.trim();
        if command.is_empty() {
            return;
        }
        self.pending.push_back(command.to_string());
    }

    /// Write the oldest queued command, if any
    async fn flush_one(&mut self) -> Result<(), EngineError> {
        let Some(cmd) = self.pending.pop_front() else {
            return Ok(());
        };
        debug!(engine = %self.name, cmd = %cmd, "engine <");
        if let Err(e) = self.write_line(&cmd).await {
            self.alive = false;
            return Err(e);
        }
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<(), EngineError> {
        self.stdin.write_all(format!("{line}\n").as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Flush one queued command, then collect whatever output is already buffered.
    ///
    /// Never waits for output. Buffered lines are returned before a closed
    /// channel or exited process is reported as a crash.
    pub async fn drain_available(&mut self) -> Result<Vec<String>, EngineError> {
        if !self.alive {
            return Err(EngineError::Crashed(format!("{} is not running", self.name)));
        }

        self.flush_one().await?;

        let mut out = Vec::new();
        let mut closed = false;
        while out.len() < MAX_LINES_PER_DRAIN {
            match self.lines.try_recv() {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    debug!(engine = %self.name, line = %line, "engine >");
                    out.push(line.to_string());
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    closed = true;
                    break;
                }
            }
        }

        if out.is_empty() {
            if closed {
                self.alive = false;
                return Err(EngineError::Crashed(format!("{}: output closed", self.name)));
            }
            if let Some(child) = self.child.as_mut() {
                if let Some(status) = child.try_wait()? {
                    self.alive = false;
                    return Err(EngineError::Crashed(format!(
                        "{} exited with {status}",
                        self.name
                    )));
                }
            }
        }

        Ok(out)
    }

    /// Run the UCI handshake and option setup, polling for up to a second
    pub async fn initialize(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        for cmd in config.init_commands() {
            self.send(&cmd);
        }

        let deadline = Instant::now() + INIT_WINDOW;
        let mut ready = false;
        loop {
            let lines = self.drain_available().await?;
            if lines.iter().any(|l| l == "readyok") {
                ready = true;
            }
            if ready && self.pending.is_empty() {
                break;
            }
            if Instant::now() >= deadline {
                warn!(
                    engine = %self.name,
                    queued = self.pending.len(),
                    "Engine did not confirm readiness within the init window"
                );
                break;
            }
            sleep(INIT_TICK).await;
        }

        self.initialized = true;
        info!(engine = %self.name, ready, "Engine initialized");
        Ok(())
    }

    /// Ask the engine to exit, force-killing it if it lingers
    pub async fn quit(&mut self) {
        if self.alive {
            let _ = self.write_line("quit").await;
        }
        self.alive = false;
        self.pending.clear();

        let Some(child) = self.child.as_mut() else {
            return;
        };

        sleep(QUIT_GRACE).await;
        if matches!(child.try_wait(), Ok(None)) {
            warn!(engine = %self.name, "Engine ignored quit, killing");
            let _ = child.start_kill();
        }
        if timeout(EXIT_WAIT, child.wait()).await.is_err() {
            warn!(engine = %self.name, "Engine did not exit in time");
        }
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
    }
}
