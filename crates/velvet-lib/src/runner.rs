//! Running the external phases
//!
//! [`PhaseRunner`] is the seam between command construction and the
//! binaries. [`ProcessRunner`] spawns the child in the scratch directory,
//! drains its stderr on a helper thread keeping the last lines, and kills
//! it when the phase budget runs out. Partial outputs are left on disk.

use crate::command::ToolCommand;
use crate::config::ToolConfig;
use crate::error::{Phase, Result, VelvetError};
use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Runs one phase to completion
pub trait PhaseRunner {
    /// Run `command` for `phase`, blocking until it exits
    ///
    /// # Errors
    /// `ProcessSpawn`, `ExternalProcessFailure` or `PipelineTimeout`.
    fn run(&self, phase: Phase, command: &ToolCommand) -> Result<()>;
}

impl<T: PhaseRunner + ?Sized> PhaseRunner for &T {
    fn run(&self, phase: Phase, command: &ToolCommand) -> Result<()> {
        (**self).run(phase, command)
    }
}

/// Runs phases as child processes
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    working_dir: PathBuf,
    indexing_timeout: Option<Duration>,
    graph_timeout: Option<Duration>,
    stderr_tail_lines: usize,
    poll_interval: Duration,
}

impl ProcessRunner {
    /// Runner using the scratch directory, budgets and tail size of `config`
    pub fn new(config: &ToolConfig) -> Self {
        Self {
            working_dir: config.scratch_dir.clone(),
            indexing_timeout: config.timeout(Phase::Indexing),
            graph_timeout: config.timeout(Phase::GraphConstruction),
            stderr_tail_lines: config.stderr_tail_lines,
            poll_interval: Duration::from_millis(50),
        }
    }

    /// Override the budget of one phase
    pub fn with_timeout(mut self, phase: Phase, timeout: Option<Duration>) -> Self {
        match phase {
            Phase::Indexing => self.indexing_timeout = timeout,
            Phase::GraphConstruction => self.graph_timeout = timeout,
        }
        self
    }

    /// How often a bounded phase is polled for exit
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn timeout(&self, phase: Phase) -> Option<Duration> {
        match phase {
            Phase::Indexing => self.indexing_timeout,
            Phase::GraphConstruction => self.graph_timeout,
        }
    }

    /// Wait up to `timeout`; `Ok(None)` means the budget ran out
    fn wait_with_timeout(&self, child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Ok(None);
            }
            thread::sleep(self.poll_interval.min(timeout - elapsed));
        }
    }
}

/// Read `stream` to the end, keeping the last `keep` lines
fn tail_lines<R: Read>(stream: R, keep: usize, phase: Phase) -> Vec<String> {
    let mut reader = BufReader::new(stream);
    let mut tail = VecDeque::with_capacity(keep);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                debug!("[{}] {}", phase.tool_name(), line);
                if keep == 0 {
                    continue;
                }
                if tail.len() == keep {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }
    }
    tail.into_iter().collect()
}

impl PhaseRunner for ProcessRunner {
    fn run(&self, phase: Phase, command: &ToolCommand) -> Result<()> {
        info!("Running {} phase: {}", phase, command);
        let start = Instant::now();

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| VelvetError::ProcessSpawn { phase, source })?;

        let keep = self.stderr_tail_lines;
        let drain = child
            .stderr
            .take()
            .map(|stderr| thread::spawn(move || tail_lines(stderr, keep, phase)));

        let waited = match self.timeout(phase) {
            Some(timeout) => self.wait_with_timeout(&mut child, timeout),
            None => child.wait().map(Some),
        };

        let status = match waited {
            Ok(Some(status)) => status,
            Ok(None) => {
                let timeout = self.timeout(phase).unwrap_or_default();
                warn!("{} phase exceeded {:?}, killing pid {}", phase, timeout, child.id());
                if let Err(e) = child.kill() {
                    warn!("Failed to kill {} phase: {}", phase, e);
                }
                let _ = child.wait();
                // The drain thread is left to finish on its own: a grandchild
                // may still hold the pipe open.
                return Err(VelvetError::PipelineTimeout { phase, timeout });
            }
            Err(e) => {
                let _ = child.kill();
                return Err(VelvetError::ExternalProcessFailure {
                    phase,
                    status: format!("wait failed: {e}"),
                    stderr_tail: String::new(),
                });
            }
        };

        let tail = drain
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if status.success() {
            info!("{} phase finished in {:.1?}", phase, start.elapsed());
            Ok(())
        } else {
            warn!("{} phase failed with {}", phase, status);
            Err(VelvetError::ExternalProcessFailure {
                phase,
                status: status.to_string(),
                stderr_tail: tail.join("\n"),
            })
        }
    }
}
