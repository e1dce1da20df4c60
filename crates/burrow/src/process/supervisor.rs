//! Agent subprocess lifecycle supervisor.
//!
//! `start` launches the agent and consumes its log stream inline on the
//! calling task until a readiness or fatal marker appears. Readiness is
//! never delegated to a background reader: a marker missed to a buffering
//! race would leave the caller hanging against a live agent.

use std::collections::{HashMap, VecDeque};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, warn};

use burrow_core::AgentConfig;
use burrow_core::log::parse_line;
use burrow_installer as installer;

use super::error::ProcessError;
use super::state::{ProcessState, ProcessStatus};

type LogBuffer = Arc<Mutex<VecDeque<String>>>;

/// Supervisor for a single agent subprocess.
pub struct NgrokProcess {
    config: AgentConfig,
    child: Option<Child>,
    status: ProcessStatus,
    pid: Option<u32>,
    version: Option<String>,
    api_url: Option<String>,
    started_at: Option<SystemTime>,
    logs: LogBuffer,
}

impl NgrokProcess {
    /// Create a supervisor; nothing is launched until `start`.
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            child: None,
            status: ProcessStatus::NotStarted,
            pid: None,
            version: None,
            api_url: None,
            started_at: None,
            logs: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Current snapshot, refreshing liveness first so a crashed child is
    /// reported as such.
    pub fn state(&mut self) -> ProcessState {
        self.refresh();
        self.snapshot()
    }

    /// Whether the agent is up. Polls the child so an unexpected exit flips
    /// the supervisor to `Crashed`.
    pub fn is_running(&mut self) -> bool {
        self.refresh();
        self.status == ProcessStatus::Running
    }

    /// Version reported by the running agent's banner.
    pub fn version(&self) -> Result<&str, ProcessError> {
        match (&self.status, &self.version) {
            (ProcessStatus::Running, Some(version)) => Ok(version),
            _ => Err(ProcessError::NotStarted),
        }
    }

    /// Base URL of the running agent's local web API.
    pub fn api_url(&self) -> Result<&str, ProcessError> {
        match (&self.status, &self.api_url) {
            (ProcessStatus::Running, Some(url)) => Ok(url),
            _ => Err(ProcessError::NotStarted),
        }
    }

    /// Start the agent and block until its local web API is ready.
    ///
    /// Idempotent while running: returns the current snapshot without
    /// spawning a second process. Installs the binary and a default config
    /// file first when either is missing.
    pub async fn start(&mut self) -> Result<ProcessState, ProcessError> {
        if self.is_running() {
            debug!(pid = self.pid, "agent already running");
            return Ok(self.snapshot());
        }

        if !self.config.binary_path.exists() {
            installer::install_binary(&self.config.binary_path, self.config.version).await?;
        }
        if self.config.config_path.exists() {
            installer::validate_config_file(&self.config.config_path)?;
        } else {
            installer::install_default_config(
                &self.config.config_path,
                &HashMap::new(),
                self.config.version,
            )?;
        }

        let version = self.probe_version().await?;

        let args = self.config.version.start_args(
            &self.config.config_path,
            self.config.auth_token.as_deref(),
            self.config.region.as_deref(),
        );
        info!(binary = %self.config.binary_path.display(), ?args, "spawning agent");

        self.status = ProcessStatus::Starting;
        self.version = None;
        self.api_url = None;
        // Fresh buffer per launch; drain tasks from a previous run hold the
        // old one and die with their stream.
        self.logs = Arc::new(Mutex::new(VecDeque::new()));

        let mut child = Command::new(&self.config.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // stderr carries no readiness markers; drain it into the ring buffer
        // so the pipe cannot fill.
        if let Some(stderr) = child.stderr.take() {
            let logs = Arc::clone(&self.logs);
            let cap = self.config.max_log_lines;
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    push_log(&logs, cap, line);
                }
            });
        }

        let stdout = child.stdout.take().ok_or_else(|| ProcessError::Startup {
            detail: "failed to capture agent stdout".into(),
        })?;
        let mut lines = BufReader::new(stdout).lines();

        let addr = self.await_ready(&mut child, &mut lines).await?;

        self.pid = child.id();
        self.version = Some(version);
        self.api_url = Some(format!("http://{addr}"));
        self.started_at = Some(SystemTime::now());
        self.status = ProcessStatus::Running;
        self.child = Some(child);

        // Readiness is already decided; from here the stream is drained in
        // the background only so the agent never blocks on a full pipe.
        let logs = Arc::clone(&self.logs);
        let cap = self.config.max_log_lines;
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                push_log(&logs, cap, line);
            }
        });

        info!(pid = self.pid, api_url = self.api_url.as_deref(), "agent ready");
        Ok(self.snapshot())
    }

    /// Stop the agent: graceful signal, bounded wait, force-kill fallback.
    ///
    /// Idempotent on an already-stopped supervisor.
    pub async fn stop(&mut self) -> Result<(), ProcessError> {
        let Some(mut child) = self.child.take() else {
            if self.status != ProcessStatus::NotStarted {
                self.status = ProcessStatus::Stopped;
            }
            return Ok(());
        };

        self.status = ProcessStatus::Stopping;
        info!(pid = child.id(), "stopping agent");

        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                // SAFETY: pid comes from our own Child handle; kill(2) with
                // SIGINT is safe to call on an owned subprocess.
                #[allow(unsafe_code)]
                #[allow(clippy::cast_possible_wrap)]
                let ret = unsafe { libc::kill(pid as i32, libc::SIGINT) };
                if ret != 0 {
                    let err = std::io::Error::last_os_error();
                    warn!(pid, error = %err, "failed to send SIGINT");
                }
            }
        }
        #[cfg(not(unix))]
        {
            child.start_kill().ok();
        }

        match tokio::time::timeout(self.config.terminate_timeout, child.wait()).await {
            Ok(Ok(status)) => info!(?status, "agent exited"),
            Ok(Err(e)) => {
                warn!(error = %e, "error waiting for agent exit");
                child.kill().await.ok();
            }
            Err(_) => {
                warn!("grace period elapsed, killing agent");
                child.kill().await.ok();
            }
        }

        self.status = ProcessStatus::Stopped;
        self.pid = None;
        self.api_url = None;
        Ok(())
    }

    fn snapshot(&self) -> ProcessState {
        ProcessState {
            status: self.status,
            pid: self.pid,
            version: self.version.clone(),
            api_url: self.api_url.clone(),
            started_at: self.started_at,
            recent_logs: self
                .logs
                .lock()
                .map(|logs| logs.iter().cloned().collect())
                .unwrap_or_default(),
        }
    }

    fn refresh(&mut self) {
        if let Some(child) = &mut self.child {
            match child.try_wait() {
                Ok(Some(status)) => {
                    warn!(?status, "agent exited unexpectedly");
                    self.child = None;
                    self.status = ProcessStatus::Crashed;
                    self.pid = None;
                    self.api_url = None;
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "failed to poll agent liveness"),
            }
        }
    }

    /// Run the binary's `--version` banner and check its major version
    /// against the configured family.
    async fn probe_version(&self) -> Result<String, ProcessError> {
        let output = Command::new(&self.config.binary_path)
            .arg("--version")
            .output()
            .await?;
        let banner = String::from_utf8_lossy(&output.stdout);

        let re = regex::Regex::new(r"version\s+v?(\d+\S*)")
            .map_err(|e| ProcessError::Startup { detail: e.to_string() })?;
        let version = re
            .captures(banner.as_ref())
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ProcessError::Startup {
                detail: format!("unrecognized version banner: {}", banner.trim()),
            })?;

        let major = match semver::Version::parse(&version) {
            Ok(parsed) => parsed.major,
            Err(_) => version
                .split('.')
                .next()
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| ProcessError::Startup {
                    detail: format!("unparseable agent version: {version}"),
                })?,
        };
        if major != self.config.version.major() {
            return Err(ProcessError::Startup {
                detail: format!(
                    "binary reports version {version} but configuration expects a {} agent",
                    self.config.version
                ),
            });
        }
        debug!(%version, "agent version probed");
        Ok(version)
    }

    /// Consume the log stream until the ready marker, a fatal marker, exit,
    /// or the startup deadline. Returns the bound web API address.
    async fn await_ready(
        &mut self,
        child: &mut Child,
        lines: &mut Lines<BufReader<ChildStdout>>,
    ) -> Result<String, ProcessError> {
        let deadline = tokio::time::Instant::now() + self.config.startup_timeout;
        loop {
            let line = match tokio::time::timeout_at(deadline, lines.next_line()).await {
                Err(_) => {
                    // Deadline hit with the agent half-started; kill it so
                    // no orphan outlives the failed call.
                    warn!("startup deadline elapsed, killing agent");
                    child.start_kill().ok();
                    child.wait().await.ok();
                    self.status = ProcessStatus::Stopped;
                    return Err(ProcessError::StartupTimeout {
                        timeout: self.config.startup_timeout,
                    });
                }
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) | Ok(Err(_)) => {
                    let status = child.wait().await.ok();
                    self.status = ProcessStatus::Crashed;
                    let exit = status.map_or_else(|| "unknown exit".to_string(), |s| s.to_string());
                    return Err(ProcessError::Startup {
                        detail: format!(
                            "agent exited before becoming ready ({exit}){}",
                            self.last_log_hint()
                        ),
                    });
                }
            };

            debug!(line = %line, "agent");
            push_log(&self.logs, self.config.max_log_lines, line.clone());

            let record = parse_line(&line);
            if let Some(detail) = self.config.markers.fatal_detail(&record) {
                child.start_kill().ok();
                child.wait().await.ok();
                self.status = ProcessStatus::Crashed;
                return Err(ProcessError::Startup { detail });
            }
            if let Some(addr) = self.config.markers.ready_addr(&record) {
                return Ok(addr);
            }
        }
    }

    fn last_log_hint(&self) -> String {
        self.logs
            .lock()
            .ok()
            .and_then(|logs| logs.back().cloned())
            .map(|line| format!("; last log: {line}"))
            .unwrap_or_default()
    }
}

fn push_log(logs: &Mutex<VecDeque<String>>, cap: usize, line: String) {
    if let Ok(mut logs) = logs.lock() {
        if logs.len() == cap {
            logs.pop_front();
        }
        logs.push_back(line);
    }
}
