//! Server management - spawning, readiness polling and teardown of the
//! application under test

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

/// Configuration for launching the application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Program and arguments. Empty means attach to an already running server.
    pub command: Vec<String>,

    /// Working directory for the child (defaults to the current directory)
    pub working_dir: Option<PathBuf>,

    /// Extra environment variables for the child
    pub env: BTreeMap<String, String>,

    /// How long to wait for the health endpoint
    pub startup_timeout_secs: u64,

    /// Delay between health polls
    pub poll_interval_ms: u64,

    /// Time allowed between SIGTERM and SIGKILL
    pub shutdown_grace_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: vec!["npm".to_string(), "run".to_string(), "dev".to_string()],
            working_dir: None,
            env: BTreeMap::new(),
            startup_timeout_secs: 30,
            poll_interval_ms: 1000,
            shutdown_grace_ms: 5000,
        }
    }
}

impl ServerConfig {
    /// Config that never spawns anything
    pub fn attach() -> Self {
        Self {
            command: Vec::new(),
            ..Default::default()
        }
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Handle to a running server process
pub struct ServerHandle {
    child: Option<Child>,
    pid: u32,
    grace: Duration,
}

impl ServerHandle {
    /// Spawn the configured command with piped output
    pub fn spawn(config: &ServerConfig) -> E2eResult<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| E2eError::InvalidConfig("server command is empty".to_string()))?;

        info!("Spawning server: {}", config.command.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(&config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &config.working_dir {
            cmd.current_dir(dir);
        }

        // Own process group so wrappers like `npm run dev` go down with their children
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| E2eError::ServerStartup(format!("Failed to spawn {}: {}", program, e)))?;

        if let Some(stdout) = child.stdout.take() {
            forward_output(stdout, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output(stderr, "stderr");
        }

        let pid = child.id();
        debug!(pid, "Server process started");

        Ok(Self {
            child: Some(child),
            pid,
            grace: Duration::from_millis(config.shutdown_grace_ms),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Exit status if the process has already terminated
    pub fn exit_status(&mut self) -> Option<ExitStatus> {
        self.child.as_mut().and_then(|c| c.try_wait().ok().flatten())
    }

    /// Terminate and reap the process group. Safe to call more than once.
    ///
    /// Blocks for up to the shutdown grace period; use
    /// [`ServerController::shutdown`] from async code.
    pub fn stop(&mut self) -> E2eResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        info!("Stopping server (pid: {})", self.pid);

        if let Ok(Some(status)) = child.try_wait() {
            debug!(%status, "Server had already exited");
            // The leader is gone but whatever it forked may still hold the group
            self.kill_group();
            return Ok(());
        }

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            let group = Pid::from_raw(self.pid as i32);
            if killpg(group, Signal::SIGTERM).is_ok() {
                let deadline = Instant::now() + self.grace;
                while Instant::now() < deadline {
                    match child.try_wait() {
                        Ok(Some(status)) => {
                            debug!(%status, "Server exited after SIGTERM");
                            self.kill_group();
                            return Ok(());
                        }
                        Ok(None) => std::thread::sleep(Duration::from_millis(50)),
                        Err(e) => {
                            warn!("Failed to poll server process: {}", e);
                            break;
                        }
                    }
                }
                warn!("Server ignored SIGTERM for {:?}, killing", self.grace);
                self.kill_group();
            }
        }

        // Force kill if still running
        let _ = child.kill();
        child.wait()?;

        Ok(())
    }

    /// SIGKILL every remaining member of the child's process group
    fn kill_group(&self) {
        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            match killpg(Pid::from_raw(self.pid as i32), Signal::SIGKILL) {
                Ok(()) => debug!(pid = self.pid, "Killed leftover process group members"),
                Err(Errno::ESRCH) => {}
                Err(e) => warn!("Failed to kill process group {}: {}", self.pid, e),
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Drain a child stream into the log so the child never blocks on a full pipe
fn forward_output<R: Read + Send + 'static>(stream: R, label: &'static str) {
    std::thread::spawn(move || {
        for line in BufReader::new(stream).lines().map_while(Result::ok) {
            debug!(target: "navy_display_e2e::server::output", stream = label, "{}", line);
        }
    });
}

/// Owns the server process for the duration of a run
pub struct ServerController {
    config: ServerConfig,
    handle: Option<ServerHandle>,
    client: reqwest::Client,
}

impl ServerController {
    pub fn new(config: ServerConfig) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        Ok(Self {
            config,
            handle: None,
            client,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// True when no launch command is configured
    pub fn is_attached(&self) -> bool {
        self.config.command.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Launch the application unless it is already running or we attach to
    /// an external one
    pub fn start(&mut self) -> E2eResult<()> {
        if self.handle.is_some() {
            return Ok(()); // Already running
        }

        if self.is_attached() {
            info!("No server command configured, attaching to running server");
            return Ok(());
        }

        self.handle = Some(ServerHandle::spawn(&self.config)?);
        Ok(())
    }

    /// Poll `health_url` until it answers with a success status.
    ///
    /// Returns false when `timeout` elapses or the spawned process exits
    /// first. Connection errors count as "not ready yet".
    pub async fn await_ready(&mut self, health_url: &str, timeout: Duration) -> bool {
        let interval = self.config.poll_interval();
        let start = Instant::now();
        let mut attempts = 0usize;

        loop {
            attempts += 1;

            match self.client.get(health_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!(attempts, "Server is healthy at {}", health_url);
                    return true;
                }
                Ok(resp) => {
                    debug!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    // Connection refused is expected while the server is starting
                    if !e.is_connect() {
                        debug!("Health check error: {}", e);
                    }
                }
            }

            if let Some(handle) = self.handle.as_mut() {
                if let Some(status) = handle.exit_status() {
                    warn!(%status, "Server process exited before becoming ready");
                    return false;
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                break;
            }
            sleep(interval.min(timeout - elapsed)).await;
        }

        warn!(attempts, "Server at {} not ready after {:?}", health_url, timeout);
        false
    }

    /// Stop the server if one was spawned. Idempotent.
    pub fn stop(&mut self) -> E2eResult<()> {
        if let Some(mut handle) = self.handle.take() {
            handle.stop()?;
        }
        Ok(())
    }

    /// [`stop`](Self::stop) on the blocking pool, so the grace period does
    /// not stall the async runtime
    pub async fn shutdown(&mut self) -> E2eResult<()> {
        let Some(mut handle) = self.handle.take() else {
            return Ok(());
        };

        tokio::task::spawn_blocking(move || handle.stop())
            .await
            .map_err(|e| E2eError::Io(std::io::Error::other(e)))?
    }
}

impl Drop for ServerController {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
