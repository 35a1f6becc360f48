//! Worker process spawning, the `Service Handle` data type, and shutdown.
//!
//! Grounded on `gglib-runtime::process::core::GuiProcessCore` (spawn,
//! piped-stdio log readers, `Drop`-based best-effort kill) and
//! `gglib-runtime::process::shutdown::child::shutdown_child`
//! (SIGTERM-then-timeout-then-SIGKILL escalation).

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{error, info, warn};

use crate::error::TransportError;

/// How long `shutdown_child` waits for a graceful exit before escalating.
const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// What to launch for one worker.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub name: &'static str,
    pub command: PathBuf,
    pub args: Vec<String>,
    pub port: u16,
}

/// `{name, process handle, host, port, command, readiness}` (§3).
pub struct ServiceHandle {
    pub name: &'static str,
    pub port: u16,
    pub host: &'static str,
    child: Child,
    pub ready: bool,
}

impl ServiceHandle {
    pub fn spawn(spec: &ServiceSpec) -> Result<Self, TransportError> {
        let mut command = Command::new(&spec.command);
        command
            .args(&spec.args)
            .arg("--port")
            .arg(spec.port.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| TransportError::RpcFailure {
            service: spec.name.into(),
            cause: format!("failed to spawn: {e}"),
        })?;

        spawn_log_readers(spec.name, &mut child);

        info!(service = spec.name, port = spec.port, "Spawned worker process");

        Ok(Self {
            name: spec.name,
            port: spec.port,
            host: "127.0.0.1",
            child,
            ready: false,
        })
    }

    /// Request termination and wait for exit: SIGTERM, then escalate to
    /// SIGKILL after `GRACEFUL_SHUTDOWN_TIMEOUT`.
    pub async fn shutdown(mut self) {
        info!(service = self.name, "Shutting down worker process");
        if let Err(e) = shutdown_child(&mut self.child).await {
            error!(service = self.name, "failed to shut down cleanly: {e}");
        }
    }
}

#[cfg(unix)]
async fn shutdown_child(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }

    match tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, child.wait()).await {
        Ok(Ok(_status)) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(_timeout) => {
            warn!("worker did not exit after SIGTERM, escalating to SIGKILL");
            child.kill().await?;
            child.wait().await?;
            Ok(())
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_child(child: &mut Child) -> std::io::Result<()> {
    child.kill().await?;
    child.wait().await?;
    Ok(())
}

fn spawn_log_readers(name: &'static str, child: &mut Child) {
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(service = name, "{line}");
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(service = name, "{line}");
            }
        });
    }
}
