//! Worker lifecycle: spawn order TTS, STT, LLM; readiness gating; reverse-order
//! teardown. Grounded on `voice-core::ipc_server`'s service bring-up sequence
//! and `gglib-runtime::process::shutdown`'s escalation policy.

pub mod health;
pub mod process;

use std::time::Duration;

use tracing::{error, info};

use crate::error::{CoreError, ServiceInitError};
use process::{ServiceHandle, ServiceSpec};

const READY_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Supervisor {
    handles: Vec<ServiceHandle>,
    client: reqwest::Client,
}

impl Supervisor {
    /// Spawn every spec in order, waiting for each to answer `/health`
    /// before starting the next. On any failure, already-started workers
    /// are torn down in reverse order before returning the error —
    /// leaving no orphaned processes behind a partially-started pipeline.
    pub async fn start(specs: Vec<ServiceSpec>) -> Result<Self, CoreError> {
        let client = reqwest::Client::new();
        let mut handles = Vec::with_capacity(specs.len());

        for spec in &specs {
            match Self::spawn_and_wait(&client, spec).await {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    error!(service = spec.name, "failed to start: {e}");
                    Self::teardown(&mut handles).await;
                    return Err(e.into());
                }
            }
        }

        Ok(Self { handles, client })
    }

    async fn spawn_and_wait(
        client: &reqwest::Client,
        spec: &ServiceSpec,
    ) -> Result<ServiceHandle, ServiceInitError> {
        let mut handle = ServiceHandle::spawn(spec).map_err(|e| ServiceInitError::DependencyMissing {
            service: spec.name.to_string(),
            cause: e.to_string(),
        })?;

        info!(service = spec.name, "waiting for readiness");
        let ready = health::wait_for_ready(client, handle.host, handle.port, READY_TIMEOUT).await;
        if !ready {
            return Err(ServiceInitError::StartupTimeout {
                service: spec.name.to_string(),
                timeout_secs: READY_TIMEOUT.as_secs(),
            });
        }
        handle.ready = true;
        info!(service = spec.name, "ready");
        Ok(handle)
    }

    async fn teardown(handles: &mut Vec<ServiceHandle>) {
        while let Some(handle) = handles.pop() {
            handle.shutdown().await;
        }
    }

    /// Tear down every running worker, TTS last started shuts down first.
    pub async fn shutdown_all(mut self) {
        Self::teardown(&mut self.handles).await;
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}
