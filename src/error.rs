//! Error taxonomy for the core pipeline.
//!
//! Each kind from the design is its own `thiserror` enum; `CoreError` composes
//! them via `#[from]` so call sites can use `?` without manual wrapping.
//! `is_fatal()` tells callers (the audio loop, the supervisor) whether to
//! back off and continue or unwind to shutdown.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio device lost: {0}")]
    DeviceLost(String),
    #[error("audio stream overflow, samples dropped")]
    StreamOverflow,
    #[error("malformed audio frame: {0}")]
    MalformedFrame(String),
    #[error("audio device unavailable: {0}")]
    Unavailable(String),
}

impl AudioError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, AudioError::DeviceLost(_))
    }
}

#[derive(Debug, Error)]
pub enum ServiceInitError {
    #[error("{service} did not become ready within {timeout_secs}s")]
    StartupTimeout { service: String, timeout_secs: u64 },
    #[error("{service} dependency missing: {cause}")]
    DependencyMissing { service: String, cause: String },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("RPC to {service} failed: {cause}")]
    RpcFailure { service: String, cause: String },
    #[error("RPC to {service} timed out after {timeout_secs}s")]
    Timeout { service: String, timeout_secs: u64 },
}

#[derive(Debug, Error)]
pub enum SemanticError {
    #[error("empty transcription")]
    EmptyTranscription,
    #[error("empty utterance")]
    EmptyUtterance,
    #[error("handler claimed the input but produced no output")]
    HandlerNoOutput,
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("required file missing: {path:?}")]
    Missing { path: PathBuf },
    #[error("config file unreadable: {path:?}: {cause}")]
    ConfigUnreadable { path: PathBuf, cause: String },
}

#[derive(Debug, Error)]
pub enum InternalError {
    #[error("invariant violated: {0}")]
    InvariantViolated(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    ServiceInit(#[from] ServiceInitError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl CoreError {
    /// Fatal errors unwind through the supervisor's teardown path; recoverable
    /// ones are logged and the caller continues (audio loop) or the turn is
    /// aborted back to `Idle` (controller).
    pub fn is_fatal(&self) -> bool {
        match self {
            CoreError::Audio(e) => e.is_fatal(),
            CoreError::ServiceInit(_) => true,
            CoreError::Transport(_) => false,
            CoreError::Semantic(_) => false,
            CoreError::Resource(e) => matches!(e, ResourceError::Missing { .. }),
            CoreError::Internal(_) => true,
        }
    }
}
