//! Voiced — a fully-local, always-listening voice assistant core.
//!
//! Boots the worker supervisor, opens the capture device, and runs the
//! audio loop: every frame feeds the noise floor, VAD gate, and wake
//! detector; a wake event hands control to the conversation controller for
//! one full wake -> capture -> transcribe -> respond -> follow-up cycle.

mod audio;
mod bridge;
mod capture;
mod config;
mod controller;
mod error;
mod indexer;
mod logging;
mod noise_floor;
mod supervisor;
mod vad;
mod wake_word;
mod workers;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing::{error, info};

use audio::FrameSource;
use controller::session::Session;
use controller::{Controller, ConversationState, FOLLOWUP_TIMEOUT};
use noise_floor::NoiseFloor;
use supervisor::process::ServiceSpec;
use supervisor::Supervisor;
use vad::webrtc::WebrtcPacketVad;
use vad::VadGate;
use wake_word::WakeDetector;
use workers::llm::LlmAdapter;
use workers::stt::SttAdapter;
use workers::tts::TtsAdapter;
use workers::{LLM_PORT, STT_PORT, TTS_PORT};

/// The wake word this build listens for; its classifier lives at
/// `models/<wakeword>.onnx`.
const DEFAULT_WAKEWORD: &str = "alexa";

#[derive(Parser)]
#[command(name = "voiced", about = "Fully-local voice assistant core")]
struct Cli {
    /// Run the document-indexer subtool and exit; no microphone is opened.
    #[arg(long)]
    index: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _logging_guard = logging::init(&config::logs_dir());

    if cli.index {
        return match indexer::run() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("indexer failed: {e}");
                ExitCode::FAILURE
            }
        };
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn worker_command(name: &str, env_var: &str) -> PathBuf {
    std::env::var_os(env_var)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{name}-worker")))
}

async fn run() -> Result<(), error::CoreError> {
    info!("starting voiced");

    let specs = vec![
        ServiceSpec {
            name: "tts",
            command: worker_command("tts", "VOICED_TTS_CMD"),
            args: Vec::new(),
            port: TTS_PORT,
        },
        ServiceSpec {
            name: "stt",
            command: worker_command("stt", "VOICED_STT_CMD"),
            args: Vec::new(),
            port: STT_PORT,
        },
        ServiceSpec {
            name: "llm",
            command: worker_command("llm", "VOICED_LLM_CMD"),
            args: Vec::new(),
            port: LLM_PORT,
        },
    ];

    let supervisor = Supervisor::start(specs).await?;
    info!("all workers ready");

    let stt = SttAdapter::new(STT_PORT);
    let llm = LlmAdapter::new(LLM_PORT);
    let tts = TtsAdapter::new(TTS_PORT, None).map_err(|e| {
        error::CoreError::Internal(error::InternalError::InvariantViolated(format!(
            "failed to open audio output: {e}"
        )))
    })?;
    tts.warmup().await.ok();

    let mut source = FrameSource::open(None)?;
    let mut noise_floor = NoiseFloor::new();
    let mut vad = VadGate::new(Box::new(WebrtcPacketVad::new()));
    let mut wake_detector = WakeDetector::load(&config::models_dir(), DEFAULT_WAKEWORD)?;

    let perf = logging::performance::PerformanceLog::open(&config::logs_dir().join("performance.jsonl"))
        .map_err(|e| error::CoreError::Internal(error::InternalError::InvariantViolated(e.to_string())))?;

    let persona = config::read_system_prompt();
    let session = Session::new(persona, &config::logs_dir())
        .map_err(|e| error::CoreError::Internal(error::InternalError::InvariantViolated(e.to_string())))?;
    let transcriptions = logging::transcriptions::TranscriptionsLog::open(&config::logs_dir())
        .map_err(|e| error::CoreError::Internal(error::InternalError::InvariantViolated(e.to_string())))?;

    let state = controller::ConversationStateMachine::new();
    let mut controller = Controller::new(state, session, transcriptions);

    wake_detector.enable();

    let result = audio_loop(
        &mut source,
        &mut vad,
        &mut noise_floor,
        &mut wake_detector,
        &mut controller,
        &stt,
        &llm,
        &tts,
        &perf,
    )
    .await;

    supervisor.shutdown_all().await;
    result
}

#[allow(clippy::too_many_arguments)]
async fn audio_loop(
    source: &mut FrameSource,
    vad: &mut VadGate,
    noise_floor: &mut NoiseFloor,
    wake_detector: &mut WakeDetector,
    controller: &mut Controller,
    stt: &SttAdapter,
    llm: &LlmAdapter,
    tts: &TtsAdapter,
    perf: &logging::performance::PerformanceLog,
) -> Result<(), error::CoreError> {
    let mut shutdown = Box::pin(shutdown_signal());
    // Armed whenever the controller is sitting in `AwaitingFollowup`; racing
    // it against the frame read is what actually implements the
    // `AwaitingFollowup --timeout--> Idle` edge (§4.7) instead of leaving the
    // state machine's `followup_timeout()` reachable only from a fresh wake.
    let mut followup_deadline: Option<tokio::time::Instant> = None;

    loop {
        if controller.state.current() == ConversationState::AwaitingFollowup {
            followup_deadline.get_or_insert_with(|| tokio::time::Instant::now() + FOLLOWUP_TIMEOUT);
        } else {
            followup_deadline = None;
        }

        let frame = tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("shutdown signal received, shutting down");
                return Ok(());
            }
            _ = sleep_until_opt(followup_deadline) => {
                if controller.state.followup_timeout() {
                    info!("follow-up window elapsed, returning to idle");
                    sync_wake_detector_enablement(wake_detector, controller);
                }
                continue;
            }
            frame = source.read() => frame,
        };

        let frame = match frame {
            Ok(f) => f,
            Err(e) if e.is_fatal() => {
                error!("fatal audio error: {e}");
                return Err(e.into());
            }
            Err(_) => {
                // Recoverable: no full frame arrived within the poll window.
                continue;
            }
        };

        let threshold = noise_floor.get_threshold();
        let is_speech = vad.is_speech(&frame, threshold);
        if !is_speech {
            noise_floor.update(frame.rms());
        }

        sync_wake_detector_enablement(wake_detector, controller);

        if let Some(wake_event) = wake_detector.process(&frame, threshold, is_speech, Instant::now()) {
            if controller.state.on_wake() {
                wake_detector.disable();
                controller
                    .run_turn(wake_event, source, vad, noise_floor, stt, llm, tts, perf)
                    .await;
                sync_wake_detector_enablement(wake_detector, controller);
            }
            continue;
        }

        if controller.state.current() == ConversationState::AwaitingFollowup
            && is_speech
            && controller.state.on_followup_speech()
        {
            controller
                .run_followup(source, vad, noise_floor, stt, llm, tts, perf)
                .await;
            sync_wake_detector_enablement(wake_detector, controller);
        }
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM — whichever arrives first — so
/// `supervisor.shutdown_all()` in `run()` always runs regardless of which
/// signal a process manager sends (§5).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Sleeps until `deadline` if set, otherwise never resolves — lets the
/// follow-up timeout branch live in the same `select!` whether or not a
/// timer is currently armed.
async fn sleep_until_opt(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Entry to `Capturing` disables wake detection until `Idle` is reached
/// again, so the assistant's own synthesized voice can't self-trigger
/// (spec §4.7); every return to `Idle` or `AwaitingFollowup` re-enables it.
fn sync_wake_detector_enablement(wake_detector: &mut WakeDetector, controller: &Controller) {
    if controller.state.wake_detection_should_be_enabled() {
        if !wake_detector.is_enabled() {
            wake_detector.enable();
        }
    } else if wake_detector.is_enabled() {
        wake_detector.disable();
    }
}
