//! Conversation Controller: owns the conversation state machine and
//! orchestrates the wake -> capture -> transcribe -> respond -> follow-up
//! cycle.
//!
//! The state machine is grounded on
//! `voice-core::audio::state::AudioStateMachine` (atomic CAS transitions),
//! generalized from its 4-state machine to this spec's 6 states. Latency
//! checkpoint recording is new, feeding the performance log.

pub mod session;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::audio::FrameSource;
use crate::bridge;
use crate::capture::{self, UtteranceBuffer};
use crate::logging::performance::PerformanceLog;
use crate::logging::transcriptions::TranscriptionsLog;
use crate::noise_floor::NoiseFloor;
use crate::vad::VadGate;
use crate::wake_word::WakeEvent;
use crate::workers::llm::LlmAdapter;
use crate::workers::stt::SttAdapter;
use crate::workers::tts::TtsAdapter;
use session::Session;

/// The six-variant conversation state from §3/§4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConversationState {
    Idle = 0,
    Capturing = 1,
    Transcribing = 2,
    Responding = 3,
    AwaitingFollowup = 4,
    FollowupCapturing = 5,
}

impl ConversationState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Capturing,
            2 => Self::Transcribing,
            3 => Self::Responding,
            4 => Self::AwaitingFollowup,
            5 => Self::FollowupCapturing,
            _ => Self::Idle,
        }
    }
}

/// Atomic CAS-based state machine shared across the audio loop and the
/// turn-processing task.
pub struct ConversationStateMachine {
    state: AtomicU8,
}

impl ConversationStateMachine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: AtomicU8::new(ConversationState::Idle as u8),
        })
    }

    pub fn current(&self) -> ConversationState {
        ConversationState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn cas(&self, from: ConversationState, to: ConversationState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// A wake event is accepted from `Idle` (the ordinary case) or from
    /// `AwaitingFollowup` (the user re-invokes the wake word during the
    /// follow-up window instead of just speaking) — both begin a fresh
    /// `Capturing` cycle. Ignored from every other state, matching "wake
    /// events are ignored while the controller is not in Idle or
    /// AwaitingFollowup" (§4.7).
    pub fn on_wake(&self) -> bool {
        self.cas(ConversationState::Idle, ConversationState::Capturing)
            || self.cas(ConversationState::AwaitingFollowup, ConversationState::Capturing)
    }

    /// Plain speech (no wake word) during the follow-up window starts a new
    /// capture without re-arming the wake detector's cooldown machinery.
    pub fn on_followup_speech(&self) -> bool {
        self.cas(
            ConversationState::AwaitingFollowup,
            ConversationState::FollowupCapturing,
        )
    }

    pub fn finish_capture_with_speech(&self) -> bool {
        self.cas(ConversationState::Capturing, ConversationState::Transcribing)
            || self.cas(
                ConversationState::FollowupCapturing,
                ConversationState::Transcribing,
            )
    }

    pub fn abort_capture_empty(&self) -> bool {
        self.cas(ConversationState::Capturing, ConversationState::Idle)
            || self.cas(ConversationState::FollowupCapturing, ConversationState::Idle)
    }

    pub fn enter_responding(&self) -> bool {
        self.cas(ConversationState::Transcribing, ConversationState::Responding)
    }

    pub fn finish_turn(&self) -> bool {
        self.cas(
            ConversationState::Responding,
            ConversationState::AwaitingFollowup,
        )
    }

    pub fn followup_timeout(&self) -> bool {
        self.cas(ConversationState::AwaitingFollowup, ConversationState::Idle)
    }

    /// Unconditional recovery path: any exception within a turn returns the
    /// controller to `Idle` without crashing the main loop (§4.7).
    pub fn reset_to_idle(&self) {
        self.state.store(ConversationState::Idle as u8, Ordering::Release);
    }

    /// Wake detection is enabled only while `Idle` (and during the
    /// follow-up window, since a fresh wake there is also accepted).
    pub fn wake_detection_should_be_enabled(&self) -> bool {
        matches!(
            self.current(),
            ConversationState::Idle | ConversationState::AwaitingFollowup
        )
    }
}

/// How long the controller waits in `AwaitingFollowup` before timing out
/// back to `Idle`.
pub const FOLLOWUP_TIMEOUT: Duration = Duration::from_secs(8);

/// Runs one full wake-triggered interaction: capture, transcribe, respond,
/// then either await a follow-up or return to Idle. Any error aborts the
/// turn back to `Idle` without propagating (§4.7, §7).
pub struct Controller {
    pub state: Arc<ConversationStateMachine>,
    pub session: Session,
    transcriptions: TranscriptionsLog,
}

impl Controller {
    pub fn new(
        state: Arc<ConversationStateMachine>,
        session: Session,
        transcriptions: TranscriptionsLog,
    ) -> Self {
        Self {
            state,
            session,
            transcriptions,
        }
    }

    /// Drives one turn after a `WakeEvent` fired. `source`/`vad`/`noise_floor`
    /// are the exclusively-audio-loop-owned components; this function is
    /// called from the audio loop itself so no additional synchronization is
    /// needed around them (§5).
    pub async fn run_turn(
        &mut self,
        _wake: WakeEvent,
        source: &mut FrameSource,
        vad: &mut VadGate,
        noise_floor: &mut NoiseFloor,
        stt: &SttAdapter,
        llm: &LlmAdapter,
        tts: &TtsAdapter,
        perf: &PerformanceLog,
    ) {
        if let Some(path) = crate::config::kwd_success_chime_path() {
            tts.play_chime(&path);
        }
        self.run_one_cycle(source, vad, noise_floor, stt, llm, tts, perf, false)
            .await;
    }

    /// Runs the follow-up capture/respond cycle after `AwaitingFollowup`
    /// detects speech.
    pub async fn run_followup(
        &mut self,
        source: &mut FrameSource,
        vad: &mut VadGate,
        noise_floor: &mut NoiseFloor,
        stt: &SttAdapter,
        llm: &LlmAdapter,
        tts: &TtsAdapter,
        perf: &PerformanceLog,
    ) {
        self.run_one_cycle(source, vad, noise_floor, stt, llm, tts, perf, true)
            .await;
    }

    async fn run_one_cycle(
        &mut self,
        source: &mut FrameSource,
        vad: &mut VadGate,
        noise_floor: &mut NoiseFloor,
        stt: &SttAdapter,
        llm: &LlmAdapter,
        tts: &TtsAdapter,
        perf: &PerformanceLog,
        is_followup: bool,
    ) {
        let capture_start = Instant::now();
        let trailing_silence = if is_followup {
            capture::FOLLOWUP_TRAILING_SILENCE
        } else {
            capture::WAKE_TRAILING_SILENCE
        };

        let utterance: UtteranceBuffer = match capture::capture_utterance(
            source,
            vad,
            noise_floor,
            trailing_silence,
        )
        .await
        {
            Ok(u) => u,
            Err(e) => {
                error!("capture failed: {e}");
                self.state.reset_to_idle();
                return;
            }
        };

        if utterance.is_empty() {
            info!("utterance empty, returning to Idle");
            self.state.abort_capture_empty();
            return;
        }

        if !self.state.finish_capture_with_speech() {
            warn!("unexpected state transition after non-empty capture");
        }

        perf.record("wake_to_transcription_start", capture_start.elapsed(), None);

        let transcribe_start = Instant::now();
        let text = match stt.transcribe(&utterance.0).await {
            Ok(t) => t,
            Err(e) => {
                error!("transcription failed: {e}");
                self.state.reset_to_idle();
                return;
            }
        };

        if text.trim().is_empty() {
            info!("empty transcription, returning to Idle");
            self.state.reset_to_idle();
            return;
        }

        self.transcriptions.record(&text);
        self.session.push_turn("user", &text);

        if !self.state.enter_responding() {
            warn!("unexpected state transition entering Responding");
        }

        let bridge_start = Instant::now();
        let prompt = self.build_prompt(&text);
        let outcome = bridge::run_streaming_turn(llm, tts, &prompt, perf).await;
        perf.record(
            "transcription_end_to_first_tts_chunk_request",
            bridge_start.elapsed(),
            None,
        );

        match outcome {
            Ok(full_text) => {
                self.session.push_turn("assistant", &full_text);
            }
            Err(e) => {
                error!("response generation failed: {e}");
            }
        }

        if !self.state.finish_turn() {
            warn!("unexpected state transition finishing turn");
        }
    }

    fn build_prompt(&self, user_text: &str) -> String {
        let mut prompt = String::new();
        prompt.push_str(&self.session.persona);
        prompt.push('\n');
        for turn in self.session.history() {
            prompt.push_str(&format!("{}: {}\n", turn.role, turn.text));
        }
        prompt.push_str(&format!("user: {user_text}\n"));
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let sm = ConversationStateMachine::new();
        assert_eq!(sm.current(), ConversationState::Idle);
    }

    #[test]
    fn wake_from_idle_transitions_to_capturing() {
        let sm = ConversationStateMachine::new();
        assert!(sm.on_wake());
        assert_eq!(sm.current(), ConversationState::Capturing);
    }

    #[test]
    fn wake_while_capturing_is_a_no_op() {
        let sm = ConversationStateMachine::new();
        assert!(sm.on_wake());
        assert!(!sm.on_wake());
        assert_eq!(sm.current(), ConversationState::Capturing);
    }

    #[test]
    fn empty_capture_returns_to_idle() {
        let sm = ConversationStateMachine::new();
        sm.on_wake();
        assert!(sm.abort_capture_empty());
        assert_eq!(sm.current(), ConversationState::Idle);
    }

    #[test]
    fn full_turn_reaches_awaiting_followup() {
        let sm = ConversationStateMachine::new();
        sm.on_wake();
        assert!(sm.finish_capture_with_speech());
        assert!(sm.enter_responding());
        assert!(sm.finish_turn());
        assert_eq!(sm.current(), ConversationState::AwaitingFollowup);
    }

    #[test]
    fn followup_timeout_returns_to_idle() {
        let sm = ConversationStateMachine::new();
        sm.on_wake();
        sm.finish_capture_with_speech();
        sm.enter_responding();
        sm.finish_turn();
        assert!(sm.followup_timeout());
        assert_eq!(sm.current(), ConversationState::Idle);
    }

    #[test]
    fn reset_to_idle_works_from_any_state() {
        let sm = ConversationStateMachine::new();
        sm.on_wake();
        sm.finish_capture_with_speech();
        sm.reset_to_idle();
        assert_eq!(sm.current(), ConversationState::Idle);
    }

    #[test]
    fn wake_detection_enabled_only_in_idle_or_awaiting_followup() {
        let sm = ConversationStateMachine::new();
        assert!(sm.wake_detection_should_be_enabled());
        sm.on_wake();
        assert!(!sm.wake_detection_should_be_enabled());
    }
}
