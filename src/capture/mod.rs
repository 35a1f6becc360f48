//! Utterance Capturer: given an open frame source and a trailing-silence
//! timeout, records frames until silence accumulates past the timeout and
//! yields a single PCM buffer.
//!
//! Grounded on the `silence_start`/`Instant::elapsed` tracking in
//! `voice-core::main`'s audio task, generalized into a reusable component
//! parameterized on the trailing-silence duration.

use std::time::Duration;

use crate::audio::{Frame, FrameSource, FRAME_SAMPLES};
use crate::error::AudioError;
use crate::noise_floor::NoiseFloor;
use crate::vad::VadGate;

/// Post-wake capture: 3000 ms trailing silence.
pub const WAKE_TRAILING_SILENCE: Duration = Duration::from_millis(3000);
/// Follow-up capture: 4000 ms trailing silence.
pub const FOLLOWUP_TRAILING_SILENCE: Duration = Duration::from_millis(4000);

/// A contiguous PCM buffer produced by the capturer, possibly empty if the
/// user never spoke.
#[derive(Debug, Clone, Default)]
pub struct UtteranceBuffer(pub Vec<i16>);

impl UtteranceBuffer {
    /// Length in seconds, assuming 16 kHz mono.
    pub fn duration_secs(&self) -> f32 {
        self.0.len() as f32 / 16_000.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Pure per-frame bookkeeping for one capture, kept separate from the async
/// read loop so the "never spoke" / "spoke then fell silent" behavior is
/// testable without a live frame source.
struct CaptureAccumulator {
    buffer: Vec<i16>,
    silence_accum: Duration,
    heard_speech: bool,
    frame_duration: Duration,
    trailing_silence: Duration,
}

impl CaptureAccumulator {
    fn new(trailing_silence: Duration) -> Self {
        Self {
            buffer: Vec::with_capacity(FRAME_SAMPLES * 64),
            silence_accum: Duration::ZERO,
            heard_speech: false,
            frame_duration: Duration::from_millis(30),
            trailing_silence,
        }
    }

    /// Feed one frame's VAD verdict and samples. Only buffers samples once
    /// speech has been heard, so an utterance where the user never spoke
    /// stays empty (§4.5) instead of accumulating pure silence. Returns
    /// `true` once the trailing-silence timeout is reached.
    fn push(&mut self, frame: &Frame, is_speech: bool) -> bool {
        if is_speech {
            self.heard_speech = true;
            self.silence_accum = Duration::ZERO;
        } else {
            self.silence_accum += self.frame_duration;
        }

        if self.heard_speech {
            self.buffer.extend_from_slice(frame.as_slice());
        }

        self.silence_accum >= self.trailing_silence
    }

    fn finish(self) -> UtteranceBuffer {
        UtteranceBuffer(self.buffer)
    }
}

/// Records one utterance. Calls `noise_floor.lock()` on first detected
/// speech and `noise_floor.reset()` unconditionally before returning.
pub async fn capture_utterance(
    source: &mut FrameSource,
    vad: &mut VadGate,
    noise_floor: &mut NoiseFloor,
    trailing_silence: Duration,
) -> Result<UtteranceBuffer, AudioError> {
    let mut acc = CaptureAccumulator::new(trailing_silence);

    loop {
        let frame: Frame = source.read().await?;
        let threshold = noise_floor.get_threshold();
        let is_speech = vad.is_speech(&frame, threshold);

        if !acc.heard_speech {
            if is_speech {
                noise_floor.lock();
            } else {
                noise_floor.update(frame.rms());
            }
        }

        if acc.push(&frame, is_speech) {
            break;
        }
    }

    noise_floor.reset();
    Ok(acc.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{constant_frame, silent_frame};

    #[test]
    fn duration_secs_matches_sample_rate() {
        let buf = UtteranceBuffer(vec![0i16; 16_000]);
        assert!((buf.duration_secs() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_buffer_reports_zero_duration() {
        let buf = UtteranceBuffer::default();
        assert!(buf.is_empty());
        assert_eq!(buf.duration_secs(), 0.0);
    }

    #[test]
    fn never_hearing_speech_yields_an_empty_buffer() {
        let mut acc = CaptureAccumulator::new(Duration::from_millis(90));
        let silence = silent_frame();
        assert!(!acc.push(&silence, false));
        assert!(!acc.push(&silence, false));
        assert!(acc.push(&silence, false));
        let utterance = acc.finish();
        assert!(utterance.is_empty());
    }

    #[test]
    fn speech_then_trailing_silence_yields_a_non_empty_buffer() {
        let mut acc = CaptureAccumulator::new(Duration::from_millis(60));
        let loud = constant_frame(20_000);
        let silence = silent_frame();

        assert!(!acc.push(&loud, true));
        assert!(!acc.push(&loud, true));
        assert!(!acc.push(&silence, false));
        assert!(acc.push(&silence, false));

        let utterance = acc.finish();
        assert!(!utterance.is_empty());
        // Two speech frames plus two trailing-silence frames.
        assert_eq!(utterance.0.len(), FRAME_SAMPLES * 4);
    }

    #[test]
    fn stop_signal_fires_once_trailing_silence_elapses_even_without_speech() {
        let mut acc = CaptureAccumulator::new(Duration::from_millis(60));
        let silence = silent_frame();
        assert!(!acc.push(&silence, false));
        assert!(acc.push(&silence, false));
        assert!(acc.finish().is_empty());
    }
}
