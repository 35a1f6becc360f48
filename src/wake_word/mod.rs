//! Wake Detector: 1-second sliding-window inference over gated frames.
//!
//! Grounded on `voice-core::wake_word::oww`'s 3-stage ONNX pipeline, adapted
//! to this spec's fixed 16 000-sample window and 0.77 / 2.0 s cooldown
//! constants (the teacher uses its own unrelated constants for a different
//! wake word).

mod pipeline;

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::info;

use crate::audio::{Frame, FrameRing};
use crate::error::ResourceError;
use pipeline::Pipeline;

/// Score threshold above which a wake event fires.
pub const DETECTION_THRESHOLD: f32 = 0.77;
/// Suppression window after a wake event.
pub const COOLDOWN: Duration = Duration::from_millis(2000);

/// `{scores: model -> confidence, window: the triggering 1 s buffer}`.
#[derive(Debug, Clone)]
pub struct WakeEvent {
    pub scores: HashMap<String, f32>,
    pub window: Vec<i16>,
}

pub struct WakeDetector {
    wakeword: String,
    pipeline: Pipeline,
    ring: FrameRing,
    enabled: bool,
    cooldown_until: Option<Instant>,
}

impl WakeDetector {
    /// Loads the classifier named `models/<wakeword>.onnx`; missing file is
    /// fatal (`ResourceError::Missing`), per spec §6. Detection starts
    /// disabled — the caller enables it once downstream services are ready.
    pub fn load(models_dir: &Path, wakeword: &str) -> Result<Self, ResourceError> {
        let pipeline = Pipeline::load(models_dir, wakeword)?;
        Ok(Self {
            wakeword: wakeword.to_string(),
            pipeline,
            ring: FrameRing::new(),
            enabled: false,
            cooldown_until: None,
        })
    }

    pub fn enable(&mut self) {
        info!("Wake detector enabled");
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Step 1-7 of §4.4, run once per frame. `noise_floor_threshold` and
    /// `is_speech` are the already-computed outputs of the noise floor and
    /// VAD gate for this frame.
    pub fn process(
        &mut self,
        frame: &Frame,
        noise_floor_threshold: f32,
        is_speech: bool,
        now: Instant,
    ) -> Option<WakeEvent> {
        self.ring.push_frame(frame);

        if !self.enabled {
            return None;
        }
        if let Some(until) = self.cooldown_until {
            if now < until {
                return None;
            }
        }
        if frame.rms() <= noise_floor_threshold {
            return None;
        }
        if !is_speech {
            return None;
        }

        let window = self.ring.window().to_vec();
        let score = match self.pipeline.score(&window) {
            Ok(score) => score,
            Err(e) => {
                tracing::warn!("wake word inference error: {e}");
                return None;
            }
        };

        if score > DETECTION_THRESHOLD {
            self.cooldown_until = Some(now + COOLDOWN);
            let mut scores = HashMap::new();
            scores.insert(self.wakeword.clone(), score);
            Some(WakeEvent { scores, window })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(not(feature = "onnx"))]
    use crate::audio::{constant_frame, silent_frame};
    #[cfg(not(feature = "onnx"))]
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn missing_classifier_is_fatal() {
        let dir = tempdir().unwrap();
        let err = WakeDetector::load(dir.path(), "missing_word");
        assert!(matches!(err, Err(ResourceError::Missing { .. })));
    }

    // The tests below load placeholder `.onnx` files containing a single
    // zero byte. Only the non-onnx stub pipeline (`pipeline::inner` under
    // `#[cfg(not(feature = "onnx"))]`) tolerates that as "loaded"; the real
    // `ort`-backed pipeline this crate builds by default fails to parse it,
    // so these are stub-only.
    #[cfg(not(feature = "onnx"))]
    fn touch(path: &Path) {
        std::fs::write(path, b"\0").unwrap();
    }

    #[cfg(not(feature = "onnx"))]
    fn loaded_detector(dir: &Path) -> WakeDetector {
        touch(&dir.join("melspectrogram.onnx"));
        touch(&dir.join("embedding_model.onnx"));
        touch(&dir.join("test_word.onnx"));
        let mut d = WakeDetector::load(dir, "test_word").unwrap();
        d.enable();
        d
    }

    #[test]
    #[cfg(not(feature = "onnx"))]
    fn disabled_detector_never_triggers() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("melspectrogram.onnx"));
        touch(&dir.path().join("embedding_model.onnx"));
        touch(&dir.path().join("test_word.onnx"));
        let mut d = WakeDetector::load(dir.path(), "test_word").unwrap();
        assert!(!d.is_enabled());
        let now = Instant::now();
        let event = d.process(&constant_frame(20_000), 0.1, true, now);
        assert!(event.is_none());
    }

    #[test]
    #[cfg(not(feature = "onnx"))]
    fn silence_below_threshold_never_scores() {
        let dir = tempdir().unwrap();
        let mut d = loaded_detector(dir.path());
        let now = Instant::now();
        let event = d.process(&silent_frame(), 0.15, false, now);
        assert!(event.is_none());
    }

    #[test]
    #[cfg(not(feature = "onnx"))]
    fn ring_always_holds_full_window_regardless_of_gating() {
        let dir = tempdir().unwrap();
        let mut d = loaded_detector(dir.path());
        let now = Instant::now();
        for _ in 0..40 {
            d.process(&silent_frame(), 0.15, false, now);
        }
        assert_eq!(d.ring.window().len(), 16_000);
    }

    #[test]
    #[cfg(not(feature = "onnx"))]
    fn cooldown_suppresses_a_second_event_within_window() {
        let dir = tempdir().unwrap();
        let mut d = loaded_detector(dir.path());
        // The stub/zero-weight pipeline never actually scores above
        // threshold, so directly exercise the cooldown gate logic.
        let now = Instant::now();
        d.cooldown_until = Some(now + Duration::from_millis(500));
        let event = d.process(&constant_frame(20_000), 0.1, true, now);
        assert!(event.is_none());
    }
}
