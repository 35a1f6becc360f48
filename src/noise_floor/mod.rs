//! Dynamic Noise Floor: a rolling RMS baseline over non-speech frames,
//! exposing a live threshold that the VAD gate compares frames against.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Fallback threshold used until the window has collected any samples.
const FALLBACK_THRESHOLD: f32 = 0.15;
/// Default multiplier applied to the window mean.
const DEFAULT_MULTIPLIER: f32 = 2.0;
/// Default window: 3 s at 30 ms frames ≈ 100 samples.
const DEFAULT_CAPACITY: usize = 100;

/// Cross-task readable threshold, written exclusively by the audio loop.
///
/// The window itself (`VecDeque`) is only ever touched from the audio loop
/// task (§5: "only mutated from the audio loop; other tasks may read the
/// threshold but must not write"), so it needs no synchronization of its
/// own. The threshold is republished to an `Arc<AtomicU32>` (bit-cast f32)
/// after every update so other tasks (e.g. the wake detector, if it runs on
/// a different task in a future revision) can read it lock-free.
pub struct NoiseFloor {
    window: VecDeque<f32>,
    capacity: usize,
    multiplier: f32,
    locked: bool,
    threshold: Arc<AtomicU32>,
}

impl NoiseFloor {
    pub fn new() -> Self {
        Self::with_params(DEFAULT_CAPACITY, DEFAULT_MULTIPLIER)
    }

    pub fn with_params(capacity: usize, multiplier: f32) -> Self {
        let threshold = Arc::new(AtomicU32::new(FALLBACK_THRESHOLD.to_bits()));
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            multiplier,
            locked: false,
            threshold,
        }
    }

    /// A cheap, cloneable handle other tasks can use to read the current
    /// threshold without touching the window.
    pub fn threshold_handle(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.threshold)
    }

    /// Feed one RMS value from a frame the VAD gate classified as non-speech.
    /// No-op while locked.
    pub fn update(&mut self, rms: f32) {
        if self.locked {
            return;
        }
        if self.window.len() >= self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(rms);
        self.recompute();
    }

    fn recompute(&mut self) {
        let threshold = if self.window.is_empty() {
            FALLBACK_THRESHOLD
        } else {
            let mean: f32 = self.window.iter().sum::<f32>() / self.window.len() as f32;
            mean * self.multiplier
        };
        self.threshold.store(threshold.to_bits(), Ordering::Release);
    }

    /// Current threshold.
    pub fn get_threshold(&self) -> f32 {
        f32::from_bits(self.threshold.load(Ordering::Acquire))
    }

    /// Freeze the threshold during active speech capture so a loud
    /// utterance doesn't inflate the noise floor.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Resume updates and clear the window. Called on capture completion.
    pub fn reset(&mut self) {
        self.locked = false;
        self.window.clear();
        self.threshold
            .store(FALLBACK_THRESHOLD.to_bits(), Ordering::Release);
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }
}

impl Default for NoiseFloor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_threshold_when_window_empty() {
        let nf = NoiseFloor::new();
        assert_eq!(nf.get_threshold(), FALLBACK_THRESHOLD);
    }

    #[test]
    fn threshold_is_mean_times_multiplier() {
        let mut nf = NoiseFloor::with_params(10, 2.0);
        nf.update(0.1);
        nf.update(0.3);
        // mean = 0.2, threshold = 0.4
        assert!((nf.get_threshold() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn window_drops_oldest_past_capacity() {
        let mut nf = NoiseFloor::with_params(2, 1.0);
        nf.update(1.0);
        nf.update(2.0);
        nf.update(3.0);
        assert_eq!(nf.window_len(), 2);
        // mean of [2.0, 3.0] = 2.5
        assert!((nf.get_threshold() - 2.5).abs() < 1e-6);
    }

    #[test]
    fn lock_suspends_updates() {
        let mut nf = NoiseFloor::with_params(10, 2.0);
        nf.update(0.1);
        nf.lock();
        nf.update(10.0);
        assert_eq!(nf.window_len(), 1);
    }

    #[test]
    fn reset_clears_window_and_unlocks() {
        let mut nf = NoiseFloor::with_params(10, 2.0);
        nf.update(0.1);
        nf.lock();
        nf.reset();
        assert_eq!(nf.window_len(), 0);
        assert_eq!(nf.get_threshold(), FALLBACK_THRESHOLD);
        nf.update(1.0);
        assert_eq!(nf.window_len(), 1);
    }
}
