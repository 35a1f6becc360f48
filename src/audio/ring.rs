//! The wake detector's rolling window: the trailing 1 s (16 000 samples) of
//! audio, padded with silence at startup.

use super::frame::Frame;

const WINDOW_SAMPLES: usize = 16_000;

/// Fixed-capacity ring of the most recent 16 000 int16 samples.
///
/// Invariant: always holds exactly `WINDOW_SAMPLES` samples. On startup the
/// window is zero-filled; each appended frame displaces an equal number of
/// samples from the front.
pub struct FrameRing {
    buf: Vec<i16>,
}

impl FrameRing {
    pub fn new() -> Self {
        Self {
            buf: vec![0i16; WINDOW_SAMPLES],
        }
    }

    /// Append a frame's samples, dropping the oldest `frame.len()` samples.
    pub fn push_frame(&mut self, frame: &Frame) {
        let samples = frame.as_slice();
        self.buf.drain(..samples.len());
        self.buf.extend_from_slice(samples);
        debug_assert_eq!(self.buf.len(), WINDOW_SAMPLES);
    }

    /// The full trailing window, always exactly 16 000 samples.
    pub fn window(&self) -> &[i16] {
        &self.buf
    }
}

impl Default for FrameRing {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::frame::FRAME_SAMPLES;

    #[test]
    fn starts_zero_padded_at_full_length() {
        let ring = FrameRing::new();
        assert_eq!(ring.window().len(), WINDOW_SAMPLES);
        assert!(ring.window().iter().all(|&s| s == 0));
    }

    #[test]
    fn always_holds_exactly_window_samples_after_pushes() {
        let mut ring = FrameRing::new();
        for i in 0..50 {
            let samples = vec![i as i16; FRAME_SAMPLES];
            let frame = Frame::try_from(samples.as_slice()).unwrap();
            ring.push_frame(&frame);
            assert_eq!(ring.window().len(), WINDOW_SAMPLES);
        }
    }

    #[test]
    fn newest_samples_land_at_the_tail() {
        let mut ring = FrameRing::new();
        let samples = vec![7i16; FRAME_SAMPLES];
        let frame = Frame::try_from(samples.as_slice()).unwrap();
        ring.push_frame(&frame);
        let tail = &ring.window()[WINDOW_SAMPLES - FRAME_SAMPLES..];
        assert!(tail.iter().all(|&s| s == 7));
    }
}
