//! Audio ingestion: frame source, ring buffers, and the frame type.

pub mod capture;
pub mod frame;
pub mod ring;
pub mod spsc;

pub use frame::{Frame, FRAME_SAMPLES};
pub use ring::FrameRing;

use std::time::Duration;

use tokio::time::sleep;

use crate::error::AudioError;
use capture::CaptureGuard;
use spsc::{sample_ring, SampleConsumer, SampleProducer};

/// How long `read()` polls before giving up and reporting `Unavailable`.
const READ_TIMEOUT: Duration = Duration::from_millis(200);
/// Poll granularity while waiting for a full frame to accumulate.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Opens a capture stream and exposes blocking (async) reads of exactly one
/// 480-sample frame at a time. Holds the scoped `CaptureGuard`; dropping the
/// `FrameSource` closes the device on every exit path.
pub struct FrameSource {
    _guard: CaptureGuard,
    consumer: SampleConsumer,
    scratch: Vec<i16>,
}

impl FrameSource {
    pub fn open(device_name: Option<&str>) -> Result<Self, AudioError> {
        let (producer, consumer) = sample_ring(None);
        let guard = capture::start_capture(producer, device_name)?;
        Ok(Self {
            _guard: guard,
            consumer,
            scratch: Vec::with_capacity(FRAME_SAMPLES),
        })
    }

    /// Construct directly from an already-open producer/consumer pair and
    /// guard — used by callers that want to wire the producer elsewhere
    /// (e.g. tests feeding synthetic samples through the producer).
    pub fn from_parts(guard: CaptureGuard, consumer: SampleConsumer) -> Self {
        Self {
            _guard: guard,
            consumer,
            scratch: Vec::with_capacity(FRAME_SAMPLES),
        }
    }

    /// Read exactly one frame, waiting for samples to accumulate. Returns
    /// `AudioError::Unavailable` (recoverable) if no full frame arrives
    /// within the read timeout.
    pub async fn read(&mut self) -> Result<Frame, AudioError> {
        let deadline = tokio::time::Instant::now() + READ_TIMEOUT;
        while self.scratch.len() < FRAME_SAMPLES {
            let available = self.consumer.available();
            if available > 0 {
                let want = FRAME_SAMPLES - self.scratch.len();
                let mut buf = vec![0i16; want.min(available)];
                let n = self.consumer.pop_slice(&mut buf);
                self.scratch.extend_from_slice(&buf[..n]);
            }
            if self.scratch.len() >= FRAME_SAMPLES {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AudioError::Unavailable(
                    "no full frame available within read timeout".into(),
                ));
            }
            sleep(POLL_INTERVAL).await;
        }
        let frame_samples: Vec<i16> = self.scratch.drain(..FRAME_SAMPLES).collect();
        Frame::try_from(frame_samples.as_slice())
    }
}

#[cfg(test)]
pub use self::test_support::*;

#[cfg(test)]
mod test_support {
    //! Helpers used only by tests elsewhere in the crate to synthesize
    //! frames without opening a real cpal device.
    use super::*;

    /// Build a frame of constant-amplitude samples, for deterministic tests.
    pub fn constant_frame(amplitude: i16) -> Frame {
        let samples = vec![amplitude; FRAME_SAMPLES];
        Frame::try_from(samples.as_slice()).expect("constant frame is exact length")
    }

    /// Build a silent frame.
    pub fn silent_frame() -> Frame {
        constant_frame(0)
    }
}
