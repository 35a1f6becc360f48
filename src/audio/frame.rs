//! The fixed-size audio frame: 30 ms of 16 kHz mono 16-bit PCM.

use crate::error::AudioError;

/// Samples per frame: 480 = 30 ms at 16 kHz.
pub const FRAME_SAMPLES: usize = 480;

/// Exactly 480 samples of signed 16-bit PCM, mono. Never partial.
#[derive(Debug, Clone, Copy)]
pub struct Frame([i16; FRAME_SAMPLES]);

impl Frame {
    pub fn samples(&self) -> &[i16; FRAME_SAMPLES] {
        &self.0
    }

    pub fn as_slice(&self) -> &[i16] {
        &self.0
    }

    /// RMS amplitude normalized to [-1, 1].
    pub fn rms(&self) -> f32 {
        rms_i16(&self.0)
    }
}

impl TryFrom<&[i16]> for Frame {
    type Error = AudioError;

    fn try_from(value: &[i16]) -> Result<Self, Self::Error> {
        if value.len() != FRAME_SAMPLES {
            return Err(AudioError::MalformedFrame(format!(
                "expected {FRAME_SAMPLES} samples, got {}",
                value.len()
            )));
        }
        let mut buf = [0i16; FRAME_SAMPLES];
        buf.copy_from_slice(value);
        Ok(Frame(buf))
    }
}

/// RMS over samples normalized to [-1, 1].
pub fn rms_i16(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples
        .iter()
        .map(|&s| {
            let n = s as f64 / i16::MAX as f64;
            n * n
        })
        .sum();
    ((sum_sq / samples.len() as f64).sqrt()) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        let short = vec![0i16; 100];
        assert!(Frame::try_from(short.as_slice()).is_err());
    }

    #[test]
    fn accepts_exact_length() {
        let exact = vec![0i16; FRAME_SAMPLES];
        let frame = Frame::try_from(exact.as_slice()).unwrap();
        assert_eq!(frame.as_slice().len(), FRAME_SAMPLES);
    }

    #[test]
    fn rms_of_silence_is_zero() {
        let silence = [0i16; FRAME_SAMPLES];
        let frame = Frame::try_from(&silence[..]).unwrap();
        assert_eq!(frame.rms(), 0.0);
    }

    #[test]
    fn rms_of_full_scale_is_near_one() {
        let loud = [i16::MAX; FRAME_SAMPLES];
        let frame = Frame::try_from(&loud[..]).unwrap();
        assert!((frame.rms() - 1.0).abs() < 1e-3);
    }
}
