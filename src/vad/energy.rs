//! Mean-absolute-amplitude energy proxy, normalized to [-1, 1].
//!
//! Not the VAD gate's decision path itself (that lives in `super::VadGate`
//! and already has its own RMS check) — this is kept as a diagnostic/testing
//! utility, grounded on `voice-core::vad::energy`.

pub fn detect(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples
        .iter()
        .map(|&s| (s as f64 / i16::MAX as f64).abs())
        .sum();
    (sum / samples.len() as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_has_zero_energy() {
        assert_eq!(detect(&[0; 480]), 0.0);
    }

    #[test]
    fn full_scale_has_energy_near_one() {
        let samples = vec![i16::MAX; 480];
        assert!((detect(&samples) - 1.0).abs() < 1e-3);
    }
}
