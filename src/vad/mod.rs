//! VAD Gate: per-frame speech/non-speech decision combining a packet-VAD
//! library and an RMS check against the dynamic noise floor.
//!
//! Grounded on `voice-core::vad::energy`'s amplitude proxy (kept as the
//! always-available default) and the energy-fallback pattern in
//! `voice-core::vad::silero` (failure of the primary detector degrades to
//! the RMS-only path rather than propagating an error).

pub mod energy;
pub mod webrtc;

use tracing::debug;

use crate::audio::Frame;

/// Pluggable packet-level VAD. A real implementation may reject frames it
/// can't parse; the gate treats that as "fall back to RMS only", never as a
/// caller-visible error (§4.3).
pub trait PacketVad: Send {
    fn is_speech(&mut self, frame: &Frame) -> Result<bool, String>;
}

/// Below this mean-absolute-amplitude, `EnergyPacketVad` calls a frame
/// silence regardless of what the RMS check against the noise floor says.
const ENERGY_THRESHOLD: f32 = 0.02;

/// Default packet VAD when no real packet-VAD library is wired in: the
/// `energy::detect` amplitude proxy, the same fallback path the teacher
/// calls `energy_fallback`. Never errors — it has no parseable wire format
/// to reject frames on.
pub struct EnergyPacketVad;

impl PacketVad for EnergyPacketVad {
    fn is_speech(&mut self, frame: &Frame) -> Result<bool, String> {
        Ok(energy::detect(frame.as_slice()) > ENERGY_THRESHOLD)
    }
}

/// Combines a packet VAD with the dynamic noise floor's RMS threshold.
pub struct VadGate {
    packet_vad: Box<dyn PacketVad>,
}

impl VadGate {
    pub fn new(packet_vad: Box<dyn PacketVad>) -> Self {
        Self { packet_vad }
    }

    /// `speech ≡ packet_vad(frame) ∧ rms(frame) > threshold`. Packet VAD
    /// failure logs a debug diagnostic and falls back to RMS-only.
    pub fn is_speech(&mut self, frame: &Frame, threshold: f32) -> bool {
        let rms_speech = frame.rms() > threshold;
        match self.packet_vad.is_speech(frame) {
            Ok(packet_speech) => packet_speech && rms_speech,
            Err(e) => {
                debug!("packet VAD failed, falling back to RMS only: {e}");
                rms_speech
            }
        }
    }
}

impl Default for VadGate {
    fn default() -> Self {
        Self::new(Box::new(EnergyPacketVad))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{constant_frame, silent_frame};

    struct AlwaysErrVad;
    impl PacketVad for AlwaysErrVad {
        fn is_speech(&mut self, _frame: &Frame) -> Result<bool, String> {
            Err("malformed frame".into())
        }
    }

    struct AlwaysFalseVad;
    impl PacketVad for AlwaysFalseVad {
        fn is_speech(&mut self, _frame: &Frame) -> Result<bool, String> {
            Ok(false)
        }
    }

    #[test]
    fn energy_packet_vad_rejects_silence_on_its_own() {
        let mut vad = EnergyPacketVad;
        assert_eq!(vad.is_speech(&silent_frame()), Ok(false));
    }

    #[test]
    fn energy_packet_vad_accepts_a_loud_frame_on_its_own() {
        let mut vad = EnergyPacketVad;
        assert_eq!(vad.is_speech(&constant_frame(20_000)), Ok(true));
    }

    #[test]
    fn silence_is_not_speech() {
        let mut gate = VadGate::default();
        assert!(!gate.is_speech(&silent_frame(), 0.15));
    }

    #[test]
    fn loud_frame_above_threshold_is_speech() {
        let mut gate = VadGate::default();
        assert!(gate.is_speech(&constant_frame(20_000), 0.15));
    }

    #[test]
    fn packet_vad_rejection_overrides_loud_rms() {
        let mut gate = VadGate::new(Box::new(AlwaysFalseVad));
        assert!(!gate.is_speech(&constant_frame(20_000), 0.15));
    }

    #[test]
    fn packet_vad_failure_falls_back_to_rms_only() {
        let mut gate = VadGate::new(Box::new(AlwaysErrVad));
        assert!(gate.is_speech(&constant_frame(20_000), 0.15));
        assert!(!gate.is_speech(&silent_frame(), 0.15));
    }
}
