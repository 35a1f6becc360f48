//! Packet VAD backed by the `webrtc-vad` crate (the G.729-derived detector
//! shipped with WebRTC), the concrete packet-VAD library choice noted in
//! SPEC_FULL §9 — grounded on `Lelouch2131-BTW-daemon`'s Cargo.toml, the
//! only example repo in the pack that depends on it.

use tracing::debug;
use webrtc_vad::{SampleRate, Vad, VadMode};

use crate::audio::Frame;
use crate::vad::PacketVad;

pub struct WebrtcPacketVad {
    vad: Vad,
}

impl WebrtcPacketVad {
    pub fn new() -> Self {
        let mut vad = Vad::new_with_rate(SampleRate::Rate16kHz);
        vad.set_mode(VadMode::Quality);
        Self { vad }
    }
}

impl Default for WebrtcPacketVad {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketVad for WebrtcPacketVad {
    fn is_speech(&mut self, frame: &Frame) -> Result<bool, String> {
        self.vad
            .is_voice_segment(frame.as_slice())
            .map_err(|e| format!("webrtc-vad rejected frame: {e:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::silent_frame;

    #[test]
    fn constructs_without_panicking() {
        let mut vad = WebrtcPacketVad::new();
        // The real detector may classify a synthetic silent frame either
        // way; this only asserts it returns without propagating a panic.
        let _ = vad.is_speech(&silent_frame());
        debug!("smoke test done");
    }
}
