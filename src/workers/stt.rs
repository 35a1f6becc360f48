//! STT Adapter: thin RPC wrapper around the STT worker.
//!
//! The WAV encoding helper is grounded on `voice-core::stt::cloud::encode_wav`
//! (manual 16-bit PCM WAV header construction for multipart upload).

use std::time::Duration;

use reqwest::multipart;
use serde::Deserialize;
use tracing::debug;

use crate::error::TransportError;

const TIMEOUT: Duration = Duration::from_secs(60);
/// Minimum utterance length; shorter inputs return empty string without an
/// RPC call (§4.9, resolved per SPEC_FULL §9: rejected at the adapter).
const MIN_SAMPLES: usize = 8_000; // 0.5s at 16kHz

#[derive(Deserialize)]
struct TranscribeResponse {
    text: String,
}

pub struct SttAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl SttAdapter {
    pub fn new(port: u16) -> Self {
        let client = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .build()
            .expect("reqwest client");
        Self {
            client,
            base_url: format!("http://127.0.0.1:{port}"),
        }
    }

    /// `transcribe(pcm) -> text`. Inputs shorter than 0.5s return empty
    /// string without contacting the worker.
    pub async fn transcribe(&self, pcm: &[i16]) -> Result<String, TransportError> {
        if pcm.len() < MIN_SAMPLES {
            debug!(
                samples = pcm.len(),
                "utterance shorter than 0.5s, skipping STT call"
            );
            return Ok(String::new());
        }

        let wav_bytes = encode_wav(pcm, 16_000);
        let part = multipart::Part::bytes(wav_bytes)
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| TransportError::RpcFailure {
                service: "stt".into(),
                cause: e.to_string(),
            })?;
        let form = multipart::Form::new().part("audio", part);

        let resp = self
            .client
            .post(format!("{}/transcribe", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::RpcFailure {
                service: "stt".into(),
                cause: e.to_string(),
            })?;

        let body: TranscribeResponse = resp.json().await.map_err(|e| TransportError::RpcFailure {
            service: "stt".into(),
            cause: e.to_string(),
        })?;

        Ok(body.text)
    }
}

/// Build a minimal 16-bit PCM mono WAV file in memory.
fn encode_wav(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let byte_rate = sample_rate * 2;
    let mut out = Vec::with_capacity(44 + data_len as usize);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for &s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_header_reports_correct_lengths() {
        let samples = vec![0i16; 100];
        let wav = encode_wav(&samples, 16_000);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        let data_len = u32::from_le_bytes(wav[40..44].try_into().unwrap());
        assert_eq!(data_len, 200);
        assert_eq!(wav.len(), 44 + 200);
    }

    #[tokio::test]
    async fn short_utterance_skips_the_rpc_call() {
        let adapter = SttAdapter::new(65535);
        let short = vec![0i16; 100];
        let text = adapter.transcribe(&short).await.unwrap();
        assert_eq!(text, "");
    }
}
