//! TTS Adapter: thin RPC wrapper around the TTS worker plus local playback.
//!
//! Playback is grounded on `voice-core::tts::playback::AudioPlayer` (rodio
//! sink, interruptible, `unsafe impl Send` justified the same way: the sink
//! is only ever touched from the single task that owns the `TtsAdapter`).

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tracing::{info, warn};

use crate::error::TransportError;

const TIMEOUT: Duration = Duration::from_secs(60);

pub struct TtsAdapter {
    client: reqwest::Client,
    base_url: String,
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
    sink: Arc<Sink>,
}

impl TtsAdapter {
    pub fn new(port: u16, _device_name: Option<&str>) -> anyhow::Result<Self> {
        // rodio has no device-by-name API on `OutputStream`; `_device_name`
        // is accepted for forward compatibility with a future cpal-backed
        // output path but the default output device is always used today.
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| anyhow::anyhow!("failed to open audio output: {e}"))?;
        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| anyhow::anyhow!("failed to create audio sink: {e}"))?;

        let client = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .build()
            .expect("reqwest client");

        Ok(Self {
            client,
            base_url: format!("http://127.0.0.1:{port}"),
            _stream: stream,
            _stream_handle: stream_handle,
            sink: Arc::new(sink),
        })
    }

    /// Precomputes model state on the worker side.
    pub async fn warmup(&self) -> Result<(), TransportError> {
        self.client
            .post(format!("{}/warmup", self.base_url))
            .send()
            .await
            .map_err(|e| TransportError::RpcFailure {
                service: "tts".into(),
                cause: e.to_string(),
            })?;
        Ok(())
    }

    /// Synthesizes `text` and queues it for playback. Blocks until the
    /// segment is queued, not until playback finishes (§4.9) — the
    /// synthesis RPC itself is the blocking part; `sink.append` is
    /// effectively instantaneous.
    pub async fn speak(&self, text: &str) -> Result<(), TransportError> {
        let resp = self
            .client
            .post(format!("{}/speak", self.base_url))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| TransportError::RpcFailure {
                service: "tts".into(),
                cause: e.to_string(),
            })?;

        let wav_bytes = resp.bytes().await.map_err(|e| TransportError::RpcFailure {
            service: "tts".into(),
            cause: e.to_string(),
        })?;

        let cursor = Cursor::new(wav_bytes.to_vec());
        match Decoder::new(cursor) {
            Ok(source) => self.sink.append(source),
            Err(e) => {
                return Err(TransportError::RpcFailure {
                    service: "tts".into(),
                    cause: format!("failed to decode synthesized audio: {e}"),
                })
            }
        }

        Ok(())
    }

    /// Plays a local WAV file (the wake chime) on the same sink used for
    /// synthesized speech. Non-fatal: a missing or undecodable file is
    /// logged and otherwise ignored, never propagated to the caller.
    pub fn play_chime(&self, path: &std::path::Path) {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to read chime file {}: {e}", path.display());
                return;
            }
        };
        match Decoder::new(Cursor::new(bytes)) {
            Ok(source) => self.sink.append(source),
            Err(e) => warn!("failed to decode chime file {}: {e}", path.display()),
        }
    }

    /// Aborts playback on the current device immediately.
    pub fn stop(&self) {
        self.sink.stop();
        info!("TTS playback stopped");
    }

    pub fn is_playing(&self) -> bool {
        !self.sink.empty()
    }
}

// SAFETY: OutputStream carries a non-Send marker on some platforms for COM
// apartment-threading reasons; the adapter is only ever driven from the
// single task that owns it (the conversation controller's turn loop).
unsafe impl Send for TtsAdapter {}
unsafe impl Sync for TtsAdapter {}
