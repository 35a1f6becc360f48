//! Frame Source: opens a cpal input stream and delivers fixed 480-sample
//! (30 ms) frames of 16 kHz mono 16-bit PCM to a lock-free ring buffer.
//!
//! Grounded on `voice-core::audio::capture`'s device resolution, linear
//! resampling, and mono down-mix; resized here from 80 ms (1280-sample)
//! chunks to the 30 ms (480-sample) cadence this spec requires.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use tracing::{error, info};

use super::frame::FRAME_SAMPLES;
use super::spsc::SampleProducer;
use crate::error::AudioError;

/// Target sample rate for the processing pipeline.
const TARGET_SAMPLE_RATE: u32 = 16_000;

/// List available input device names.
pub fn list_devices() -> Vec<String> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    if let Ok(devices) = host.input_devices() {
        for dev in devices {
            if let Ok(name) = dev.name() {
                names.push(name);
            }
        }
    }
    names
}

struct CaptureConfig {
    device: cpal::Device,
    stream_config: StreamConfig,
    native_rate: u32,
}

fn resolve_device(device_name: Option<&str>) -> Result<CaptureConfig, AudioError> {
    let host = cpal::default_host();

    let device = if let Some(name) = device_name {
        host.input_devices()
            .map_err(|e| AudioError::Unavailable(format!("enumerate input devices: {e}")))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| AudioError::Unavailable(format!("input device not found: {name}")))?
    } else {
        host.default_input_device()
            .ok_or_else(|| AudioError::Unavailable("no default input device available".into()))?
    };

    let dev_name = device.name().unwrap_or_else(|_| "unknown".into());
    info!(device = %dev_name, "Selected input device");

    let default_config = device
        .default_input_config()
        .map_err(|e| AudioError::Unavailable(format!("default input config: {e}")))?;

    let native_rate = default_config.sample_rate().0;
    let channels = default_config.channels();

    let stream_config = StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(native_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    info!(
        native_rate,
        channels,
        "Input device config (will resample to {}Hz mono if needed)",
        TARGET_SAMPLE_RATE,
    );

    Ok(CaptureConfig {
        device,
        stream_config,
        native_rate,
    })
}

/// Simple linear resampler from `from_rate` to `to_rate`, mono f32.
fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return input.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((input.len() as f64) / ratio).floor() as usize;
    let mut output = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_idx = i as f64 * ratio;
        let idx0 = src_idx.floor() as usize;
        let frac = (src_idx - idx0 as f64) as f32;
        let s0 = input.get(idx0).copied().unwrap_or(0.0);
        let s1 = input.get(idx0 + 1).copied().unwrap_or(s0);
        output.push(s0 + frac * (s1 - s0));
    }
    output
}

/// Down-mix multi-channel audio to mono by averaging channels.
fn to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let ch = channels as usize;
    samples
        .chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

/// Owns the cpal input stream. Dropping it stops the stream — the scoped
/// resource guard required by §4.1 (all exit paths close the device).
pub struct CaptureGuard {
    stream: Stream,
}

impl CaptureGuard {
    pub fn pause(&self) -> Result<(), AudioError> {
        self.stream
            .pause()
            .map_err(|e| AudioError::Unavailable(format!("pause stream: {e}")))
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if let Err(e) = self.stream.pause() {
            error!("Failed to pause audio stream on drop: {e}");
        }
    }
}

/// Start audio capture. The returned `CaptureGuard` must be kept alive for
/// the duration of capture; dropping it closes the device. `device_name` of
/// `None` uses the system default input.
///
/// Audio is resampled to 16 kHz mono, converted to i16, and pushed into the
/// ring buffer producer in fixed 480-sample frames.
pub fn start_capture(
    mut producer: SampleProducer,
    device_name: Option<&str>,
) -> Result<CaptureGuard, AudioError> {
    let cfg = resolve_device(device_name)?;
    let native_rate = cfg.native_rate;
    let channels = cfg.stream_config.channels;
    let needs_resample = native_rate != TARGET_SAMPLE_RATE;
    let needs_downmix = channels > 1;

    let mut chunk_buf: Vec<f32> = Vec::with_capacity(FRAME_SAMPLES * 2);

    let stream = cfg
        .device
        .build_input_stream(
            &cfg.stream_config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                let mono = if needs_downmix {
                    to_mono(data, channels)
                } else {
                    data.to_vec()
                };

                let resampled = if needs_resample {
                    resample_linear(&mono, native_rate, TARGET_SAMPLE_RATE)
                } else {
                    mono
                };

                chunk_buf.extend_from_slice(&resampled);
                while chunk_buf.len() >= FRAME_SAMPLES {
                    let chunk: Vec<f32> = chunk_buf.drain(..FRAME_SAMPLES).collect();
                    let as_i16 = f32_to_i16(&chunk);
                    // Overflow is tolerated silently (§4.1); the consumer
                    // side simply sees fewer samples than were produced.
                    let _written = producer.push_slice(&as_i16);
                }
            },
            move |err| {
                error!("Audio input stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::Unavailable(format!("build input stream: {e}")))?;

    stream
        .play()
        .map_err(|e| AudioError::Unavailable(format!("start input stream: {e}")))?;

    info!("Audio capture started");

    Ok(CaptureGuard { stream })
}
