//! Streaming Bridge: accumulates LLM token events into synthesis-sized text
//! units and forwards them to the TTS adapter in order, falling back to
//! whole-response synthesis if the stream never starts.
//!
//! Grounded on the event-accumulation shape of `Coldaine-ColdVox`'s
//! `StreamingSttProcessor` (state carried across a tagged event stream) and
//! the teacher's `speak_text` TTS submission ordering guarantee.

use std::time::Instant;

use futures_util::StreamExt;
use tracing::{debug, error, warn};

use crate::error::{CoreError, TransportError};
use crate::logging::performance::PerformanceLog;
use crate::workers::llm::{LlmAdapter, TokenEvent};
use crate::workers::tts::TtsAdapter;

/// Default chunk size threshold (chars).
pub const DEFAULT_MIN_CHUNK_SIZE: usize = 80;

/// Pure chunk-accumulation state machine — the part of §4.6 testable
/// without a network round trip.
pub struct StreamingBridge {
    accumulator: String,
    chunks_emitted: usize,
    min_chunk_size: usize,
    sentence_boundary: bool,
}

impl StreamingBridge {
    pub fn new(min_chunk_size: usize, sentence_boundary: bool) -> Self {
        Self {
            accumulator: String::new(),
            chunks_emitted: 0,
            min_chunk_size,
            sentence_boundary,
        }
    }

    fn should_emit(&self) -> bool {
        if self.accumulator.len() >= self.min_chunk_size {
            return true;
        }
        if self.sentence_boundary {
            if let Some(last) = self.accumulator.chars().last() {
                if matches!(last, '.' | '?' | '!') {
                    return true;
                }
            }
        }
        false
    }

    /// Append a chunk of streamed text. Returns the text to forward to TTS
    /// if the chunking rule fired, draining the accumulator.
    pub fn on_chunk(&mut self, text: &str) -> Option<String> {
        self.accumulator.push_str(text);
        if self.should_emit() && !self.accumulator.is_empty() {
            self.chunks_emitted += 1;
            Some(std::mem::take(&mut self.accumulator))
        } else {
            None
        }
    }

    /// Called on `Complete`/`Error`: flush whatever remains.
    pub fn flush(&mut self) -> Option<String> {
        if self.accumulator.is_empty() {
            None
        } else {
            self.chunks_emitted += 1;
            Some(std::mem::take(&mut self.accumulator))
        }
    }

    pub fn chunks_emitted(&self) -> usize {
        self.chunks_emitted
    }
}

/// Drives one streaming turn end to end: consumes the LLM token stream,
/// forwards chunks to TTS in order, and returns the authoritative response
/// text (`Complete.full_text`, or the partial text recovered on error).
///
/// On transport failure to even start the stream, falls back to the
/// whole-response path.
pub async fn run_streaming_turn(
    llm: &LlmAdapter,
    tts: &TtsAdapter,
    prompt: &str,
    perf: &PerformanceLog,
) -> Result<String, CoreError> {
    let turn_start = Instant::now();

    let mut stream = match llm
        .respond_stream(prompt, DEFAULT_MIN_CHUNK_SIZE, true)
        .await
    {
        Ok(s) => s,
        Err(e) => {
            warn!("LLM stream failed to start ({e}), falling back to whole-response");
            return whole_response_fallback(llm, tts, prompt).await;
        }
    };

    let mut bridge = StreamingBridge::new(DEFAULT_MIN_CHUNK_SIZE, true);
    let mut chunk_log: Vec<String> = Vec::new();

    while let Some(event) = stream.next().await {
        match event {
            TokenEvent::Intent { .. } => {}
            TokenEvent::FirstToken { elapsed_ms } => {
                perf.record(
                    "llm_first_token_elapsed",
                    std::time::Duration::from_millis(elapsed_ms),
                    None,
                );
            }
            TokenEvent::Chunk { text } => {
                chunk_log.push(text.clone());
                if let Some(to_speak) = bridge.on_chunk(&text) {
                    if let Err(e) = tts.speak(&to_speak).await {
                        error!("tts submission failed: {e}");
                    }
                }
            }
            TokenEvent::Complete { full_text, metrics } => {
                if let Some(tail) = bridge.flush() {
                    if let Err(e) = tts.speak(&tail).await {
                        error!("tts submission failed: {e}");
                    }
                }
                let concatenated: String = chunk_log.concat();
                if concatenated.len() != full_text.len() {
                    debug!(
                        "complete.full_text length ({}) differs from concatenated chunks ({})",
                        full_text.len(),
                        concatenated.len()
                    );
                }
                perf.record(
                    "turn_total",
                    turn_start.elapsed(),
                    Some(format!("tokens={}", metrics.total_tokens)),
                );
                return Ok(full_text);
            }
            TokenEvent::Error { message } => {
                warn!("LLM stream error: {message}, falling back to whole-response");
                return match whole_response_fallback(llm, tts, prompt).await {
                    Ok(text) => Ok(text),
                    Err(e) => {
                        warn!("non-streaming fallback also failed ({e}), speaking buffered partial text");
                        let partial = if let Some(tail) = bridge.flush() {
                            if let Err(e) = tts.speak(&tail).await {
                                error!("tts submission failed: {e}");
                            }
                            tail
                        } else {
                            String::new()
                        };
                        Ok(partial)
                    }
                };
            }
        }
    }

    // Stream ended without a terminal event — treat as partial.
    let partial = bridge.flush().unwrap_or_default();
    Ok(partial)
}

async fn whole_response_fallback(
    llm: &LlmAdapter,
    tts: &TtsAdapter,
    prompt: &str,
) -> Result<String, CoreError> {
    let (text, _metrics) = llm
        .respond(prompt)
        .await
        .map_err(CoreError::Transport)?;
    if !text.is_empty() {
        tts.speak(&text).await.map_err(CoreError::Transport)?;
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_when_accumulator_reaches_min_size() {
        let mut bridge = StreamingBridge::new(5, false);
        assert!(bridge.on_chunk("ab").is_none());
        let emitted = bridge.on_chunk("cdef").unwrap();
        assert_eq!(emitted, "abcdef");
        assert_eq!(bridge.chunks_emitted(), 1);
    }

    #[test]
    fn sentence_boundary_mode_emits_on_punctuation_before_min_size() {
        let mut bridge = StreamingBridge::new(80, true);
        let emitted = bridge.on_chunk("Hi there.").unwrap();
        assert_eq!(emitted, "Hi there.");
    }

    #[test]
    fn zero_threshold_emits_every_chunk_as_its_own_submission() {
        let mut bridge = StreamingBridge::new(0, false);
        assert_eq!(bridge.on_chunk("a").unwrap(), "a");
        assert_eq!(bridge.on_chunk("b").unwrap(), "b");
        assert_eq!(bridge.chunks_emitted(), 2);
    }

    #[test]
    fn threshold_larger_than_response_emits_once_from_flush() {
        let mut bridge = StreamingBridge::new(1000, false);
        assert!(bridge.on_chunk("Hello ").is_none());
        assert!(bridge.on_chunk("there, how are you?").is_none());
        let tail = bridge.flush().unwrap();
        assert_eq!(tail, "Hello there, how are you?");
        assert_eq!(bridge.chunks_emitted(), 1);
    }

    #[test]
    fn flush_on_empty_accumulator_emits_nothing() {
        let mut bridge = StreamingBridge::new(10, false);
        assert!(bridge.flush().is_none());
    }

    #[test]
    fn partial_text_after_error_is_whatever_was_buffered() {
        let mut bridge = StreamingBridge::new(1000, false);
        bridge.on_chunk("Hello ");
        bridge.on_chunk("there, ");
        bridge.on_chunk("how ");
        let partial = bridge.flush().unwrap();
        assert_eq!(partial, "Hello there, how ");
    }
}
