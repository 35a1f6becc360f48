//! The 3-stage ONNX inference pipeline: audio -> mel spectrogram -> embedding
//! -> wake-word score. Grounded on `voice-core::wake_word::oww`'s
//! `OpenWakeWord`, adapted from 80 ms streaming chunks to scoring the full
//! fixed 16 000-sample (1 s) window this spec's `WakeDetector` maintains.
//!
//! The two feature-extraction stages are fixed framework assets shipped
//! alongside the binary; the classifier is the per-wakeword model named in
//! `models/<wakeword>.onnx` (missing file is fatal, per spec §6).

use std::path::Path;

use crate::error::ResourceError;

#[cfg(feature = "onnx")]
mod inner {
    use super::*;
    use ort::session::Session;

    pub struct Pipeline {
        mel_session: Session,
        embed_session: Session,
        classifier: Session,
    }

    impl Pipeline {
        pub fn load(models_dir: &Path, wakeword: &str) -> Result<Self, ResourceError> {
            let mel_path = models_dir.join("melspectrogram.onnx");
            let embed_path = models_dir.join("embedding_model.onnx");
            let classifier_path = models_dir.join(format!("{wakeword}.onnx"));

            for path in [&mel_path, &embed_path, &classifier_path] {
                if !path.exists() {
                    return Err(ResourceError::Missing { path: path.clone() });
                }
            }

            let load = |path: &Path| -> Result<Session, ResourceError> {
                Session::builder()
                    .and_then(|b| b.with_intra_threads(1))
                    .and_then(|b| b.with_inter_threads(1))
                    .and_then(|b| b.commit_from_file(path))
                    .map_err(|e| ResourceError::ConfigUnreadable {
                        path: path.to_path_buf(),
                        cause: e.to_string(),
                    })
            };

            Ok(Self {
                mel_session: load(&mel_path)?,
                embed_session: load(&embed_path)?,
                classifier: load(&classifier_path)?,
            })
        }

        /// Score the full 16 000-sample window in 1280-sample sub-chunks
        /// (the classifier's native granularity), returning the maximum
        /// score observed across the window.
        pub fn score(&mut self, window: &[i16]) -> Result<f32, String> {
            const SUB_CHUNK: usize = 1280;
            let floats: Vec<f32> = window.iter().map(|&s| s as f32 / i16::MAX as f32).collect();

            let mut embeddings: Vec<Vec<f32>> = Vec::new();
            for chunk in floats.chunks(SUB_CHUNK) {
                if chunk.len() < SUB_CHUNK {
                    continue;
                }
                let embedding = self.embed_chunk(chunk)?;
                embeddings.push(embedding);
            }
            if embeddings.is_empty() {
                return Ok(0.0);
            }

            let embed_dim = embeddings[0].len();
            let window_len = embeddings.len();
            let flat: Vec<f32> = embeddings.into_iter().flatten().collect();

            let ww_input = ort::value::Value::from_array(
                ndarray::Array3::from_shape_vec((1, window_len, embed_dim), flat)
                    .map_err(|e| format!("classifier input tensor: {e}"))?,
            )
            .map_err(|e| format!("classifier input value: {e}"))?;

            let outputs = self
                .classifier
                .run(ort::inputs!["input" => ww_input].map_err(|e| format!("classifier inputs: {e}"))?)
                .map_err(|e| format!("classifier inference: {e}"))?;

            let tensor = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| format!("extract classifier score: {e}"))?;
            tensor
                .iter()
                .next()
                .copied()
                .ok_or_else(|| "empty classifier output".to_string())
        }

        fn embed_chunk(&mut self, chunk: &[f32]) -> Result<Vec<f32>, String> {
            let audio_input = ort::value::Value::from_array(
                ndarray::Array2::from_shape_vec((1, chunk.len()), chunk.to_vec())
                    .map_err(|e| format!("mel input tensor: {e}"))?,
            )
            .map_err(|e| format!("mel input value: {e}"))?;

            let mel_outputs = self
                .mel_session
                .run(ort::inputs!["input" => audio_input].map_err(|e| format!("mel inputs: {e}"))?)
                .map_err(|e| format!("mel inference: {e}"))?;

            let mel_tensor = mel_outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| format!("extract mel output: {e}"))?;
            let mel_value = ort::value::Value::from_array(mel_tensor.to_owned())
                .map_err(|e| format!("embed input value: {e}"))?;

            let embed_outputs = self
                .embed_session
                .run(ort::inputs!["input" => mel_value].map_err(|e| format!("embed inputs: {e}"))?)
                .map_err(|e| format!("embed inference: {e}"))?;

            let embedding = embed_outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| format!("extract embedding: {e}"))?;
            Ok(embedding.iter().copied().collect())
        }
    }
}

#[cfg(not(feature = "onnx"))]
mod inner {
    use super::*;

    pub struct Pipeline;

    impl Pipeline {
        pub fn load(models_dir: &Path, wakeword: &str) -> Result<Self, ResourceError> {
            let classifier_path = models_dir.join(format!("{wakeword}.onnx"));
            if !classifier_path.exists() {
                return Err(ResourceError::Missing {
                    path: classifier_path,
                });
            }
            Ok(Self)
        }

        pub fn score(&mut self, _window: &[i16]) -> Result<f32, String> {
            Ok(0.0)
        }
    }
}

pub use inner::Pipeline;
