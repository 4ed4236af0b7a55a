use std::path::{Path, PathBuf};

use crate::catalog::Device;
use crate::error::Result;
use crate::{SpeechParams, SynthesisEngine, SynthesisResult};

use super::model::{KokoroError, KokoroModel, SessionOptions, SAMPLE_RATE};
use super::phonemizer::EspeakConfig;

/// Parameters for configuring Kokoro model loading.
#[derive(Debug, Clone, Default)]
pub struct KokoroModelParams {
    /// Number of CPU threads to use for inference.
    /// `None` uses the ORT default (typically all available cores).
    pub num_threads: Option<usize>,
    pub device: Device,
    /// Where to cache the Level3-optimized ONNX graph. Must be writable.
    pub optimized_model_cache_path: Option<PathBuf>,
}

/// Kokoro-82M text-to-speech engine.
///
/// Requires espeak-ng for phonemization.
///
/// ```rust,no_run
/// use kokoro_tts_web::{SynthesisEngine, SpeechParams, Voice, engines::kokoro::KokoroEngine};
/// use std::path::Path;
///
/// let mut engine = KokoroEngine::new();
/// engine.load_model(Path::new("models/kokoro"))?;
/// let params = SpeechParams { voice: Voice::BfEmma, speed: 0.9, ..Default::default() };
/// let result = engine.synthesize("Hello, world!", Some(params))?;
/// println!("{:.2}s of audio", result.duration_secs());
/// # Ok::<(), kokoro_tts_web::TtsError>(())
/// ```
pub struct KokoroEngine {
    model: Option<KokoroModel>,
    model_path: Option<PathBuf>,
    espeak: EspeakConfig,
}

impl Default for KokoroEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl KokoroEngine {
    /// Create a new engine that uses `espeak-ng` from PATH.
    pub fn new() -> Self {
        Self::with_espeak(None, None)
    }

    /// Create a new engine with explicit espeak-ng binary and data paths.
    /// Either path can be `None` to fall back to the system default.
    pub fn with_espeak(bin_path: Option<PathBuf>, data_path: Option<PathBuf>) -> Self {
        Self {
            model: None,
            model_path: None,
            espeak: EspeakConfig {
                bin_path,
                data_path,
            },
        }
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    /// Voices in the loaded archive; empty before `load_model`.
    pub fn list_voices(&self) -> Vec<&str> {
        self.model
            .as_ref()
            .map(|m| m.list_voices())
            .unwrap_or_default()
    }
}

impl SynthesisEngine for KokoroEngine {
    type ModelParams = KokoroModelParams;

    fn load_model_with_params(&mut self, model_path: &Path, params: Self::ModelParams) -> Result<()> {
        let options = SessionOptions {
            num_threads: params.num_threads,
            device: params.device,
            optimized_cache_path: params.optimized_model_cache_path,
        };
        let model = KokoroModel::load(model_path, &options)?;
        log::info!(
            "Kokoro ready on {} with {} voices",
            params.device,
            model.list_voices().len()
        );
        self.model = Some(model);
        self.model_path = Some(model_path.to_path_buf());
        Ok(())
    }

    fn unload_model(&mut self) {
        self.model = None;
        self.model_path = None;
    }

    fn synthesize(&mut self, text: &str, params: Option<SpeechParams>) -> Result<SynthesisResult> {
        let model = self.model.as_mut().ok_or(KokoroError::ModelNotLoaded)?;
        let p = params.unwrap_or_default();

        let samples = model.synthesize_text(
            text,
            p.voice.as_str(),
            p.language(),
            p.speed,
            p.style_index,
            &self.espeak,
        )?;

        Ok(SynthesisResult {
            samples,
            sample_rate: SAMPLE_RATE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TtsError;

    #[test]
    fn synthesize_before_load_fails() {
        let mut engine = KokoroEngine::new();
        let err = engine.synthesize("hello", None).unwrap_err();
        assert!(matches!(err, TtsError::Kokoro(KokoroError::ModelNotLoaded)));
        assert!(engine.list_voices().is_empty());
        assert!(engine.model_path().is_none());
    }

    #[test]
    fn load_from_empty_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = KokoroEngine::new();
        assert!(engine.load_model(dir.path()).is_err());
        assert!(engine.model_path().is_none());
    }
}
