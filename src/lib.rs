//! # kokoro-tts-web
//!
//! Text-to-speech on top of the Kokoro-82M pipeline: synthesize text, write
//! the audio to an output directory, optionally transcode it with ffmpeg, and
//! serve the whole thing through a small web form.
//!
//! ## Features
//!
//! - **Kokoro TTS** (`kokoro` feature): ONNX inference with espeak-ng phonemization
//! - **File output**: WAV written directly, MP3/FLAC/OGG through ffmpeg
//! - **Web form**: axum router with an audio player and download links
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "kokoro")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use kokoro_tts_web::{AudioFormat, KokoroTts, TtsConfigBuilder, Voice};
//!
//! let config = TtsConfigBuilder::default()
//!     .model_dir("models/kokoro")
//!     .voice(Voice::BfEmma)
//!     .format(AudioFormat::Mp3)
//!     .build()?;
//! let mut tts = KokoroTts::load(config)?;
//! let path = tts.text_to_audio("Hello, world!", None)?;
//! println!("Saved file: {}", path.display());
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "kokoro"))]
//! # fn main() {}
//! ```

pub mod catalog;
pub mod config;
pub mod engines;
pub mod error;
pub mod transcode;
pub mod tts;
pub mod web;

pub use catalog::{AudioFormat, Device, Language, Voice};
pub use config::{NamingStrategy, SpeechSettings, TtsConfig, TtsConfigBuilder};
pub use error::{Result, TtsError};
pub use transcode::Transcoder;
pub use tts::KokoroTts;

use std::path::Path;

use rubato::{FastFixedIn, PolynomialDegree, Resampler};

/// The result of a synthesis (text-to-speech) operation.
///
/// Contains raw f32 audio samples and the sample rate of the output audio.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    /// Raw mono audio samples
    pub samples: Vec<f32>,
    /// Sample rate of the audio (24000 for Kokoro)
    pub sample_rate: u32,
}

impl SynthesisResult {
    /// Convert the audio to `target_rate`.
    ///
    /// Returns a copy unchanged when the rates already match.
    pub fn resample(&self, target_rate: u32) -> Result<SynthesisResult> {
        if target_rate == self.sample_rate {
            return Ok(self.clone());
        }
        if self.samples.is_empty() {
            return Ok(SynthesisResult {
                samples: Vec::new(),
                sample_rate: target_rate,
            });
        }

        let ratio = target_rate as f64 / self.sample_rate as f64;
        let mut resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0,
            PolynomialDegree::Septic,
            self.samples.len(),
            1,
        )
        .map_err(|e| TtsError::Resample(e.to_string()))?;

        let input = [self.samples.as_slice()];
        let mut out = resampler
            .process(&input[..], None)
            .map_err(|e| TtsError::Resample(e.to_string()))?;

        Ok(SynthesisResult {
            samples: out.pop().unwrap_or_default(),
            sample_rate: target_rate,
        })
    }

    /// Write the audio as a mono 16-bit PCM WAV file.
    ///
    /// Samples are hard-clamped to [-1, 1] before quantization.
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Per-call inference parameters shared by all engines.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechParams {
    pub voice: Voice,
    /// Phonemization language. `None` uses the voice's own language.
    pub language: Option<Language>,
    /// Speech speed multiplier; higher is faster.
    pub speed: f32,
    /// Override the style vector index. `None` = auto (uses phoneme token count).
    pub style_index: Option<usize>,
}

impl Default for SpeechParams {
    fn default() -> Self {
        Self {
            voice: Voice::AmAdam,
            language: None,
            speed: 1.0,
            style_index: None,
        }
    }
}

impl SpeechParams {
    pub fn language(&self) -> Language {
        self.language.unwrap_or_else(|| self.voice.language())
    }
}

/// Common interface for text-to-speech synthesis engines.
///
/// Each engine may have different parameter types for model loading; every
/// engine consumes [`SpeechParams`] at inference time so the orchestration
/// layer can drive any of them.
pub trait SynthesisEngine {
    /// Parameters for configuring model loading (threads, device, etc.)
    type ModelParams: Default;

    /// Load a model from the specified path using default parameters.
    fn load_model(&mut self, model_path: &Path) -> Result<()> {
        self.load_model_with_params(model_path, Self::ModelParams::default())
    }

    /// Load a model from the specified path with custom parameters.
    fn load_model_with_params(&mut self, model_path: &Path, params: Self::ModelParams)
        -> Result<()>;

    /// Unload the currently loaded model and free associated resources.
    fn unload_model(&mut self);

    /// Synthesize speech from the given text.
    fn synthesize(&mut self, text: &str, params: Option<SpeechParams>) -> Result<SynthesisResult>;

    /// Synthesize speech from the given text and write to a WAV file.
    ///
    /// Default implementation calls `synthesize()` then `SynthesisResult::write_wav()`.
    fn synthesize_to_file(
        &mut self,
        text: &str,
        wav_path: &Path,
        params: Option<SpeechParams>,
    ) -> Result<()> {
        self.synthesize(text, params)?.write_wav(wav_path)
    }
}
