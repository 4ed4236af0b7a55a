//! Configuration for [`KokoroTts`](crate::KokoroTts).
//!
//! A [`TtsConfig`] holds the defaults used for every synthesis. Callers that
//! need different parameters for a single call take a [`SpeechSettings`]
//! snapshot and override it, leaving the config untouched.

use std::ops::RangeInclusive;
use std::path::PathBuf;

use derive_builder::Builder;

use crate::catalog::{AudioFormat, Device, Language, Voice};
use crate::error::{Result, TtsError};
use crate::SpeechParams;

pub const SPEED_RANGE: RangeInclusive<f32> = 0.1..=3.0;
pub const SAMPLE_RATE_RANGE: RangeInclusive<u32> = 8_000..=96_000;

/// How output files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingStrategy {
    /// Milliseconds since the Unix epoch. Any caller-supplied name is ignored.
    #[default]
    Timestamp,
    /// The caller must pass a filename for every synthesis.
    Explicit,
}

/// Process-wide TTS configuration.
///
/// ```
/// use kokoro_tts_web::{AudioFormat, TtsConfigBuilder, Voice};
///
/// let config = TtsConfigBuilder::default()
///     .voice(Voice::AfHeart)
///     .format(AudioFormat::Mp3)
///     .speed(1.2)
///     .build()
///     .unwrap();
/// assert_eq!(config.sample_rate, 24_000);
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(default, setter(into), build_fn(validate = "Self::validate"))]
pub struct TtsConfig {
    /// Phonemization language. `None` follows the selected voice.
    pub lang: Option<Language>,
    pub device: Device,
    /// Directory holding the ONNX model, `voices-v1.0.bin` and `config.json`.
    pub model_dir: PathBuf,
    /// HuggingFace repo (`owner/repo[@revision]`) to fetch the model from.
    /// Takes precedence over `model_dir` when set.
    pub repo_id: Option<String>,
    /// Where the optimized ONNX graph is cached between runs.
    pub graph_cache: Option<PathBuf>,
    pub voice: Voice,
    pub format: AudioFormat,
    #[builder(setter(into = false))]
    pub speed: f32,
    /// Sample rate of the written file. Values above 20 kHz are recommended.
    #[builder(setter(into = false))]
    pub sample_rate: u32,
    pub output_dir: PathBuf,
    pub naming: NamingStrategy,
    /// ffmpeg binary used for non-WAV formats.
    pub encoder: PathBuf,
    pub espeak_bin: Option<PathBuf>,
    pub espeak_data: Option<PathBuf>,
    pub num_threads: Option<usize>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            lang: None,
            device: Device::Cpu,
            model_dir: PathBuf::from("models/kokoro"),
            repo_id: None,
            graph_cache: None,
            voice: Voice::AmAdam,
            format: AudioFormat::Wav,
            speed: 1.0,
            sample_rate: 24_000,
            output_dir: PathBuf::from("output"),
            naming: NamingStrategy::Timestamp,
            encoder: PathBuf::from("ffmpeg"),
            espeak_bin: None,
            espeak_data: None,
            num_threads: None,
        }
    }
}

impl TtsConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(speed) = self.speed {
            validate_speed(speed).map_err(|e| e.to_string())?;
        }
        if let Some(rate) = self.sample_rate {
            validate_sample_rate(rate).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

impl TtsConfig {
    /// Snapshot of the defaults, to be overridden per call.
    pub fn settings(&self) -> SpeechSettings {
        SpeechSettings {
            voice: self.voice,
            language: self.lang,
            format: self.format,
            speed: self.speed,
            sample_rate: self.sample_rate,
        }
    }
}

/// Parameters for a single synthesis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechSettings {
    pub voice: Voice,
    pub language: Option<Language>,
    pub format: AudioFormat,
    pub speed: f32,
    pub sample_rate: u32,
}

impl SpeechSettings {
    pub fn validate(&self) -> Result<()> {
        validate_speed(self.speed)?;
        validate_sample_rate(self.sample_rate)?;
        Ok(())
    }

    pub fn speech_params(&self) -> SpeechParams {
        SpeechParams {
            voice: self.voice,
            language: self.language,
            speed: self.speed,
            style_index: None,
        }
    }
}

pub fn validate_speed(speed: f32) -> Result<f32> {
    if speed.is_finite() && SPEED_RANGE.contains(&speed) {
        Ok(speed)
    } else {
        Err(TtsError::invalid(
            "speed",
            format!(
                "{speed} is outside {}..={}",
                SPEED_RANGE.start(),
                SPEED_RANGE.end()
            ),
        ))
    }
}

pub fn validate_sample_rate(rate: u32) -> Result<u32> {
    if SAMPLE_RATE_RANGE.contains(&rate) {
        Ok(rate)
    } else {
        Err(TtsError::invalid(
            "sample rate",
            format!(
                "{rate} is outside {}..={}",
                SAMPLE_RATE_RANGE.start(),
                SAMPLE_RATE_RANGE.end()
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = TtsConfigBuilder::default().build().unwrap();
        assert_eq!(config.voice, Voice::AmAdam);
        assert_eq!(config.format, AudioFormat::Wav);
        assert_eq!(config.speed, 1.0);
        assert_eq!(config.sample_rate, 24_000);
        assert_eq!(config.naming, NamingStrategy::Timestamp);
        assert_eq!(config.encoder, PathBuf::from("ffmpeg"));
        assert_eq!(config.lang, None);
        assert_eq!(config.repo_id, None);
        assert_eq!(config.graph_cache, None);
    }

    #[test]
    fn model_source_options_are_carried() {
        let config = TtsConfigBuilder::default()
            .repo_id("fastrtc/kokoro-onnx".to_string())
            .graph_cache(PathBuf::from("cache/kokoro.ort"))
            .build()
            .unwrap();
        assert_eq!(config.repo_id.as_deref(), Some("fastrtc/kokoro-onnx"));
        assert_eq!(config.graph_cache, Some(PathBuf::from("cache/kokoro.ort")));
    }

    #[test]
    fn builder_rejects_out_of_range_values() {
        assert!(TtsConfigBuilder::default().speed(0.0).build().is_err());
        assert!(TtsConfigBuilder::default().speed(f32::NAN).build().is_err());
        assert!(TtsConfigBuilder::default().sample_rate(4_000).build().is_err());
        assert!(TtsConfigBuilder::default()
            .speed(3.0)
            .sample_rate(48_000)
            .build()
            .is_ok());
    }

    #[test]
    fn settings_snapshot_is_independent_of_config() {
        let config = TtsConfigBuilder::default()
            .lang(Language::BritishEnglish)
            .build()
            .unwrap();
        let mut settings = config.settings();
        settings.voice = Voice::BfEmma;
        settings.speed = 2.0;
        assert_eq!(config.voice, Voice::AmAdam);
        assert_eq!(config.speed, 1.0);

        let params = settings.speech_params();
        assert_eq!(params.voice, Voice::BfEmma);
        assert_eq!(params.language(), Language::BritishEnglish);
    }

    #[test]
    fn validation_errors_are_flagged() {
        let err = validate_speed(5.0).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("speed"));
    }
}
