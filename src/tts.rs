use std::path::{Component, Path, PathBuf};

use crate::config::{NamingStrategy, SpeechSettings, TtsConfig};
use crate::error::{Result, TtsError};
use crate::transcode::Transcoder;
use crate::SynthesisEngine;

#[cfg(feature = "kokoro")]
use crate::engines::kokoro::{hub, KokoroEngine, KokoroModelParams};

/// Text in, audio file out.
///
/// Wraps a loaded [`SynthesisEngine`] together with the output settings:
/// each call synthesizes one buffer, resamples it to the configured rate,
/// writes a WAV into the output directory and, for other formats, hands
/// the file to the [`Transcoder`].
pub struct KokoroTts<E> {
    engine: E,
    config: TtsConfig,
    transcoder: Transcoder,
}

#[cfg(feature = "kokoro")]
impl KokoroTts<KokoroEngine> {
    /// Build a Kokoro engine from `config` and load its model, downloading
    /// it first when a repo id is configured.
    pub fn load(config: TtsConfig) -> Result<Self> {
        let model_dir = hub::resolve_model_dir(&config.model_dir, config.repo_id.as_deref())?;
        let mut engine =
            KokoroEngine::with_espeak(config.espeak_bin.clone(), config.espeak_data.clone());
        engine.load_model_with_params(
            &model_dir,
            KokoroModelParams {
                num_threads: config.num_threads,
                device: config.device,
                optimized_model_cache_path: config.graph_cache.clone(),
            },
        )?;
        Ok(Self::new(engine, config))
    }
}

impl<E: SynthesisEngine> KokoroTts<E> {
    /// Wrap an already loaded engine.
    pub fn new(engine: E, config: TtsConfig) -> Self {
        let transcoder = Transcoder::new(config.encoder.clone());
        Self {
            engine,
            config,
            transcoder,
        }
    }

    pub fn config(&self) -> &TtsConfig {
        &self.config
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Synthesize `text` with the configured defaults.
    pub fn text_to_audio(&mut self, text: &str, filename: Option<&str>) -> Result<PathBuf> {
        let settings = self.config.settings();
        self.text_to_audio_with(text, &settings, filename)
    }

    /// Synthesize `text` with per-call `settings`. Returns the path of the
    /// final file.
    pub fn text_to_audio_with(
        &mut self,
        text: &str,
        settings: &SpeechSettings,
        filename: Option<&str>,
    ) -> Result<PathBuf> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TtsError::EmptyText);
        }
        settings.validate()?;

        std::fs::create_dir_all(&self.config.output_dir)?;
        let stem = self.resolve_stem(filename, settings)?;

        let audio = self.engine.synthesize(text, Some(settings.speech_params()))?;
        if audio.samples.is_empty() {
            return Err(TtsError::NoAudio);
        }
        let audio = audio.resample(settings.sample_rate)?;

        let wav_path = self.config.output_dir.join(format!("{stem}.wav"));
        audio.write_wav(&wav_path)?;
        log::info!(
            "Wrote {:.2}s of audio to {}",
            audio.duration_secs(),
            wav_path.display()
        );

        self.transcoder.transcode(&wav_path, settings.format)
    }

    fn resolve_stem(&self, filename: Option<&str>, settings: &SpeechSettings) -> Result<String> {
        match self.config.naming {
            NamingStrategy::Timestamp => {
                let base = chrono::Utc::now().timestamp_millis().to_string();
                Ok(unique_stem(&self.config.output_dir, &base, settings))
            }
            NamingStrategy::Explicit => {
                let name = filename.ok_or(TtsError::MissingFilename)?;
                validate_stem(name)?;
                Ok(name.to_string())
            }
        }
    }
}

/// Reject anything that is not a single, plain path component.
pub(crate) fn validate_stem(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(TtsError::InvalidFilename(name.to_string())),
    }
}

fn unique_stem(dir: &Path, base: &str, settings: &SpeechSettings) -> String {
    let taken = |stem: &str| {
        dir.join(format!("{stem}.wav")).exists()
            || dir
                .join(format!("{stem}.{}", settings.format.extension()))
                .exists()
    };
    if !taken(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}-{n}"))
        .find(|stem| !taken(stem))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AudioFormat, Language, Voice};
    use crate::config::TtsConfigBuilder;
    use crate::{SpeechParams, SynthesisResult};

    #[derive(Default)]
    struct RecordingEngine {
        calls: Vec<(String, SpeechParams)>,
        silent: bool,
    }

    impl SynthesisEngine for RecordingEngine {
        type ModelParams = ();

        fn load_model_with_params(&mut self, _: &Path, _: ()) -> Result<()> {
            Ok(())
        }

        fn unload_model(&mut self) {}

        fn synthesize(&mut self, text: &str, params: Option<SpeechParams>) -> Result<SynthesisResult> {
            self.calls.push((text.to_string(), params.unwrap_or_default()));
            let samples = if self.silent { vec![] } else { vec![0.25; 2400] };
            Ok(SynthesisResult {
                samples,
                sample_rate: 24_000,
            })
        }
    }

    fn tts_in(dir: &Path, naming: NamingStrategy) -> KokoroTts<RecordingEngine> {
        let config = TtsConfigBuilder::default()
            .output_dir(dir)
            .naming(naming)
            .build()
            .unwrap();
        KokoroTts::new(RecordingEngine::default(), config)
    }

    #[test]
    fn writes_wav_named_by_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let mut tts = tts_in(dir.path(), NamingStrategy::Timestamp);

        let path = tts.text_to_audio("  Hello there.  ", Some("ignored")).unwrap();
        assert_eq!(path.parent(), Some(dir.path()));
        assert_eq!(path.extension().unwrap(), "wav");
        let stem = path.file_stem().unwrap().to_str().unwrap();
        assert!(stem.parse::<i64>().is_ok(), "{stem}");

        let (text, params) = &tts.engine_mut().calls[0];
        assert_eq!(text, "Hello there.");
        assert_eq!(params.voice, Voice::AmAdam);
    }

    #[test]
    fn timestamp_names_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let mut tts = tts_in(dir.path(), NamingStrategy::Timestamp);
        let first = tts.text_to_audio("one", None).unwrap();
        let second = tts.text_to_audio("two", None).unwrap();
        assert_ne!(first, second);
        assert!(first.exists() && second.exists());
    }

    #[test]
    fn explicit_naming_requires_a_filename() {
        let dir = tempfile::tempdir().unwrap();
        let mut tts = tts_in(dir.path(), NamingStrategy::Explicit);

        assert!(matches!(
            tts.text_to_audio("hi", None),
            Err(TtsError::MissingFilename)
        ));
        assert!(matches!(
            tts.text_to_audio("hi", Some("../escape")),
            Err(TtsError::InvalidFilename(_))
        ));

        let path = tts.text_to_audio("hi", Some("greeting")).unwrap();
        assert_eq!(path, dir.path().join("greeting.wav"));
    }

    #[test]
    fn empty_text_is_rejected_before_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        let mut tts = tts_in(dir.path(), NamingStrategy::Timestamp);
        assert!(matches!(tts.text_to_audio(" \n\t", None), Err(TtsError::EmptyText)));
        assert!(tts.engine_mut().calls.is_empty());
    }

    #[test]
    fn silent_engine_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut tts = tts_in(dir.path(), NamingStrategy::Timestamp);
        tts.engine_mut().silent = true;
        assert!(matches!(tts.text_to_audio("hello", None), Err(TtsError::NoAudio)));
    }

    #[test]
    fn per_call_settings_reach_engine_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut tts = tts_in(dir.path(), NamingStrategy::Timestamp);
        let settings = SpeechSettings {
            voice: Voice::BfEmma,
            language: Some(Language::BritishEnglish),
            format: AudioFormat::Wav,
            speed: 1.5,
            sample_rate: 48_000,
        };

        let path = tts.text_to_audio_with("Cheers", &settings, None).unwrap();
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 48_000);

        let (_, params) = &tts.engine_mut().calls[0];
        assert_eq!(params.voice, Voice::BfEmma);
        assert_eq!(params.speed, 1.5);
        assert_eq!(tts.config().voice, Voice::AmAdam);
    }

    #[cfg(unix)]
    #[test]
    fn non_wav_formats_return_the_transcoded_file() {
        let dir = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let config = TtsConfigBuilder::default()
            .output_dir(dir.path())
            .naming(NamingStrategy::Explicit)
            .encoder(crate::transcode::tests::copying_encoder(bin.path()))
            .build()
            .unwrap();
        let mut tts = KokoroTts::new(RecordingEngine::default(), config);
        let settings = SpeechSettings {
            format: AudioFormat::Mp3,
            ..tts.config().settings()
        };

        let path = tts.text_to_audio_with("hello", &settings, Some("clip")).unwrap();
        assert_eq!(path, dir.path().join("clip.mp3"));
        assert!(path.is_file());
        assert!(!dir.path().join("clip.wav").exists());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut tts = tts_in(dir.path(), NamingStrategy::Timestamp);
        let mut settings = tts.config().settings();
        settings.speed = 10.0;
        let err = tts.text_to_audio_with("hi", &settings, None).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn stem_validation() {
        assert!(validate_stem("clip-01").is_ok());
        assert!(validate_stem("").is_err());
        assert!(validate_stem("..").is_err());
        assert!(validate_stem("a/b").is_err());
        assert!(validate_stem("/etc").is_err());
        assert!(validate_stem("a\\b").is_err());
    }
}
