use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::SpeechSettings;
use crate::error::{Result, TtsError};
use crate::tts::KokoroTts;
use crate::SynthesisEngine;

/// Shared server state.
///
/// Requests never write to the configuration: each one derives its own
/// [`SpeechSettings`] from `defaults`. The engine sits behind a mutex so
/// syntheses run one at a time.
pub struct AppState<E> {
    tts: Arc<Mutex<KokoroTts<E>>>,
    defaults: SpeechSettings,
    output_dir: PathBuf,
}

impl<E> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            tts: Arc::clone(&self.tts),
            defaults: self.defaults,
            output_dir: self.output_dir.clone(),
        }
    }
}

impl<E: SynthesisEngine> AppState<E> {
    pub fn new(tts: KokoroTts<E>) -> Self {
        let defaults = tts.config().settings();
        let output_dir = tts.output_dir().to_path_buf();
        Self {
            tts: Arc::new(Mutex::new(tts)),
            defaults,
            output_dir,
        }
    }

    pub fn defaults(&self) -> &SpeechSettings {
        &self.defaults
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Blocking: synthesize under the engine lock.
    pub fn synthesize(&self, text: &str, settings: &SpeechSettings) -> Result<PathBuf> {
        let mut tts = self
            .tts
            .lock()
            .map_err(|_| TtsError::Engine("engine lock poisoned by an earlier panic".to_string()))?;
        tts.text_to_audio_with(text, settings, None)
    }
}
