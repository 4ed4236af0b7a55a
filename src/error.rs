#[cfg(feature = "kokoro")]
use crate::engines::kokoro::KokoroError;

/// Errors produced while turning text into an audio file.
#[derive(thiserror::Error, Debug)]
pub enum TtsError {
    #[error("Text must not be empty")]
    EmptyText,
    #[error("A filename is required when the naming strategy is explicit")]
    MissingFilename,
    #[error("Invalid filename {0:?}: must be a single path component")]
    InvalidFilename(String),
    #[error("Invalid {field}: {reason}")]
    InvalidParameter { field: &'static str, reason: String },
    #[error("Engine produced no audio for the given text")]
    NoAudio,
    #[error("Audio encoder `{0}` not found. Install ffmpeg or pass --encoder")]
    EncoderNotFound(String),
    #[error("Audio encoder exited with code {code:?}: {stderr}")]
    EncoderFailed { code: Option<i32>, stderr: String },
    #[error("Resampling failed: {0}")]
    Resample(String),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "kokoro")]
    #[error(transparent)]
    Kokoro(#[from] KokoroError),
    #[error("Synthesis failed: {0}")]
    Engine(String),
}

impl TtsError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }

    /// True for errors caused by bad caller input rather than by the engine
    /// or the encoder.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyText
                | Self::MissingFilename
                | Self::InvalidFilename(_)
                | Self::InvalidParameter { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TtsError>;
