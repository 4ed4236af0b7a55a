//! Format conversion through an external ffmpeg process.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::catalog::AudioFormat;
use crate::error::{Result, TtsError};

/// Invokes ffmpeg to turn a WAV file into another container.
#[derive(Debug, Clone)]
pub struct Transcoder {
    binary: PathBuf,
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Transcoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Convert `input` to `target`, replacing its extension.
    ///
    /// WAV targets return `input` as is. On success the input file is
    /// removed; on failure it is left in place.
    pub fn transcode(&self, input: &Path, target: AudioFormat) -> Result<PathBuf> {
        if target == AudioFormat::Wav {
            return Ok(input.to_path_buf());
        }

        let output = input.with_extension(target.extension());
        let args = encoder_args(input, &output, target);
        log::debug!("Running {} {:?}", self.binary.display(), args);

        let result = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TtsError::EncoderNotFound(self.binary.display().to_string())
                } else {
                    TtsError::Io(e)
                }
            })?;

        if !result.status.success() {
            return Err(TtsError::EncoderFailed {
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        if !output.is_file() {
            return Err(TtsError::EncoderFailed {
                code: result.status.code(),
                stderr: format!("encoder reported success but {} is missing", output.display()),
            });
        }

        std::fs::remove_file(input)?;
        log::info!("Transcoded {} -> {}", input.display(), output.display());
        Ok(output)
    }
}

fn encoder_args(input: &Path, output: &Path, target: AudioFormat) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-loglevel", "error", "-i"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(input.as_os_str().to_owned());
    args.extend(target.encoder_args().iter().map(OsString::from));
    args.push(output.as_os_str().to_owned());
    args
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Copies the file after `-i` to the last argument.
    #[cfg(unix)]
    const COPYING_ENCODER: &str = r#"#!/bin/sh
for arg in "$@"; do
  [ "$prev" = "-i" ] && input="$arg"
  prev="$arg"
done
cp "$input" "$prev"
"#;

    #[cfg(unix)]
    pub(crate) fn copying_encoder(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-ffmpeg");
        std::fs::write(&path, COPYING_ENCODER).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn builds_mp3_command_line() {
        let args = encoder_args(Path::new("out/a.wav"), Path::new("out/a.mp3"), AudioFormat::Mp3);
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "-y", "-loglevel", "error", "-i", "out/a.wav", "-codec:a", "libmp3lame",
                "-qscale:a", "2", "out/a.mp3",
            ]
        );
    }

    #[test]
    fn wav_target_is_a_no_op() {
        let transcoder = Transcoder::new("/definitely/not/ffmpeg");
        let path = Path::new("some/file.wav");
        assert_eq!(transcoder.transcode(path, AudioFormat::Wav).unwrap(), path);
    }

    #[test]
    fn missing_encoder_keeps_the_wav() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("clip.wav");
        std::fs::write(&wav, b"RIFF").unwrap();

        let transcoder = Transcoder::new(dir.path().join("no-such-ffmpeg"));
        let err = transcoder.transcode(&wav, AudioFormat::Mp3).unwrap_err();
        assert!(matches!(err, TtsError::EncoderNotFound(_)), "{err}");
        assert!(wav.exists());
    }

    #[cfg(unix)]
    #[test]
    fn successful_transcode_replaces_the_wav() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("clip.wav");
        std::fs::write(&wav, b"RIFF").unwrap();

        let transcoder = Transcoder::new(copying_encoder(dir.path()));
        let out = transcoder.transcode(&wav, AudioFormat::Mp3).unwrap();
        assert_eq!(out, dir.path().join("clip.mp3"));
        assert_eq!(std::fs::read(&out).unwrap(), b"RIFF");
        assert!(!wav.exists());
    }

    #[cfg(unix)]
    #[test]
    fn failing_encoder_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("clip.wav");
        std::fs::write(&wav, b"RIFF").unwrap();

        let err = Transcoder::new("false")
            .transcode(&wav, AudioFormat::Flac)
            .unwrap_err();
        assert!(matches!(err, TtsError::EncoderFailed { code: Some(1), .. }), "{err}");
        assert!(wav.exists());
    }

    #[cfg(unix)]
    #[test]
    fn encoder_that_writes_nothing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("clip.wav");
        std::fs::write(&wav, b"RIFF").unwrap();

        let err = Transcoder::new("true")
            .transcode(&wav, AudioFormat::Ogg)
            .unwrap_err();
        assert!(matches!(err, TtsError::EncoderFailed { .. }), "{err}");
    }
}
