use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::model::KokoroError;
use super::vocab::Vocab;
use crate::catalog::Language;

/// Location of the espeak-ng binary and its data directory.
///
/// `None` for either path means the system default (`espeak-ng` on PATH,
/// built-in data path).
#[derive(Debug, Clone, Default)]
pub struct EspeakConfig {
    pub bin_path: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
}

impl EspeakConfig {
    fn command(&self) -> Command {
        let mut cmd = match &self.bin_path {
            Some(bin) => Command::new(bin),
            None => Command::new("espeak-ng"),
        };
        if let Some(data) = &self.data_path {
            cmd.arg(format!("--path={}", data.display()));
        }
        cmd
    }
}

/// Convert text to Kokoro token ids.
///
/// Punctuation is mapped straight to its token; the text between
/// punctuation marks is phonemized by espeak-ng in a single batch. IPA
/// symbols missing from `vocab` are dropped.
pub fn phonemize(
    text: &str,
    lang: Language,
    vocab: &Vocab,
    espeak: &EspeakConfig,
) -> Result<Vec<i64>, KokoroError> {
    let parts = split_text_parts(text);
    let segments: Vec<&str> = parts
        .iter()
        .filter_map(|part| match part {
            TextPart::Text(segment) => Some(segment.as_str()),
            TextPart::Punct(_) => None,
        })
        .collect();

    let mut phonemized = if segments.is_empty() {
        Vec::new()
    } else {
        phonemize_segments(&segments, lang, vocab, espeak)?
    }
    .into_iter();

    let mut ids = Vec::new();
    for part in &parts {
        match part {
            TextPart::Text(_) => ids.extend(phonemized.next().unwrap_or_default()),
            TextPart::Punct(ch) => ids.extend(vocab.get(ch).copied()),
        }
    }
    Ok(ids)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TextPart {
    Text(String),
    Punct(char),
}

fn split_text_parts(text: &str) -> Vec<TextPart> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();

    for (i, &ch) in chars.iter().enumerate() {
        let between_digits = matches!(ch, '.' | ',')
            && i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit());

        match boundary_punctuation(ch) {
            Some(punct) if !between_digits => {
                flush_text(&mut parts, &mut current);
                parts.push(TextPart::Punct(punct));
            }
            _ if ch.is_whitespace() => {
                if !current.is_empty() && !current.ends_with(' ') {
                    current.push(' ');
                }
            }
            _ => current.push(ch),
        }
    }

    flush_text(&mut parts, &mut current);
    parts
}

fn flush_text(parts: &mut Vec<TextPart>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        parts.push(TextPart::Text(trimmed.to_string()));
    }
    current.clear();
}

fn boundary_punctuation(ch: char) -> Option<char> {
    match ch {
        '.' | '!' | '?' | ',' | ';' | ':' | '—' | '…' | '"' | '(' | ')' | '\u{201c}'
        | '\u{201d}' => Some(ch),
        '\n' | '\r' => Some('.'),
        _ => None,
    }
}

fn phonemize_segments(
    segments: &[&str],
    lang: Language,
    vocab: &Vocab,
    espeak: &EspeakConfig,
) -> Result<Vec<Vec<i64>>, KokoroError> {
    let output = run_espeak(&segments.join("\n"), lang, espeak)?;
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() == segments.len() {
        return Ok(lines.iter().map(|line| ipa_to_ids(line, vocab)).collect());
    }

    // espeak-ng normally answers one line per input line; when it does not,
    // phonemize each segment on its own.
    log::debug!(
        "espeak-ng returned {} lines for {} segments, retrying one by one",
        lines.len(),
        segments.len()
    );
    segments
        .iter()
        .map(|segment| Ok(ipa_to_ids(&run_espeak(segment, lang, espeak)?, vocab)))
        .collect()
}

fn run_espeak(input: &str, lang: Language, espeak: &EspeakConfig) -> Result<String, KokoroError> {
    let mut child = espeak
        .command()
        .args(["--ipa", "--stdin", "-q", "-v", lang.espeak_code()])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => KokoroError::EspeakNotFound,
            _ => KokoroError::Io(e),
        })?;

    // espeak-ng answers line by line, so stdout has to be drained while stdin
    // is still being written or both pipes fill up.
    let stdin = child.stdin.take();
    let (output, written) = std::thread::scope(|scope| {
        let writer = scope.spawn(move || -> std::io::Result<()> {
            if let Some(mut stdin) = stdin {
                // Input is line oriented; an unterminated last line loses its final phoneme.
                stdin.write_all(input.as_bytes())?;
                if !input.ends_with('\n') {
                    stdin.write_all(b"\n")?;
                }
            }
            Ok(())
        });
        let output = child.wait_with_output();
        let written = writer
            .join()
            .unwrap_or_else(|_| Err(std::io::Error::other("espeak-ng stdin writer panicked")));
        (output, written)
    });

    let output = output?;
    if !output.status.success() {
        return Err(KokoroError::PhonemizerFailed(format!(
            "espeak-ng exited with code {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    written?;

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn ipa_to_ids(ipa: &str, vocab: &Vocab) -> Vec<i64> {
    ipa.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .flat_map(|line| line.chars())
        .filter(|&ch| ch != '_')
        .filter_map(|ch| vocab.get(&ch).copied())
        .collect()
}
