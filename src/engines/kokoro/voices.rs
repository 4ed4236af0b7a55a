use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::model::{KokoroError, STYLE_DIM};

pub type StyleVector = [f32; STYLE_DIM];

/// Style tables for every voice in a `voices-v1.0.bin` archive.
///
/// A voice holds one style vector per phoneme-sequence length; synthesis
/// picks the row matching the token count of the input.
pub struct VoiceStore {
    voices: HashMap<String, Vec<StyleVector>>,
}

impl VoiceStore {
    /// Read every `<voice>.npy` entry of an npz archive.
    pub fn load(path: &Path) -> Result<Self, KokoroError> {
        let file = File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| KokoroError::VoiceParse(format!("Failed to open zip archive: {e}")))?;

        let mut voices = HashMap::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| {
                KokoroError::VoiceParse(format!("Failed to read zip entry {i}: {e}"))
            })?;
            if entry.is_dir() {
                continue;
            }

            let entry_name = entry.name().to_string();
            let Some(voice) = entry_name.strip_suffix(".npy").filter(|v| !v.is_empty()) else {
                log::debug!("Skipping non-npy archive entry {entry_name}");
                continue;
            };
            let voice = voice.to_string();

            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data).map_err(|e| {
                KokoroError::VoiceParse(format!("Failed to read {entry_name}: {e}"))
            })?;

            voices.insert(voice, parse_npy(&data, &entry_name)?);
        }

        log::info!("Loaded {} voices from {}", voices.len(), path.display());
        Ok(Self { voices })
    }

    /// Style row `idx` of `voice`, clamped to the last row.
    pub fn get_style(&self, voice: &str, idx: usize) -> Result<StyleVector, KokoroError> {
        let styles = self
            .voices
            .get(voice)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| KokoroError::VoiceNotFound(voice.to_string()))?;
        Ok(styles[idx.min(styles.len() - 1)])
    }

    pub fn contains(&self, voice: &str) -> bool {
        self.voices.contains_key(voice)
    }

    /// Voice names in sorted order.
    pub fn list_voices(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.voices.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
impl VoiceStore {
    pub(crate) fn from_tables(tables: impl IntoIterator<Item = (String, Vec<StyleVector>)>) -> Self {
        Self {
            voices: tables.into_iter().collect(),
        }
    }
}

/// Decode a little-endian float32 `.npy` array of shape `[N, 256]`
/// (a leading singleton axis, `[N, 1, 256]`, is fine too).
fn parse_npy(data: &[u8], name: &str) -> Result<Vec<StyleVector>, KokoroError> {
    const MAGIC: &[u8] = b"\x93NUMPY";
    let bad = |msg: String| KokoroError::VoiceParse(format!("{name}: {msg}"));

    if data.len() < 10 || !data.starts_with(MAGIC) {
        return Err(bad("not a numpy file".to_string()));
    }

    // v1 headers use a u16 length at offset 8, v2/v3 a u32.
    let (header_len, header_start) = match data[6] {
        1 => (u16::from_le_bytes([data[8], data[9]]) as usize, 10),
        2 | 3 if data.len() >= 12 => (
            u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize,
            12,
        ),
        v => return Err(bad(format!("unsupported npy version {v}"))),
    };
    let body_start = header_start + header_len;
    let header = data
        .get(header_start..body_start)
        .ok_or_else(|| bad(format!("header truncated (need {body_start} bytes)")))?;

    let header = String::from_utf8_lossy(header);
    if !header.contains("'<f4'") {
        return Err(bad(format!("expected little-endian float32, header is {}", header.trim())));
    }

    let body = &data[body_start..];
    if body.len() % (STYLE_DIM * 4) != 0 {
        return Err(bad(format!(
            "{} data bytes is not a whole number of {STYLE_DIM}-float style vectors",
            body.len()
        )));
    }

    Ok(body
        .chunks_exact(STYLE_DIM * 4)
        .map(|row| {
            let mut style = [0f32; STYLE_DIM];
            for (dst, bytes) in style.iter_mut().zip(row.chunks_exact(4)) {
                *dst = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
            style
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npy(rows: usize, fill: impl Fn(usize, usize) -> f32) -> Vec<u8> {
        let mut header = format!(
            "{{'descr': '<f4', 'fortran_order': False, 'shape': ({rows}, 1, {STYLE_DIM}), }}"
        );
        while (10 + header.len() + 1) % 64 != 0 {
            header.push(' ');
        }
        header.push('\n');

        let mut data = b"\x93NUMPY\x01\x00".to_vec();
        data.extend_from_slice(&(header.len() as u16).to_le_bytes());
        data.extend_from_slice(header.as_bytes());
        for r in 0..rows {
            for c in 0..STYLE_DIM {
                data.extend_from_slice(&fill(r, c).to_le_bytes());
            }
        }
        data
    }

    #[test]
    fn parses_style_rows() {
        let data = npy(3, |r, c| (r * 1000 + c) as f32);
        let styles = parse_npy(&data, "af_test.npy").unwrap();
        assert_eq!(styles.len(), 3);
        assert_eq!(styles[2][0], 2000.0);
        assert_eq!(styles[1][255], 1255.0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_npy(b"definitely not numpy", "x.npy").is_err());
        let mut data = npy(1, |_, _| 0.0);
        data.pop();
        assert!(parse_npy(&data, "short.npy").is_err());
    }

    #[test]
    fn style_index_is_clamped() {
        let store = VoiceStore::from_tables([(
            "am_adam".to_string(),
            vec![[0.0; STYLE_DIM], [1.0; STYLE_DIM]],
        )]);
        assert_eq!(store.get_style("am_adam", 0).unwrap()[0], 0.0);
        assert_eq!(store.get_style("am_adam", 999).unwrap()[0], 1.0);
        assert!(matches!(
            store.get_style("bf_emma", 0),
            Err(KokoroError::VoiceNotFound(_))
        ));
        assert_eq!(store.list_voices(), vec!["am_adam"]);
    }

    #[test]
    fn loads_voices_from_npz_archive() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voices-v1.0.bin");
        {
            let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
            let options = zip::write::SimpleFileOptions::default();
            for (name, value) in [("bf_emma.npy", 0.5f32), ("af_heart.npy", 0.25)] {
                zip.start_file(name, options).unwrap();
                zip.write_all(&npy(2, |_, _| value)).unwrap();
            }
            zip.finish().unwrap();
        }

        let store = VoiceStore::load(&path).unwrap();
        assert_eq!(store.list_voices(), vec!["af_heart", "bf_emma"]);
        assert!(store.contains("bf_emma"));
        assert_eq!(store.get_style("bf_emma", 1).unwrap()[10], 0.5);
    }
}
