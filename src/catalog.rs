//! Identifiers understood by the Kokoro pipeline: languages, voices,
//! devices and output formats.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::TtsError;

/// Languages supported by Kokoro-82M.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    AmericanEnglish,
    BritishEnglish,
    Spanish,
    French,
    Hindi,
    Italian,
    Japanese,
    BrazilianPortuguese,
    MandarinChinese,
}

impl Language {
    pub const ALL: &'static [Language] = &[
        Language::AmericanEnglish,
        Language::BritishEnglish,
        Language::Spanish,
        Language::French,
        Language::Hindi,
        Language::Italian,
        Language::Japanese,
        Language::BrazilianPortuguese,
        Language::MandarinChinese,
    ];

    /// One-letter pipeline code, also the first letter of every voice id.
    pub fn code(self) -> char {
        match self {
            Language::AmericanEnglish => 'a',
            Language::BritishEnglish => 'b',
            Language::Spanish => 'e',
            Language::French => 'f',
            Language::Hindi => 'h',
            Language::Italian => 'i',
            Language::Japanese => 'j',
            Language::BrazilianPortuguese => 'p',
            Language::MandarinChinese => 'z',
        }
    }

    /// espeak-ng voice used for phonemization.
    pub fn espeak_code(self) -> &'static str {
        match self {
            Language::AmericanEnglish => "en-us",
            Language::BritishEnglish => "en-gb",
            Language::Spanish => "es",
            Language::French => "fr",
            Language::Hindi => "hi",
            Language::Italian => "it",
            Language::Japanese => "ja",
            Language::BrazilianPortuguese => "pt-br",
            Language::MandarinChinese => "cmn",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Language::AmericanEnglish => "American English",
            Language::BritishEnglish => "British English",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::Hindi => "Hindi",
            Language::Italian => "Italian",
            Language::Japanese => "Japanese",
            Language::BrazilianPortuguese => "Brazilian Portuguese",
            Language::MandarinChinese => "Mandarin Chinese",
        }
    }

    pub fn from_code(code: char) -> Option<Language> {
        Self::ALL
            .iter()
            .copied()
            .find(|lang| lang.code() == code.to_ascii_lowercase())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Language {
    type Err = TtsError;

    /// Accepts the pipeline letter (`a`) or the espeak code (`en-us`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if let Some(lang) = Language::from_code(c) {
                return Ok(lang);
            }
        }
        Language::ALL
            .iter()
            .copied()
            .find(|lang| lang.espeak_code() == s)
            .ok_or_else(|| TtsError::invalid("language", format!("unknown language {s:?}")))
    }
}

macro_rules! voices {
    ($($variant:ident => $id:literal),* $(,)?) => {
        /// Voices shipped in `voices-v1.0.bin`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Voice {
            $($variant),*
        }

        impl Voice {
            pub const ALL: &'static [Voice] = &[$(Voice::$variant),*];

            /// Voice id as stored in the voice archive, e.g. `am_adam`.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Voice::$variant => $id),*
                }
            }
        }
    };
}

voices! {
    AfAlloy => "af_alloy",
    AfAoede => "af_aoede",
    AfBella => "af_bella",
    AfHeart => "af_heart",
    AfJessica => "af_jessica",
    AfKore => "af_kore",
    AfNicole => "af_nicole",
    AfNova => "af_nova",
    AfRiver => "af_river",
    AfSarah => "af_sarah",
    AfSky => "af_sky",
    AmAdam => "am_adam",
    AmEcho => "am_echo",
    AmEric => "am_eric",
    AmFenrir => "am_fenrir",
    AmLiam => "am_liam",
    AmMichael => "am_michael",
    AmOnyx => "am_onyx",
    AmPuck => "am_puck",
    AmSanta => "am_santa",
    BfAlice => "bf_alice",
    BfEmma => "bf_emma",
    BfIsabella => "bf_isabella",
    BfLily => "bf_lily",
    BmDaniel => "bm_daniel",
    BmFable => "bm_fable",
    BmGeorge => "bm_george",
    BmLewis => "bm_lewis",
    EfDora => "ef_dora",
    EmAlex => "em_alex",
    EmSanta => "em_santa",
    FfSiwis => "ff_siwis",
    HfAlpha => "hf_alpha",
    HfBeta => "hf_beta",
    HmOmega => "hm_omega",
    HmPsi => "hm_psi",
    IfSara => "if_sara",
    ImNicola => "im_nicola",
    JfAlpha => "jf_alpha",
    JfGongitsune => "jf_gongitsune",
    JfNebula => "jf_nebula",
    JfTebukuro => "jf_tebukuro",
    JmKumo => "jm_kumo",
    PfDora => "pf_dora",
    PmAlex => "pm_alex",
    PmSanta => "pm_santa",
    ZfXiaobei => "zf_xiaobei",
    ZfXiaoni => "zf_xiaoni",
    ZfXiaoxiao => "zf_xiaoxiao",
    ZfXiaoyi => "zf_xiaoyi",
    ZmYunjian => "zm_yunjian",
    ZmYunxi => "zm_yunxi",
    ZmYunxia => "zm_yunxia",
    ZmYunyang => "zm_yunyang",
}

impl Voice {
    /// Language encoded in the first letter of the voice id.
    pub fn language(self) -> Language {
        self.as_str()
            .chars()
            .next()
            .and_then(Language::from_code)
            .unwrap_or(Language::AmericanEnglish)
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Voice {
    type Err = TtsError;

    /// Case-insensitive; `AM_ADAM` and `am_adam` are the same voice.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_ascii_lowercase();
        Voice::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == id)
            .ok_or_else(|| TtsError::invalid("voice", format!("unknown voice {s:?}")))
    }
}

impl Serialize for Voice {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Execution device for ONNX inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        })
    }
}

impl FromStr for Device {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda),
            other => Err(TtsError::invalid("device", format!("unknown device {other:?}"))),
        }
    }
}

/// Output container written to the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
    Flac,
    Ogg,
}

impl AudioFormat {
    pub const ALL: &'static [AudioFormat] = &[
        AudioFormat::Wav,
        AudioFormat::Mp3,
        AudioFormat::Flac,
        AudioFormat::Ogg,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Ogg => "audio/ogg",
        }
    }

    /// Codec arguments passed to ffmpeg after `-i <input>`. Empty for WAV,
    /// which the pipeline writes directly.
    pub fn encoder_args(self) -> &'static [&'static str] {
        match self {
            AudioFormat::Wav => &[],
            AudioFormat::Mp3 => &["-codec:a", "libmp3lame", "-qscale:a", "2"],
            AudioFormat::Flac => &["-codec:a", "flac"],
            AudioFormat::Ogg => &["-codec:a", "libvorbis", "-qscale:a", "5"],
        }
    }

    pub fn from_extension(ext: &str) -> Option<AudioFormat> {
        let ext = ext.to_ascii_lowercase();
        AudioFormat::ALL
            .iter()
            .copied()
            .find(|f| f.extension() == ext)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('.');
        AudioFormat::from_extension(trimmed)
            .ok_or_else(|| TtsError::invalid("format", format!("unsupported format {s:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_language_follows_prefix() {
        assert_eq!(Voice::AmAdam.language(), Language::AmericanEnglish);
        assert_eq!(Voice::BfEmma.language(), Language::BritishEnglish);
        assert_eq!(Voice::JfAlpha.language(), Language::Japanese);
        assert_eq!(Voice::ZmYunxi.language(), Language::MandarinChinese);
        assert_eq!(Voice::PmSanta.language(), Language::BrazilianPortuguese);
    }

    #[test]
    fn every_voice_has_a_known_language_letter() {
        for voice in Voice::ALL {
            let first = voice.as_str().chars().next().unwrap();
            assert!(Language::from_code(first).is_some(), "{voice}");
        }
    }

    #[test]
    fn voice_parsing_is_case_insensitive() {
        assert_eq!("AM_ADAM".parse::<Voice>().unwrap(), Voice::AmAdam);
        assert_eq!(" af_heart ".parse::<Voice>().unwrap(), Voice::AfHeart);
        assert!("af_nobody".parse::<Voice>().is_err());
    }

    #[test]
    fn language_parses_letter_or_espeak_code() {
        assert_eq!("a".parse::<Language>().unwrap(), Language::AmericanEnglish);
        assert_eq!("B".parse::<Language>().unwrap(), Language::BritishEnglish);
        assert_eq!("pt-br".parse::<Language>().unwrap(), Language::BrazilianPortuguese);
        assert!("x".parse::<Language>().is_err());
        assert!("klingon".parse::<Language>().is_err());
    }

    #[test]
    fn format_parsing_and_encoder_args() {
        assert_eq!(".MP3".parse::<AudioFormat>().unwrap(), AudioFormat::Mp3);
        assert!("aiff".parse::<AudioFormat>().is_err());
        assert!(AudioFormat::Wav.encoder_args().is_empty());
        assert_eq!(
            AudioFormat::Mp3.encoder_args(),
            &["-codec:a", "libmp3lame", "-qscale:a", "2"]
        );
    }

    #[test]
    fn device_parsing() {
        assert_eq!("CPU".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("gpu".parse::<Device>().unwrap(), Device::Cuda);
        assert!("tpu".parse::<Device>().is_err());
    }
}
