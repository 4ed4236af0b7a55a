use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView2};
use ort::execution_providers::{CPUExecutionProvider, ExecutionProviderDispatch};
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use super::phonemizer::{phonemize, EspeakConfig};
use super::vocab::{vocab_for, Vocab};
use super::voices::{StyleVector, VoiceStore};
use crate::catalog::{Device, Language};

/// Maximum number of phoneme tokens per chunk (before padding).
pub const MAX_PHONEME_LEN: usize = 510;

/// Style vector dimension for Kokoro.
pub const STYLE_DIM: usize = 256;

/// Output sample rate from the Kokoro model.
pub const SAMPLE_RATE: u32 = 24000;

/// 10ms @ 24kHz
const CHUNK_CROSSFADE_SAMPLES: usize = 240;

/// Preferred model file; any other `.onnx` in the directory is the fallback.
const PREFERRED_ONNX: &str = "kokoro-quant-convinteger.onnx";
const VOICES_FILE: &str = "voices-v1.0.bin";

/// Token ids of `; : , . ! ?` in the Kokoro vocab, used as chunk boundaries.
const PUNCT_IDS: [i64; 6] = [1, 2, 3, 4, 5, 6];

#[derive(thiserror::Error, Debug)]
pub enum KokoroError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error(
        "espeak-ng not found. Install: Linux: `sudo apt-get install espeak-ng`, \
         macOS: `brew install espeak-ng`, Windows: https://espeak-ng.org/download"
    )]
    EspeakNotFound,
    #[error("Phonemization failed: {0}")]
    PhonemizerFailed(String),
    #[error("Voice '{0}' not found in the loaded voice archive")]
    VoiceNotFound(String),
    #[error("Model not loaded. Call load_model() first.")]
    ModelNotLoaded,
    #[error("Model file missing: {0}")]
    MissingFile(String),
    #[error("Invalid config.json: {0}")]
    Config(String),
    #[error("Failed to parse voice file: {0}")]
    VoiceParse(String),
    #[error("Model returned no waveform")]
    EmptyOutput,
    #[error("HuggingFace Hub: {0}")]
    Hub(String),
}

/// Loaded ONNX session plus the voice and vocabulary tables it needs.
pub struct KokoroModel {
    session: Session,
    voice_store: VoiceStore,
    vocab: Vocab,
    /// "input_ids" on the official export, "tokens" on some community exports
    tokens_input_name: String,
    speed_is_int32: bool,
}

/// Session construction options.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub num_threads: Option<usize>,
    pub device: Device,
    pub optimized_cache_path: Option<PathBuf>,
}

impl KokoroModel {
    /// Load the ONNX model, `voices-v1.0.bin` and (optionally) `config.json`
    /// from `model_dir`.
    pub fn load(model_dir: &Path, options: &SessionOptions) -> Result<Self, KokoroError> {
        let onnx_path = find_onnx_file(model_dir)?;
        log::info!("Loading Kokoro model from {}", onnx_path.display());
        let session = init_session(&onnx_path, options)?;

        let tokens_input_name = detect_tokens_input(&session);
        let speed_is_int32 = detect_speed_type(&session);
        log::debug!("Model inputs: tokens='{tokens_input_name}', speed_is_int32={speed_is_int32}");

        let voices_path = model_dir.join(VOICES_FILE);
        if !voices_path.is_file() {
            return Err(KokoroError::MissingFile(voices_path.display().to_string()));
        }
        let voice_store = VoiceStore::load(&voices_path)?;
        let vocab = vocab_for(model_dir)?;

        Ok(Self {
            session,
            voice_store,
            vocab,
            tokens_input_name,
            speed_is_int32,
        })
    }

    /// Synthesize `text` as one waveform.
    ///
    /// Long inputs are split at punctuation and the pieces crossfaded
    /// together; every piece uses the style row for the full token count so
    /// prosody stays consistent across chunk boundaries.
    pub fn synthesize_text(
        &mut self,
        text: &str,
        voice: &str,
        lang: Language,
        speed: f32,
        style_index: Option<usize>,
        espeak: &EspeakConfig,
    ) -> Result<Vec<f32>, KokoroError> {
        if !self.voice_store.contains(voice) {
            return Err(KokoroError::VoiceNotFound(voice.to_string()));
        }

        let ids = phonemize(text, lang, &self.vocab, espeak)?;
        if ids.is_empty() {
            log::warn!("No phoneme tokens produced for text: {text:?}");
            return Ok(Vec::new());
        }

        let style = self.voice_store.get_style(voice, style_index.unwrap_or(ids.len()))?;
        let chunks = split_chunks(&ids);
        if chunks.len() > 1 {
            log::debug!(
                "{} phoneme tokens exceed {MAX_PHONEME_LEN}, synthesizing {} chunks",
                ids.len(),
                chunks.len()
            );
        }

        let mut combined = Vec::with_capacity(ids.len() * 300);
        for chunk in chunks {
            let audio = self.synthesize_chunk(chunk, &style, speed)?;
            append_with_crossfade(&mut combined, &audio, CHUNK_CROSSFADE_SAMPLES);
        }
        Ok(combined)
    }

    /// Run one inference on at most `MAX_PHONEME_LEN` tokens.
    fn synthesize_chunk(
        &mut self,
        tokens: &[i64],
        style: &StyleVector,
        speed: f32,
    ) -> Result<Vec<f32>, KokoroError> {
        // [[0, t1..tN, 0]]
        let mut padded = Vec::with_capacity(tokens.len() + 2);
        padded.push(0);
        padded.extend_from_slice(tokens);
        padded.push(0);
        let tokens_arr = Array2::from_shape_vec((1, padded.len()), padded)?;
        let style_view = ArrayView2::from_shape((1, STYLE_DIM), style.as_slice())?;

        let tokens_name = self.tokens_input_name.as_str();
        let outputs = if self.speed_is_int32 {
            let speed_arr = ndarray::arr1(&[speed.round().max(1.0) as i32]);
            self.session.run(inputs![
                tokens_name => TensorRef::from_array_view(tokens_arr.view())?,
                "style" => TensorRef::from_array_view(style_view)?,
                "speed" => TensorRef::from_array_view(speed_arr.view())?,
            ])?
        } else {
            let speed_arr = ndarray::arr1(&[speed]);
            self.session.run(inputs![
                tokens_name => TensorRef::from_array_view(tokens_arr.view())?,
                "style" => TensorRef::from_array_view(style_view)?,
                "speed" => TensorRef::from_array_view(speed_arr.view())?,
            ])?
        };

        let (_, waveform) = outputs.iter().next().ok_or(KokoroError::EmptyOutput)?;
        let waveform = waveform.try_extract_array::<f32>()?;
        Ok(waveform.iter().copied().collect())
    }

    pub fn list_voices(&self) -> Vec<&str> {
        self.voice_store.list_voices()
    }
}

fn find_onnx_file(model_dir: &Path) -> Result<PathBuf, KokoroError> {
    let preferred = model_dir.join(PREFERRED_ONNX);
    if preferred.is_file() {
        return Ok(preferred);
    }

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(model_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "onnx"))
        .collect();
    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| KokoroError::MissingFile(format!("no .onnx file in {}", model_dir.display())))
}

fn execution_providers(device: Device) -> Vec<ExecutionProviderDispatch> {
    match device {
        Device::Cpu => vec![CPUExecutionProvider::default().build()],
        #[cfg(feature = "cuda")]
        Device::Cuda => vec![
            ort::execution_providers::CUDAExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ],
        #[cfg(not(feature = "cuda"))]
        Device::Cuda => {
            log::warn!("Built without the `cuda` feature, running Kokoro on CPU");
            vec![CPUExecutionProvider::default().build()]
        }
    }
}

/// Build the ONNX session.
///
/// With `optimized_cache_path` set, the first load runs Level3 graph
/// optimization and serialises the result there; later loads read the
/// cached graph with optimization disabled.
fn init_session(onnx_path: &Path, options: &SessionOptions) -> Result<Session, KokoroError> {
    let cache = options.optimized_cache_path.as_deref();
    let cached = cache.filter(|c| c.is_file());

    let (load_path, opt_level) = match cached {
        Some(cache) => {
            log::info!("Loading pre-optimized graph from {}", cache.display());
            (cache, GraphOptimizationLevel::Disable)
        }
        None => (onnx_path, GraphOptimizationLevel::Level3),
    };

    let mut builder = Session::builder()?
        .with_optimization_level(opt_level)?
        .with_execution_providers(execution_providers(options.device))?
        .with_parallel_execution(true)?;

    if let (Some(cache), None) = (cache, cached) {
        log::info!("Saving optimized graph to {}", cache.display());
        builder = builder.with_optimized_model_path(cache)?;
    }

    if let Some(threads) = options.num_threads {
        builder = builder
            .with_intra_threads(threads)?
            .with_inter_threads(threads)?;
    }

    Ok(builder.commit_from_file(load_path)?)
}

fn detect_tokens_input(session: &Session) -> String {
    session
        .inputs()
        .iter()
        .map(|input| input.name())
        .find(|name| *name == "input_ids" || *name == "tokens")
        .unwrap_or("input_ids")
        .to_string()
}

/// Newer exports take the speed as int32, older ones as float32.
fn detect_speed_type(session: &Session) -> bool {
    session
        .inputs()
        .iter()
        .find(|input| input.name() == "speed")
        .map(|input| format!("{:?}", input.dtype()).to_lowercase().contains("int32"))
        .unwrap_or(true)
}

/// Split token ids into chunks of at most `MAX_PHONEME_LEN`, cutting after
/// the last punctuation mark that fits.
fn split_chunks(ids: &[i64]) -> Vec<&[i64]> {
    let mut chunks = Vec::new();
    let mut rest = ids;

    while rest.len() > MAX_PHONEME_LEN {
        let window = &rest[..MAX_PHONEME_LEN];
        let cut = window
            .iter()
            .rposition(|id| PUNCT_IDS.contains(id))
            .map_or(MAX_PHONEME_LEN, |i| i + 1);
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}

/// Append `src` to `dst`, linearly crossfading the first `crossfade`
/// samples of `src` over the tail of `dst`.
fn append_with_crossfade(dst: &mut Vec<f32>, src: &[f32], crossfade: usize) {
    let overlap = crossfade.min(dst.len()).min(src.len());
    let start = dst.len() - overlap;

    for (i, (d, s)) in dst[start..].iter_mut().zip(src).enumerate() {
        let t = (i + 1) as f32 / (overlap + 1) as f32;
        *d = *d * (1.0 - t) + s * t;
    }
    dst.extend_from_slice(&src[overlap..]);
}
