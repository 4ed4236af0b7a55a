//! Speech synthesis engines.
//!
//! # Available Engines
//!
//! Enable engines via Cargo features:
//! - `kokoro` - Kokoro TTS (ONNX format, espeak-ng required)
//! - `cuda` - Kokoro with the CUDA execution provider

#[cfg(feature = "kokoro")]
pub mod kokoro;
