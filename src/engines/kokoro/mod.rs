//! Kokoro-82M text-to-speech engine.
//!
//! Runs the Kokoro-82M ONNX export through ONNX Runtime and uses espeak-ng
//! for phonemization.
//!
//! # System Requirements
//!
//! **espeak-ng** must be installed (`apt-get install espeak-ng`,
//! `brew install espeak-ng`) or pointed at with
//! [`KokoroEngine::with_espeak`].
//!
//! # Model Directory Layout
//!
//! ```text
//! models/kokoro/
//! ├── kokoro-quant-convinteger.onnx   # or any other .onnx export
//! ├── voices-v1.0.bin                 # voice style archive (.npz)
//! └── config.json                     # optional, provides the vocab
//! ```
//!
//! With a HuggingFace repo id ([`hub::resolve_model_dir`]) the ONNX graph
//! and voice archive are fetched into the hf-hub cache instead.
//!
//! Download links:
//! - Model: <https://github.com/taylorchu/kokoro-onnx/releases/tag/v0.2.0>
//! - Voices: <https://github.com/thewh1teagle/kokoro-onnx/releases/tag/model-files-v1.0>
//!
//! The phonemization language defaults to the voice's own language (first
//! letter of the voice id) and can be overridden through
//! [`SpeechParams::language`](crate::SpeechParams).

pub mod engine;
pub mod hub;
pub mod model;
pub mod phonemizer;
pub mod vocab;
pub mod voices;

pub use engine::{KokoroEngine, KokoroModelParams};
pub use model::KokoroError;
pub use phonemizer::EspeakConfig;
