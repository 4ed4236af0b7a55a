//! kokoro-web CLI entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kokoro_tts_web::{
    web, AudioFormat, Device, KokoroTts, Language, NamingStrategy, TtsConfig, TtsConfigBuilder,
    Voice,
};

/// Kokoro text-to-speech: synthesize to files or serve a web form.
#[derive(Parser)]
#[command(name = "kokoro-web", version, about)]
struct Cli {
    #[command(flatten)]
    tts: TtsArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the web form
    Serve {
        /// Host to bind
        #[arg(long, env = "KOKORO_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, env = "KOKORO_PORT", default_value_t = 5001)]
        port: u16,
    },

    /// Synthesize text once and print the path of the saved file
    Say {
        /// Text to speak
        text: String,

        /// Output file name without extension (defaults to a timestamp)
        #[arg(short, long)]
        filename: Option<String>,
    },

    /// List the available voices
    Voices,
}

#[derive(Args)]
struct TtsArgs {
    /// Directory with the Kokoro ONNX model and voices-v1.0.bin
    #[arg(long, env = "KOKORO_MODEL_DIR", default_value = "models/kokoro", global = true)]
    model_dir: PathBuf,

    /// HuggingFace repo to fetch the model from, e.g. fastrtc/kokoro-onnx[@revision]
    #[arg(long, env = "KOKORO_REPO_ID", global = true)]
    repo_id: Option<String>,

    /// File the optimized ONNX graph is cached in; written on first load
    #[arg(long, env = "KOKORO_GRAPH_CACHE", global = true)]
    graph_cache: Option<PathBuf>,

    /// Directory generated audio is written to
    #[arg(short, long, env = "KOKORO_OUTPUT_DIR", default_value = "output", global = true)]
    output_dir: PathBuf,

    /// Default voice, e.g. am_adam or bf_emma
    #[arg(long, env = "KOKORO_VOICE", default_value = "am_adam", value_parser = parse::<Voice>, global = true)]
    voice: Voice,

    /// Phonemization language (a, b, e, f, h, i, j, p, z); defaults to the voice's language
    #[arg(long, env = "KOKORO_LANG", value_parser = parse::<Language>, global = true)]
    lang: Option<Language>,

    /// Inference device: cpu or cuda
    #[arg(long, env = "KOKORO_DEVICE", default_value = "cpu", value_parser = parse::<Device>, global = true)]
    device: Device,

    /// Default output format: wav, mp3, flac or ogg
    #[arg(long, env = "KOKORO_FORMAT", default_value = "wav", value_parser = parse::<AudioFormat>, global = true)]
    format: AudioFormat,

    /// Speech speed multiplier; higher is faster
    #[arg(long, env = "KOKORO_SPEED", default_value_t = 1.0, global = true)]
    speed: f32,

    /// Sample rate of written files
    #[arg(long, env = "KOKORO_SAMPLE_RATE", default_value_t = 24_000, global = true)]
    sample_rate: u32,

    /// ffmpeg binary used for non-WAV formats
    #[arg(long, env = "KOKORO_ENCODER", default_value = "ffmpeg", global = true)]
    encoder: PathBuf,

    /// espeak-ng binary (defaults to espeak-ng on PATH)
    #[arg(long, env = "KOKORO_ESPEAK_BIN", global = true)]
    espeak_bin: Option<PathBuf>,

    /// espeak-ng data directory
    #[arg(long, env = "KOKORO_ESPEAK_DATA", global = true)]
    espeak_data: Option<PathBuf>,

    /// Inference threads (defaults to all cores)
    #[arg(long, env = "KOKORO_THREADS", global = true)]
    threads: Option<usize>,
}

impl TtsArgs {
    fn config(&self, naming: NamingStrategy) -> Result<TtsConfig> {
        TtsConfigBuilder::default()
            .model_dir(self.model_dir.clone())
            .repo_id(self.repo_id.clone())
            .graph_cache(self.graph_cache.clone())
            .output_dir(self.output_dir.clone())
            .voice(self.voice)
            .lang(self.lang)
            .device(self.device)
            .format(self.format)
            .speed(self.speed)
            .sample_rate(self.sample_rate)
            .encoder(self.encoder.clone())
            .espeak_bin(self.espeak_bin.clone())
            .espeak_data(self.espeak_data.clone())
            .num_threads(self.threads)
            .naming(naming)
            .build()
            .context("Invalid configuration")
    }
}

fn parse<T>(s: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    s.parse().map_err(|e: T::Err| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { host, port } => {
            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .with_context(|| format!("Invalid listen address {host}:{port}"))?;
            let config = cli.tts.config(NamingStrategy::Timestamp)?;
            let tts = tokio::task::spawn_blocking(move || KokoroTts::load(config))
                .await?
                .context("Failed to load Kokoro model")?;
            web::serve(tts, addr).await?;
        }
        Command::Say { text, filename } => {
            let naming = if filename.is_some() {
                NamingStrategy::Explicit
            } else {
                NamingStrategy::Timestamp
            };
            let config = cli.tts.config(naming)?;
            let path = tokio::task::spawn_blocking(move || {
                let mut tts = KokoroTts::load(config)?;
                tts.text_to_audio(&text, filename.as_deref())
            })
            .await??;
            println!("Saved file: {}", path.display());
        }
        Command::Voices => {
            for voice in Voice::ALL {
                println!("{voice}\t{}", voice.language().display_name());
            }
        }
    }

    Ok(())
}
