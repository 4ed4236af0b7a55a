//! Web form server.
//!
//! Axum router exposing the form (`GET`/`POST /`), downloads of generated
//! files (`/download/{file}`), the voice list and a health check.

use std::net::SocketAddr;

use crate::tts::KokoroTts;
use crate::SynthesisEngine;

pub mod handlers;
pub mod page;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;

/// Serve `tts` on `addr` until the process is stopped.
pub async fn serve<E>(tts: KokoroTts<E>, addr: SocketAddr) -> std::io::Result<()>
where
    E: SynthesisEngine + Send + 'static,
{
    std::fs::create_dir_all(tts.output_dir())?;
    let output_dir = tts.output_dir().display().to_string();
    let app = create_router(AppState::new(tts));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!(
        "Listening on http://{} (output directory: {output_dir})",
        listener.local_addr()?
    );
    axum::serve(listener, app).await
}
