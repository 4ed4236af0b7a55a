use axum::{routing::get, Router};

use crate::web::handlers;
use crate::web::state::AppState;
use crate::SynthesisEngine;

pub fn create_router<E>(state: AppState<E>) -> Router
where
    E: SynthesisEngine + Send + 'static,
{
    Router::new()
        .route("/", get(handlers::index::<E>).post(handlers::create::<E>))
        .route("/download/{*filename}", get(handlers::download::<E>))
        .route("/api/voices", get(handlers::voices))
        .route("/health", get(handlers::health_check))
        .with_state(state)
}
