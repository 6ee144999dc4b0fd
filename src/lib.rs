pub mod api;
pub mod appresult;
pub mod chat;
pub mod config;
pub mod error;
pub mod identity;
pub mod relay;
pub mod session;

use std::sync::Arc;

use axum::{extract::FromRef, http::Method, Router};
use tokio::task::JoinHandle;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

use chat::Chat;
use config::Config;
use relay::Hub;

pub use appresult::{AppError, AppResult};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub chat: Chat,
    pub hub: Hub,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let hub = Hub::default();
        let chat = Chat::new(config.chat(), Arc::new(hub.clone()));
        Self {
            chat,
            hub,
            config: Arc::new(config),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            state.config.session_idle_minutes,
        )));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .nest("/api/chat", api::router())
        .merge(relay::router())
        .with_state(state)
        .layer(session_layer)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Starts the periodic sweep of idle rooms and stale waiting entries.
pub fn spawn_reclaimer(state: &AppState) -> JoinHandle<()> {
    chat::sweep::spawn_reclaimer(state.chat.clone(), state.config.sweep_interval)
}
