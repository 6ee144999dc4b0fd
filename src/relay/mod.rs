//! Push transport: one WebSocket per participant, events delivered as they happen.

mod hub;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub use hub::{Hub, LinkId, Outbox, OUTBOX_CAPACITY};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::chat_ws))
}
