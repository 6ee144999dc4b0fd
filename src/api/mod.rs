//! Poll transport: form-posting HTTP endpoints and a periodic status poll.

mod end;
mod identity;
mod poll;
mod send;
mod start;

use axum::{routing::{get, post}, Router};
use serde::Serialize;

use crate::{
    chat::{ParticipantId, RoomId},
    error::ChatError,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start::start))
        .route("/send", post(send::send))
        .route("/poll", get(poll::poll))
        .route("/end", post(end::end))
        .route("/identity", get(identity::identity))
}

#[derive(Debug, Serialize)]
pub(crate) struct Ack {
    success: bool,
}

impl Ack {
    pub(crate) const OK: Ack = Ack { success: true };
}

pub(crate) fn participant(raw: Option<String>) -> Result<ParticipantId, ChatError> {
    ParticipantId::parse(&raw.ok_or(ChatError::InvalidInput("userId"))?)
}

pub(crate) fn room(raw: Option<String>) -> Result<RoomId, ChatError> {
    RoomId::parse(&raw.ok_or(ChatError::InvalidInput("roomId"))?)
}
