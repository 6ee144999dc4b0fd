use axum::{debug_handler, extract::State, Form, Json};
use serde::Deserialize;

use crate::{chat::Chat, error::ChatError, AppResult};

use super::{participant, room, Ack};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendForm {
    user_id: Option<String>,
    room_id: Option<String>,
    message: Option<String>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn send(
    State(chat): State<Chat>,

    Form(SendForm { user_id, room_id, message }): Form<SendForm>,
) -> AppResult<Json<Ack>> {
    let id = participant(user_id)?;
    let room_id = room(room_id)?;
    let message = message.ok_or(ChatError::InvalidInput("message"))?;

    chat.send(&id, &room_id, message)?;
    Ok(Json(Ack::OK))
}
