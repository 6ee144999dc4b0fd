use axum::{debug_handler, extract::State, Form, Json};
use serde::Deserialize;

use crate::{chat::{Chat, RoomId}, AppResult};

use super::{participant, Ack};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EndForm {
    user_id: Option<String>,
    room_id: Option<String>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn end(
    State(chat): State<Chat>,

    Form(EndForm { user_id, room_id }): Form<EndForm>,
) -> AppResult<Json<Ack>> {
    let id = participant(user_id)?;
    let hint = RoomId::parse_hint(room_id.as_deref())?;

    chat.leave(&id, hint.as_ref());
    Ok(Json(Ack::OK))
}
