use axum::{debug_handler, extract::{Query, State}, Json};
use serde::Deserialize;

use crate::{chat::{Chat, Poll, RoomId}, AppResult};

use super::participant;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PollQuery {
    user_id: Option<String>,
    room_id: Option<String>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn poll(
    State(chat): State<Chat>,
    Query(PollQuery { user_id, room_id }): Query<PollQuery>,
) -> AppResult<Json<Poll>> {
    let id = participant(user_id)?;
    let hint = RoomId::parse_hint(room_id.as_deref())?;
    Ok(Json(chat.poll(&id, hint.as_ref())))
}
