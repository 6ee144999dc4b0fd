use axum::{debug_handler, extract::State, Form, Json};
use serde::Deserialize;

use crate::{chat::{Chat, StartOutcome}, identity::display_name, AppResult};

use super::participant;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StartForm {
    user_id: Option<String>,
    name: Option<String>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn start(
    State(chat): State<Chat>,

    Form(StartForm { user_id, name }): Form<StartForm>,
) -> AppResult<Json<StartOutcome>> {
    let id = participant(user_id)?;
    Ok(Json(chat.start(&id, display_name(name)).into()))
}
