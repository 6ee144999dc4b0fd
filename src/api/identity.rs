use axum::{debug_handler, Json};

use crate::identity::Identity;

#[debug_handler]
pub(crate) async fn identity(identity: Identity) -> Json<Identity> {
    Json(identity)
}
