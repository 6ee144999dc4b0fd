//! Anonymous identities handed out per browser session.

use axum::{extract::FromRequestParts, http::request::Parts};
use rand::seq::IndexedRandom;
use serde::Serialize;
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

use crate::{
    chat::ParticipantId,
    error::ChatError,
    session::{ALIAS, PARTICIPANT_ID},
    AppError, AppResult,
};

const MAX_NAME_LEN: usize = 40;

const ADJECTIVES: [&str; 25] = [
    "Quick", "Lazy", "Mysterious", "Jolly", "Brave", "Silent", "Witty", "Fierce",
    "Clever", "Gentle", "Wild", "Calm", "Bold", "Shy", "Proud", "Happy", "Sad",
    "Eager", "Fancy", "Rusty", "Golden", "Silver", "Bright", "Dark", "Lucky",
];

const NOUNS: [&str; 24] = [
    "Fox", "Bear", "Eagle", "Wolf", "Dragon", "Tiger", "Lion", "Owl", "Rabbit",
    "Falcon", "Hawk", "Shark", "Panda", "Kitten", "Puppy", "Phoenix", "Griffin",
    "Unicorn", "Turtle", "Dolphin", "Whale", "Elephant", "Giraffe", "Zebra",
];

#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    #[serde(rename = "userId")]
    pub id: ParticipantId,
    pub alias: String,
}

impl Identity {
    /// Loads the session's identity, minting one on first use.
    pub async fn from_session(session: &Session) -> AppResult<Self> {
        let id = session.get::<String>(PARTICIPANT_ID).await.map_err(internal)?;
        let alias = session.get::<String>(ALIAS).await.map_err(internal)?;
        if let (Some(id), Some(alias)) = (id, alias) {
            return Ok(Self {
                id: ParticipantId::parse(&id)?,
                alias,
            });
        }

        let id = format!("user-{}", Uuid::now_v7().simple());
        let alias = random_alias();
        session.insert(PARTICIPANT_ID, &id).await.map_err(internal)?;
        session.insert(ALIAS, &alias).await.map_err(internal)?;
        info!(participant = %id, %alias, "minted anonymous identity");

        Ok(Self {
            id: ParticipantId::parse(&id)?,
            alias,
        })
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| ChatError::Internal(msg.to_owned()))?;
        Self::from_session(&session).await
    }
}

fn internal(err: impl std::fmt::Display) -> ChatError {
    ChatError::Internal(err.to_string())
}

pub fn random_alias() -> String {
    let mut rng = rand::rng();
    format!(
        "{} {}",
        ADJECTIVES.choose(&mut rng).unwrap_or(&"Quiet"),
        NOUNS.choose(&mut rng).unwrap_or(&"Stranger"),
    )
}

/// Trims a client-supplied display name; blank names become `None`.
pub fn display_name(raw: Option<String>) -> Option<String> {
    let name = raw?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(name.chars().take(MAX_NAME_LEN).collect())
}
