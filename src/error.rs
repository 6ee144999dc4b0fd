//! Error taxonomy shared by the chat core and both transports.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// A required identifier, room or message was missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// The caller does not (or no longer) belong to the targeted room.
    #[error("not a member of this room")]
    NotAMember,

    /// Room or queue entry is gone; callers read this as "session already ended".
    #[error("not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Static label, used in JSON error bodies and `rejected` events.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotAMember => "not_a_member",
            Self::NotFound => "not_found",
            Self::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::NotAMember => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_statuses() {
        assert_eq!(ChatError::NotAMember.error_code(), "not_a_member");
        assert_eq!(ChatError::NotAMember.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ChatError::InvalidInput("userId").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ChatError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ChatError::Internal("session store".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ChatError::InvalidInput("userId").to_string(),
            "invalid input: userId"
        );
    }
}
