use std::{sync::Arc, time::Duration};

use axum::{debug_handler, extract::{ws::{Message, WebSocket}, Query, State, WebSocketUpgrade}, response::Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tower_sessions::Session;
use tracing::{debug, info};

use crate::{
    chat::{Chat, Event, Notifier, ParticipantId, RoomId},
    config::Config,
    error::ChatError,
    identity::{display_name, Identity},
    AppResult,
};

use super::{hub::OUTBOX_CAPACITY, Hub};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WsQuery {
    user_id: Option<String>,
}

/// Client → server frames.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub(crate) enum Command {
    StartSession {
        #[serde(default)]
        name: Option<String>,
    },
    SendMessage {
        room_id: String,
        message: String,
    },
    EndSession {
        #[serde(default)]
        room_id: Option<String>,
    },
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_ws(
    Query(WsQuery { user_id }): Query<WsQuery>,
    State(chat): State<Chat>,
    State(hub): State<Hub>,
    State(config): State<Arc<Config>>,
    session: Session,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let id = match user_id {
        Some(raw) => ParticipantId::parse(&raw)?,
        None => Identity::from_session(&session).await?.id,
    };
    let heartbeat = config.heartbeat_interval;

    Ok(ws.on_upgrade(move |stream| connection(stream, id, chat, hub, heartbeat)))
}

async fn connection(stream: WebSocket, id: ParticipantId, chat: Chat, hub: Hub, heartbeat: Duration) {
    let (mut sender, mut receiver) = stream.split();
    let (outbox, mut rx) = mpsc::channel::<Event>(OUTBOX_CAPACITY);
    let link = hub.attach(id.clone(), outbox);
    info!(participant = %id, "connected");

    let mut forward_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let mut heartbeat = tokio::time::interval(heartbeat);
    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(msg @ (Message::Text(_) | Message::Binary(_)))) => {
                    dispatch(&chat, &hub, &id, &msg.into_data());
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = heartbeat.tick() => chat.touch(&id),
            _ = &mut forward_task => break,
        }
    }
    forward_task.abort();

    if hub.detach(&id, link) {
        let departure = chat.leave(&id, None);
        info!(participant = %id, ?departure, "disconnected");
    } else {
        debug!(participant = %id, "superseded connection closed");
    }
}

fn dispatch(chat: &Chat, hub: &Hub, id: &ParticipantId, raw: &[u8]) {
    let command = match serde_json::from_slice::<Command>(raw) {
        Ok(command) => command,
        Err(err) => {
            debug!(participant = %id, error = %err, "unreadable command");
            reject(hub, id, &ChatError::InvalidInput("command"));
            return;
        }
    };

    let result = match command {
        Command::StartSession { name } => {
            chat.start(id, display_name(name));
            Ok(())
        }
        Command::SendMessage { room_id, message } => {
            RoomId::parse(&room_id).and_then(|room_id| chat.send(id, &room_id, message))
        }
        Command::EndSession { room_id } => RoomId::parse_hint(room_id.as_deref()).map(|hint| {
            chat.leave(id, hint.as_ref());
        }),
    };

    if let Err(err) = result {
        reject(hub, id, &err);
    }
}

fn reject(hub: &Hub, id: &ParticipantId, err: &ChatError) {
    hub.notify(
        id,
        Event::Rejected {
            code: err.error_code(),
            message: err.to_string(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_from_socket_event_names() {
        let start: Command = serde_json::from_str(r#"{"event":"start-session"}"#).unwrap();
        assert!(matches!(start, Command::StartSession { name: None }));

        let send: Command =
            serde_json::from_str(r#"{"event":"send-message","roomId":"room-1","message":"hi"}"#).unwrap();
        assert!(matches!(send, Command::SendMessage { ref room_id, ref message } if room_id == "room-1" && message == "hi"));

        let end: Command = serde_json::from_str(r#"{"event":"end-session"}"#).unwrap();
        assert!(matches!(end, Command::EndSession { room_id: None }));

        assert!(serde_json::from_str::<Command>(r#"{"event":"dance"}"#).is_err());
    }

    #[test]
    fn bad_commands_are_rejected_over_the_outbox() {
        let hub = Hub::default();
        let chat = Chat::new(Default::default(), Arc::new(hub.clone()));
        let id = ParticipantId::parse("a").unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        hub.attach(id.clone(), tx);

        dispatch(&chat, &hub, &id, b"not json");
        assert!(matches!(rx.try_recv().unwrap(), Event::Rejected { code: "invalid_input", .. }));

        dispatch(&chat, &hub, &id, br#"{"event":"send-message","roomId":"room-x","message":"hi"}"#);
        assert!(matches!(rx.try_recv().unwrap(), Event::Rejected { code: "not_a_member", .. }));

        dispatch(&chat, &hub, &id, br#"{"event":"start-session"}"#);
        assert_eq!(rx.try_recv().unwrap(), Event::Waiting);
    }
}
