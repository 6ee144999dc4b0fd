//! Poll and push clients for driving the server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use super::TestServer;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Drives the `/api/chat` endpoints as one participant.
pub struct PollClient {
    http: reqwest::Client,
    base: String,
    pub user_id: String,
}

impl PollClient {
    pub fn new(server: &TestServer, user_id: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: server.http_url("/api/chat"),
            user_id: user_id.to_owned(),
        }
    }

    pub async fn start(&self) -> anyhow::Result<Value> {
        self.post("/start", &[("userId", self.user_id.as_str())]).await
    }

    pub async fn send(&self, room_id: &str, message: &str) -> anyhow::Result<Value> {
        self.post(
            "/send",
            &[("userId", self.user_id.as_str()), ("roomId", room_id), ("message", message)],
        )
        .await
    }

    pub async fn poll(&self, room_id: Option<&str>) -> anyhow::Result<Value> {
        let mut query = vec![("userId", self.user_id.as_str())];
        if let Some(room_id) = room_id {
            query.push(("roomId", room_id));
        }
        let res = self
            .http
            .get(format!("{}/poll", self.base))
            .query(&query)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn end(&self, room_id: Option<&str>) -> anyhow::Result<Value> {
        let mut form = vec![("userId", self.user_id.as_str())];
        if let Some(room_id) = room_id {
            form.push(("roomId", room_id));
        }
        self.post("/end", &form).await
    }

    async fn post(&self, path: &str, form: &[(&str, &str)]) -> anyhow::Result<Value> {
        let res = self
            .http
            .post(format!("{}{}", self.base, path))
            .form(form)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }
}

/// One WebSocket connection to `/ws`.
pub struct PushClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl PushClient {
    pub async fn connect(server: &TestServer, user_id: &str) -> anyhow::Result<Self> {
        let (stream, _) = connect_async(server.ws_url(user_id)).await?;
        Ok(Self { stream })
    }

    pub async fn emit(&mut self, frame: Value) -> anyhow::Result<()> {
        self.stream.send(Message::Text(frame.to_string().into())).await?;
        Ok(())
    }

    pub async fn start_session(&mut self) -> anyhow::Result<()> {
        self.emit(json!({ "event": "start-session" })).await
    }

    pub async fn send_message(&mut self, room_id: &str, message: &str) -> anyhow::Result<()> {
        self.emit(json!({ "event": "send-message", "roomId": room_id, "message": message }))
            .await
    }

    pub async fn end_session(&mut self, room_id: &str) -> anyhow::Result<()> {
        self.emit(json!({ "event": "end-session", "roomId": room_id })).await
    }

    /// Next JSON event, skipping control frames.
    pub async fn recv(&mut self) -> anyhow::Result<Value> {
        loop {
            let msg = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await?
                .ok_or_else(|| anyhow::anyhow!("connection closed"))??;
            match msg {
                Message::Text(_) | Message::Binary(_) => {
                    return Ok(serde_json::from_slice(&msg.into_data())?);
                }
                Message::Close(_) => anyhow::bail!("connection closed"),
                _ => continue,
            }
        }
    }

    /// Returns `true` if nothing arrives within `wait`.
    pub async fn is_quiet(&mut self, wait: Duration) -> bool {
        tokio::time::timeout(wait, self.stream.next()).await.is_err()
    }

    pub async fn close(mut self) -> anyhow::Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
