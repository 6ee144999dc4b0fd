//! In-process test server.

use std::{net::SocketAddr, time::Duration};

use pairchat::{app, config::Config, spawn_reclaimer, AppState};
use tokio::{net::TcpListener, task::JoinHandle};

pub struct TestServer {
    addr: SocketAddr,
    pub state: AppState,
    server: JoinHandle<()>,
    reclaimer: JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(Config::default()).await
    }

    /// Config with timeouts short enough for reclamation tests.
    pub fn short_timeouts() -> Config {
        Config {
            room_timeout: Duration::from_millis(200),
            waiting_timeout: Duration::from_millis(200),
            sweep_interval: Duration::from_millis(50),
            ..Config::default()
        }
    }

    pub async fn spawn_with(config: Config) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = AppState::new(config);
        let reclaimer = spawn_reclaimer(&state);
        let router = app(state.clone());
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            addr,
            state,
            server,
            reclaimer,
        })
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, user_id: &str) -> String {
        format!("ws://{}/ws?userId={}", self.addr, user_id)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.abort();
        self.reclaimer.abort();
    }
}
