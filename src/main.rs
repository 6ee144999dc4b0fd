use pairchat::{app, config::Config, spawn_reclaimer, AppState};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = Config::from_env().inspect_err(|e| {
        error!(error = %e, "failed to load config");
    })?;

    info!(
        room_timeout_secs = config.room_timeout.as_secs(),
        waiting_timeout_secs = config.waiting_timeout.as_secs(),
        sweep_interval_secs = config.sweep_interval.as_secs(),
        "starting pairchat"
    );

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config);
    let reclaimer = spawn_reclaimer(&state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reclaimer.abort();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
