use pong_server::config::ServerConfig;
use pong_server::game_loop::{GameRegistry, SessionCommand, SessionEvent, spawn_session};

#[tokio::main]
async fn main() {
    pong_server::init_tracing();

    let config = ServerConfig::load();
    config.validate();
    tracing::info!(variant = %config.variant, tick_rate_hz = config.tick_rate_hz, "Pong server starting");

    let registry = GameRegistry::new();
    let (cmd_tx, mut events, handle) = match spawn_session(&registry, config) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "failed to start session");
            std::process::exit(1);
        },
    };

    let mut shutdown = std::pin::pin!(tokio::signal::ctrl_c());
    let mut stopping = false;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::Ticked { tick, .. }) if tick % 600 == 0 => {
                    tracing::info!(tick, "still ticking");
                },
                Some(SessionEvent::Ticked { .. }) => {},
                Some(SessionEvent::Stopped { ticks }) => {
                    tracing::info!(ticks, "Pong server stopped");
                    break;
                },
                None => break,
            },
            _ = &mut shutdown, if !stopping => {
                tracing::info!("shutdown requested");
                stopping = true;
                let _ = cmd_tx.send(SessionCommand::Stop);
            }
        }
    }
    let _ = handle.await;
}
