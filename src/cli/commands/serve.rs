use clap::Args;

use crate::config::{self, StoreBackend};
use crate::server;
use crate::state::AppState;

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, help = "Keep users and sessions in memory instead of PostgreSQL")]
    pub memory: bool,

    #[arg(long, help = "Port to listen on (overrides SERVER_PORT)")]
    pub port: Option<u16>,

    #[arg(long, help = "Address to bind (overrides SERVER_HOST)")]
    pub host: Option<String>,
}

pub async fn handle(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = config::config().clone();
    if args.memory {
        config.auth.store = StoreBackend::Memory;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    config.validate().map_err(anyhow::Error::msg)?;

    tracing::info!(
        "Starting auth template API in {:?} mode ({:?} store, {:?} sessions)",
        config.environment,
        config.auth.store,
        config.security.session_strategy
    );

    let state = AppState::from_config(config).await?;
    server::serve(state).await
}
