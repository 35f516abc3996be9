mod config;
mod routes;
mod state;

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use clinic_calendar_core::Dashboard;
use std::net::SocketAddr;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::state::AppState;

const DEFAULT_LOG_FILTER: &str = "clinic_calendar=info,clinic_calendar_core=info";

#[derive(Parser)]
#[command(name = "clinic-calendar-server")]
#[command(about = "Calendar backend for the clinic dashboard, with Google Calendar sync")]
struct Cli {
    /// Config file (defaults to ~/.config/clinic-calendar/config.toml)
    #[arg(short, long, env = "CLINIC_CALENDAR_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on, overriding [server] port
    #[arg(short, long)]
    port: Option<u16>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::calendar::router())
        .merge(routes::auth::router())
        .merge(routes::appointments::router())
        .merge(routes::notifications::router())
        .with_state(state)
        .layer(cors)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;

    let dashboard = Dashboard::mount(&config.google, config.sync)
        .context("Failed to set up the Google Calendar client")?;
    let state = AppState::new(dashboard);

    let port = cli.port.unwrap_or(config.server.port);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("clinic-calendar-server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
