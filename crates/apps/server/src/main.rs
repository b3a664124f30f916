mod api_state;
mod routes;
mod setup;

use clap::Parser;
use color_eyre::eyre::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Media scene search backend", long_about = None)]
struct Args {
    #[clap(long, default_value_t = 8080)]
    port: u16,

    /// Path to the external transcoder executable.
    #[clap(long, default_value = media_workflows::DEFAULT_TRANSCODER)]
    transcoder: String,

    /// Path to the container probe executable.
    #[clap(long, default_value = media_workflows::DEFAULT_PROBE)]
    probe: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    color_eyre::install()?;

    let args = Args::parse();
    let settings = app_state::load_app_settings()?;
    info!(application = %settings.application.name, "configuration loaded");

    let cancel = CancellationToken::new();
    let state = setup::ServiceState::initialize(&settings, &args.transcoder, &args.probe, &cancel)
        .await?;
    info!("listeners and embed worker started");

    let router = routes::router(state.api_context());
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port)).await?;
    info!(port = args.port, "server ready");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down");
    cancel.cancel();
    state.join().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
