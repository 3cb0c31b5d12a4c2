use anyhow::Context;
use clap::Parser;
use prerenderd::cdp::CdpBackend;
use prerenderd::renderer::Renderer;
use prerenderd::server::{build_router, AppState};
use prerenderd::RendererConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "prerenderd",
    version,
    about = "Render pages in headless Chrome and serve the resulting HTML"
)]
struct Args {
    /// Address to bind
    #[arg(long, env = "PRERENDERD_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PRERENDERD_PORT", default_value_t = 3000)]
    port: u16,

    /// Maximum number of concurrent browser sessions
    #[arg(long, env = "PRERENDERD_MAX_SESSIONS", default_value_t = 4)]
    max_sessions: usize,

    /// Navigation timeout in milliseconds
    #[arg(long, env = "PRERENDERD_TIMEOUT_MS", default_value_t = 30_000)]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RendererConfig {
        timeout_ms: args.timeout_ms,
        max_sessions: args.max_sessions,
        ..Default::default()
    };

    let renderer = Renderer::new(CdpBackend::new(config.clone()), &config);
    let router = build_router(AppState {
        renderer: Arc::new(renderer),
    });

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.host, args.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
