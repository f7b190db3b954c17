use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use voice_bridge::{create_router, AppState, Config};

#[derive(Parser)]
#[command(name = "voice-bridge", about = "Telephony to conversational AI bridge")]
struct Cli {
    /// Config file stem (optional; environment variables override it)
    #[arg(long, default_value = "config/voice-bridge")]
    config: String,

    /// Override the configured HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_bridge=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut cfg = Config::load(&cli.config)?;
    if let Some(port) = cli.port {
        cfg.http.port = port;
    }

    if cfg.recognition.appkey.is_empty() {
        warn!("AMIVOICE_APPKEY not set; calls will run without recognition");
    }
    if cfg.llm.api_key.is_empty() {
        warn!("GEMINI_API_KEY not set; every reply will be the apology fallback");
    }

    let addr = format!("{}:{}", cfg.http.bind, cfg.http.port);
    let state = AppState::new(Arc::new(cfg));
    let router = create_router(state);

    info!("voice-bridge listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router).await.context("server error")?;

    Ok(())
}
