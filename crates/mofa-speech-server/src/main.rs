//! MoFA speech server - entry point.
//!
//! Configuration is layered: built-in defaults, an optional file passed via
//! `--config`, `MOFA_SPEECH__*` environment variables, then the command-line
//! flags below.
//!
//! | Flag | Env | Description |
//! |------|-----|-------------|
//! | `--config` | `MOFA_SPEECH_CONFIG` | Config file (yaml/toml/json/ini/ron/json5). |
//! | `--host` | `MOFA_SPEECH_HOST` | Bind address. |
//! | `--port` | `MOFA_SPEECH_PORT` | TCP port. |
//! | `--preload` | `MOFA_SPEECH_PRELOAD` | Family to load at startup (`none`, `stt`, `tts`). |

use std::sync::Arc;

use clap::Parser;
use mofa_speech::config::{LogFormat, ServerConfig, SpeechConfig};
use mofa_speech::types::ModelFamily;
use mofa_speech_server::backend::build_coordinator;
use mofa_speech_server::server::SpeechServer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// MoFA speech server - OpenAI-compatible STT/TTS on one accelerator
#[derive(Parser)]
#[command(name = "mofa-speech-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, env = "MOFA_SPEECH_CONFIG")]
    config: Option<String>,

    /// Bind address
    #[arg(long, env = "MOFA_SPEECH_HOST")]
    host: Option<String>,

    /// TCP port
    #[arg(short, long, env = "MOFA_SPEECH_PORT")]
    port: Option<u16>,

    /// Model family to preload at startup
    #[arg(long, env = "MOFA_SPEECH_PRELOAD")]
    preload: Option<ModelFamily>,
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", server.log_level)));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match server.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match SpeechConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(preload) = cli.preload {
        config.coordinator.preload = preload;
    }

    init_tracing(&config.server);
    info!(
        addr = %config.server.bind_addr(),
        switch_timeout_secs = config.coordinator.switch_timeout_secs,
        preload = %config.coordinator.preload,
        max_upload_bytes = config.server.max_upload_bytes,
        "MoFA speech server configuration loaded"
    );

    let coordinator = Arc::new(build_coordinator(&config));
    let server = SpeechServer::new(config, coordinator);

    if let Err(e) = server.run(shutdown_signal()).await {
        eprintln!("Speech server error: {e}");
        std::process::exit(1);
    }
}
