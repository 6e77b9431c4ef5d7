mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use vibe_api::storage::MediaStore;
use vibe_api::tokens::TokenIssuer;
use vibe_api::{AppStateInner, create_router};
use vibe_db::Database;
use vibe_sms::{LogGateway, MnotifyGateway, SmsGateway};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vibe=debug,vibe_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    let db = Arc::new(Database::open(&config.db_path)?);

    let sms: Arc<dyn SmsGateway> = match &config.sms {
        Some(sms) => {
            info!("Sending SMS through {}", sms.url);
            Arc::new(MnotifyGateway::new(&sms.url, &sms.api_key, &sms.sender_id))
        }
        None => {
            info!("VIBE_SMS_API_KEY not set, SMS messages will only be logged");
            Arc::new(LogGateway)
        }
    };

    tokio::fs::create_dir_all(&config.media_root).await?;
    let tokens = TokenIssuer::new(&config.jwt_secret, config.access_ttl, config.refresh_ttl);
    let state = AppStateInner::new(db, sms, tokens, MediaStore::new(config.media_root.clone()));

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("VIBE server listening on {}", addr);
    info!("Serving media from {}", config.media_root.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
