//! Upload bot
//!
//! A chat bot that walks each user through title, video link and thumbnail
//! link, then copies both files into object storage and records them in a
//! media collection.

mod api;
mod config;
mod db;
mod runtime;
mod session;
mod state_machine;
mod storage;
mod telegram;
mod transfer;

use api::{create_router, AppState};
use config::{BotConfig, MediaBackend};
use db::Database;
use runtime::{
    DatabaseMediaStore, MediaStore, RealtimeDatabase, RuntimeManager, UploadPipeline,
};
use session::InMemorySessionStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use storage::FirebaseStorage;
use telegram::{Poller, TelegramClient};
use transfer::{HttpTransferEngine, LogProgress};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "upload_bot=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = BotConfig::from_env()?;
    let client = reqwest::Client::builder().build()?;

    // Metadata store
    let media: Arc<dyn MediaStore> = match &config.media {
        MediaBackend::Sqlite(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            tracing::info!(path = %path.display(), "Opening database");
            Arc::new(DatabaseMediaStore::new(Database::open(path)?))
        }
        MediaBackend::Realtime { url, access_token } => {
            tracing::info!(%url, "Using realtime database");
            Arc::new(RealtimeDatabase::new(
                client.clone(),
                url.clone(),
                access_token.clone(),
            ))
        }
    };

    tokio::fs::create_dir_all(&config.work_dir).await?;

    let storage = Arc::new(FirebaseStorage::new(client.clone(), config.storage.clone()));
    let transfer =
        Arc::new(HttpTransferEngine::new(client.clone(), storage).with_observer(Arc::new(LogProgress)));
    let telegram = Arc::new(TelegramClient::new(
        client,
        config.telegram_api_base.clone(),
        config.bot_token.clone(),
    ));

    let pipeline = Arc::new(UploadPipeline::new(
        transfer,
        media,
        telegram.clone(),
        config.work_dir.clone(),
        config.collection.clone(),
    ));
    let runtime = Arc::new(
        RuntimeManager::new(Arc::new(InMemorySessionStore::new()), telegram.clone(), pipeline)
            .with_idle_timeout(Duration::from_secs(config.idle_timeout_secs)),
    );

    tracing::info!(
        bucket = %config.storage.bucket,
        collection = %config.collection,
        work_dir = %config.work_dir.display(),
        "Upload bot configured"
    );

    // Liveness listener
    let app = create_router(AppState::new(runtime.clone()));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server is running on {}", addr);

    let server = async move { axum::serve(listener, app).await };
    let poller = Poller::new(telegram, runtime, config.poll_timeout_secs);

    tokio::select! {
        result = server => result?,
        () = poller.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
