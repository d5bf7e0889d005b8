use std::sync::Arc;

use anyhow::Context;
use log::info;

use hour_tracker::api::{router, AppState};
use hour_tracker::sqlite::SqliteEntryStore;
use hour_tracker::store::{EntryStore, MemoryEntryStore};
use hour_tracker::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default level
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = Config::load().context("loading config")?;

    let store: Arc<dyn EntryStore> = if config.uses_memory_store() {
        info!("Using in-memory entry store; nothing will be persisted");
        Arc::new(MemoryEntryStore::new())
    } else {
        Arc::new(
            SqliteEntryStore::open(&config.database_path)
                .with_context(|| format!("opening {}", config.database_path.display()))?,
        )
    };

    let app = router(AppState::new(store, config.predefined_tags.clone()));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("Server running on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
