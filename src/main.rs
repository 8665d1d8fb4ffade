//! Bookstore server binary

use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bookstore::config::Config;
use bookstore::server::{AppState, router::build_router};
use bookstore::storage::mongo::{
    self, MongoBookStore, MongoCartStore, MongoEventStore, MongoOrderStore, MongoSessionStore,
    MongoUserStore,
};
use bookstore::tasks::event_sweep;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bookstore=info,tower_http=info")),
        )
        .init();

    let config = Config::load();

    let client = mongodb::Client::with_uri_str(&config.mongodb_uri).await?;
    let database = client.database(&config.mongodb_db);
    mongo::ensure_indexes(&database).await?;
    info!(db = %config.mongodb_db, "connected to MongoDB");

    let events: Arc<dyn bookstore::storage::EventStore> =
        Arc::new(MongoEventStore::new(database.clone()));
    event_sweep::spawn(events.clone());

    let state = AppState::new(
        Arc::new(MongoBookStore::new(database.clone())),
        Arc::new(MongoUserStore::new(database.clone())),
        Arc::new(MongoCartStore::new(database.clone())),
        Arc::new(MongoOrderStore::new(database.clone())),
        Arc::new(MongoSessionStore::new(database)),
        events,
        Duration::days(config.session_ttl_days),
    );

    let app = build_router(state);
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "bookstore server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
