//! # Bug Imprints API Server
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/bugimprints \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! cargo run -p bugimprints-api
//! ```

use bugimprints_api::{
    app::{build_router, AppState},
    config::Config,
};
use bugimprints_shared::{
    auth::password,
    db::{migrations, pool},
    services::accounts,
    storage::LocalMediaStorage,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bugimprints_api=debug,bugimprints_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Bug Imprints API v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let mut db_config = pool::DatabaseConfig::new(config.database.url.clone());
    db_config.max_connections = config.database.max_connections;

    migrations::ensure_database_exists(&db_config.url).await?;
    let db = pool::create_pool(db_config).await?;
    migrations::run_migrations(&db).await?;

    if let Some(bootstrap) = &config.bootstrap {
        let password_hash = password::hash_password(&bootstrap.password)?;
        match accounts::bootstrap_superuser(&db, &bootstrap.email, password_hash).await? {
            Some(user) => tracing::info!(user_id = %user.id, "Created bootstrap superuser"),
            None => tracing::debug!("Superuser already present, skipping bootstrap"),
        }
    }

    tokio::fs::create_dir_all(&config.media.root).await?;
    let storage = Arc::new(LocalMediaStorage::new(config.media.root.clone()));

    let address = config.bind_address();
    let state = AppState::new(db.clone(), config, storage);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool::close_pool(db).await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
