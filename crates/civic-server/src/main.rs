mod config;

use std::sync::Arc;

use civic_api::moderation::ModerationClient;
use civic_api::state::AppStateInner;
use civic_core::Store;
use civic_core::store::blocking;
use civic_db::Database;
use civic_types::models::Role;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "civic=debug,civic_api=debug,civic_core=debug,civic_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let store: Arc<dyn Store> = Arc::new(Database::open(&config.db_path)?);

    if let Some(email) = config.bootstrap_admin.clone() {
        let target = email.clone();
        if blocking(&store, move |s| s.set_user_role(&target, Role::Admin)).await? {
            info!("Granted admin role to {}", email);
        } else {
            warn!("CIVIC_BOOTSTRAP_ADMIN: no user registered with {}", email);
        }
    }

    let moderator = if config.moderation_disabled {
        warn!("Moderation disabled; content is stored unscored");
        ModerationClient::disabled()
    } else {
        info!("Moderation oracle at {}", config.moderation_url);
        ModerationClient::new(&config.moderation_url, config.moderation_timeout)?
    };

    let state = AppStateInner::new(store, moderator, config.jwt_secret, config.token_ttl);

    let app = civic_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Civic server listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
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
                error!("Failed to install SIGTERM handler: {}", e);
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
