//! slotbook server - Job Interview Booking API
//!
//! Starts the Axum REST server over the Sled entity store.
//! - Storage: Sled trees of serde-JSON documents (users, companies, bookings)
//! - Auth: JWT bearer tokens, bcrypt password hashes
//! - Docs: Swagger UI on /api-docs
//!
//! Usage:
//!   cargo run --bin seed        # create admin account + sample companies
//!   cargo run --bin slotbook    # start server

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use slotbook::mail::Mailer;
use slotbook::rest::{create_router, AppState};
use slotbook::storage::Storage;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let bind = std::env::var("SLOTBOOK_BIND").unwrap_or_else(|_| "0.0.0.0".into());
    let port = std::env::var("SLOTBOOK_PORT").unwrap_or_else(|_| "5001".into());
    let data_dir = std::env::var("SLOTBOOK_DATA_DIR").unwrap_or_else(|_| "./slotbook_data".into());
    let jwt_ttl_secs: u64 = std::env::var("SLOTBOOK_JWT_TTL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3600);
    let jwt_secret = match std::env::var("SLOTBOOK_JWT_SECRET") {
        Ok(secret) => secret,
        Err(_) => {
            warn!("SLOTBOOK_JWT_SECRET not set, using insecure development secret");
            "slotbook-dev-secret".into()
        }
    };
    let mail_webhook = std::env::var("SLOTBOOK_MAIL_WEBHOOK").ok();

    let storage = Storage::open(&data_dir)?;
    let state = Arc::new(AppState {
        storage,
        mailer: Arc::new(Mailer::new(mail_webhook.clone())),
        jwt_secret: jwt_secret.into_bytes(),
        jwt_ttl_secs,
    });
    let app = create_router(state);

    let addr = format!("{bind}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("slotbook listening on {addr}");
    info!("  data_dir: {data_dir}");
    info!("  swagger: http://{addr}/api-docs");
    info!("  mail: {}", if mail_webhook.is_some() { "webhook" } else { "log only" });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("slotbook stopped");
    Ok(())
}

/// Resolves on ctrl-c or SIGTERM so in-flight requests can drain.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
