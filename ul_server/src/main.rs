//! User login server.
//!
//! Serves registration, login, logout and token validation over HTTP,
//! backed by PostgreSQL.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Error};
use log::{info, warn};
use pico_args::Arguments;
use ul_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging, metrics,
};
use user_login::{
    auth::{FirebaseVerifier, PasswordHasher, SessionManager, TokenCodec},
    db::{Database, PgUserDirectory},
    steam::SteamClient,
};

const HELP: &str = "\
Run the user login server

USAGE:
  ul_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8001]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or DB_* parts]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                   Server bind address (e.g., 0.0.0.0:8001)
  DATABASE_URL                  PostgreSQL connection string
  DB_HOST, DB_PORT, DB_USER, DB_PASSWORD, DB_NAME
                                Connection parts used when DATABASE_URL is unset
  JWT_SECRET_KEY                Token signing secret (required, >= 32 chars)
  ALGORITHM                     HS256, HS384 or HS512 [default: HS256]
  ACCESS_TOKEN_EXPIRE_MINUTES   Token lifetime [default: 30]
  PASSWORD_PEPPER               Password hashing pepper (required, >= 16 chars)
  FIREBASE_PROJECT_ID           Enables /login-google
  STEAM_API_KEY                 Enables /steam/validate
  CORS_ALLOWED_ORIGINS          Comma-separated origins [default: any]
  METRICS_BIND                  Prometheus exporter address [default: disabled]
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs
            .opt_value_from_str("--bind")
            .context("Invalid --bind address")?,
        database_url: pargs
            .opt_value_from_str("--db-url")
            .context("Invalid --db-url")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    info!("Starting user login server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exporter listening on {}", addr);
    }

    info!("Connecting to database: {}", config.database.describe());
    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    db.health_check()
        .await
        .context("Database health check failed")?;
    db.migrate().await.context("Failed to run migrations")?;
    info!("Database connected and migrated");

    let directory = PgUserDirectory::new(db.pool().clone())
        .with_query_timeout(Duration::from_secs(config.database.query_timeout_secs));

    let codec = TokenCodec::new(
        config.security.jwt_secret.as_bytes(),
        config.token.algorithm,
        config.token.ttl(),
    )?;
    let hasher = PasswordHasher::new(config.security.password_pepper.clone());

    let mut sessions = SessionManager::new(Arc::new(directory), codec, hasher);
    match &config.integrations.firebase_project_id {
        Some(project_id) => {
            info!("Federated login enabled for Firebase project {}", project_id);
            sessions = sessions.with_identity_verifier(Arc::new(FirebaseVerifier::new(project_id)));
        }
        None => warn!("FIREBASE_PROJECT_ID not set, /login-google is disabled"),
    }

    let mut state = AppState::new(sessions);
    match &config.integrations.steam_api_key {
        Some(key) => state = state.with_steam(SteamClient::new(key.clone())),
        None => warn!("STEAM_API_KEY not set, /steam/validate is disabled"),
    }

    let app = api::create_router(state, api::cors_layer(&config.cors_allowed_origins));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
