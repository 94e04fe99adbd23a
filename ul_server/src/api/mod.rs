//! HTTP API for the login service.
//!
//! # Modules
//!
//! - [`auth`]: Registration, login, logout and token validation
//! - [`steam`]: Steam profile lookup
//! - [`request_id`]: Request correlation middleware
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health            - Liveness probe
//! POST /register          - Register a local account
//! POST /login             - Login with email and password
//! POST /login-google      - Login with a Firebase ID token (bearer)
//! POST /logout            - Revoke the bearer token
//! POST /validate-token    - Resolve the bearer token to its user
//! GET  /steam/validate    - Look up a Steam profile (?steam_id=)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use chrono::Duration;
//! use std::sync::Arc;
//! use tower_http::cors::CorsLayer;
//! use ul_server::api::{AppState, create_router};
//! use user_login::auth::{PasswordHasher, SessionManager, TokenCodec, codec::Algorithm};
//! use user_login::db::MemoryUserDirectory;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sessions = SessionManager::new(
//!     Arc::new(MemoryUserDirectory::new()),
//!     TokenCodec::new(b"jwt_secret", Algorithm::HS256, Duration::minutes(30))?,
//!     PasswordHasher::new("pepper"),
//! );
//! let state = AppState::new(sessions);
//!
//! let app = create_router(state, CorsLayer::permissive());
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8001").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod request_id;
pub mod steam;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    response::Json,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use user_login::{SessionManager, auth::MessageResponse, steam::SteamClient};

/// Liveness message returned by `/health`
pub const HEALTH_MESSAGE: &str = "Service is up and running";

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    /// `None` when no Steam API key is configured
    pub steam: Option<Arc<SteamClient>>,
}

impl AppState {
    pub fn new(sessions: SessionManager) -> Self {
        Self {
            sessions: Arc::new(sessions),
            steam: None,
        }
    }

    pub fn with_steam(mut self, steam: SteamClient) -> Self {
        self.steam = Some(Arc::new(steam));
        self
    }
}

/// Build the CORS layer: permissive when no origins are given.
///
/// Origins that are not valid header values are skipped with a warning.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([HeaderName::from_static(request_id::REQUEST_ID_HEADER)])
}

/// Create the API router with all endpoints and middleware.
pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/login-google", post(auth::login_federated))
        .route("/logout", post(auth::logout))
        .route("/validate-token", post(auth::validate_token))
        .route("/steam/validate", get(steam::validate_steam_id))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
        .with_state(state)
}

/// Liveness probe; does not touch the database.
async fn health_check() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: HEALTH_MESSAGE.to_string(),
    })
}
