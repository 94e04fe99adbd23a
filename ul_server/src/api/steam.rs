//! Steam profile lookup endpoint.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use user_login::steam::{SteamError, SteamProfile};

use super::AppState;

pub const STEAM_FOUND_MESSAGE: &str = "Steam user found successfully.";
pub const STEAM_DISABLED_MESSAGE: &str = "Steam lookup is not configured";

#[derive(Debug, Deserialize)]
pub struct SteamQuery {
    pub steam_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SteamResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steam_details: Option<SteamProfile>,
}

impl SteamResponse {
    fn failure(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                status_code: status.as_u16(),
                message: message.into(),
                steam_details: None,
            }),
        )
    }
}

/// Look up a Steam profile by its 64-bit ID.
///
/// # Errors
///
/// - `401 Unauthorized`: Steam rejected the API key
/// - `404 Not Found`: No such Steam user
/// - `500 Internal Server Error`: Steam unreachable or answered unexpectedly
/// - `503 Service Unavailable`: No API key configured
pub async fn validate_steam_id(
    State(state): State<AppState>,
    Query(query): Query<SteamQuery>,
) -> (StatusCode, Json<SteamResponse>) {
    let Some(steam) = state.steam.as_ref() else {
        return SteamResponse::failure(StatusCode::SERVICE_UNAVAILABLE, STEAM_DISABLED_MESSAGE);
    };

    match steam.player_summary(query.steam_id.trim()).await {
        Ok(profile) => (
            StatusCode::OK,
            Json(SteamResponse {
                status_code: StatusCode::OK.as_u16(),
                message: STEAM_FOUND_MESSAGE.to_string(),
                steam_details: Some(profile),
            }),
        ),
        Err(e) => {
            let status = match e {
                SteamError::Unauthorized => StatusCode::UNAUTHORIZED,
                SteamError::NotFound => StatusCode::NOT_FOUND,
                SteamError::Upstream(_) | SteamError::Request(_) => {
                    tracing::error!(error = %e, "Steam lookup failed");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            SteamResponse::failure(status, e.client_message())
        }
    }
}
