//! Steam Web API player lookup.
//!
//! Used at registration time to confirm that a Steam ID belongs to a real
//! profile and to show its public details.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Player summaries endpoint of the Steam Web API
pub const STEAM_API_URL: &str = "https://api.steampowered.com/ISteamUser/GetPlayerSummaries/v0002/";

/// Steam lookup errors
#[derive(Debug, Error)]
pub enum SteamError {
    /// API key rejected
    #[error("Unauthorized - Invalid API key")]
    Unauthorized,

    /// No profile with the given ID
    #[error("User doesn't exist on Steam")]
    NotFound,

    /// Steam answered with an unexpected status
    #[error("Steam API returned status {0}")]
    Upstream(u16),

    /// Transport or decoding failure
    #[error("Steam request failed: {0}")]
    Request(reqwest::Error),
}

impl From<reqwest::Error> for SteamError {
    /// The request URL carries the API key, so it is dropped from the error.
    fn from(err: reqwest::Error) -> Self {
        SteamError::Request(err.without_url())
    }
}

impl SteamError {
    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            SteamError::Upstream(_) | SteamError::Request(_) => {
                "Error contacting Steam API".to_string()
            }
            _ => self.to_string(),
        }
    }
}

pub type SteamResult<T> = Result<T, SteamError>;

/// Public profile fields returned by `GetPlayerSummaries`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteamProfile {
    pub steamid: String,
    pub personaname: String,
    pub profileurl: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub avatarmedium: Option<String>,
    #[serde(default)]
    pub avatarfull: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummariesEnvelope {
    #[serde(default)]
    response: Summaries,
}

#[derive(Debug, Default, Deserialize)]
struct Summaries {
    #[serde(default)]
    players: Vec<SteamProfile>,
}

/// Client for the Steam Web API
#[derive(Clone)]
pub struct SteamClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SteamClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: STEAM_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Look up a player by 64-bit Steam ID
    ///
    /// # Errors
    ///
    /// * `SteamError::NotFound` - Steam knows no such player
    /// * `SteamError::Unauthorized` - API key rejected
    /// * `SteamError::Upstream` - Any other non-success status
    pub async fn player_summary(&self, steam_id: &str) -> SteamResult<SteamProfile> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("key", self.api_key.as_str()), ("steamids", steam_id)])
            .send()
            .await?;

        match response.status().as_u16() {
            200 => {}
            401 | 403 => return Err(SteamError::Unauthorized),
            status => return Err(SteamError::Upstream(status)),
        }

        let body = response.text().await?;
        first_player(&body)
    }
}

/// Extract the first player from a `GetPlayerSummaries` body.
fn first_player(body: &str) -> SteamResult<SteamProfile> {
    let envelope: SummariesEnvelope =
        serde_json::from_str(body).map_err(|_| SteamError::Upstream(200))?;

    envelope
        .response
        .players
        .into_iter()
        .next()
        .ok_or(SteamError::NotFound)
}
