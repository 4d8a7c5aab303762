//! Steam Web API client.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{
    AppListResponse, Envelope, FamilyGroupResponse, OwnedGame, OwnedGamesResponse, SharedApp,
    SharedLibraryResponse, VanityUrlResponse,
};

const DEFAULT_BASE_URL: &str = "https://api.steampowered.com";

/// Errors from the Steam client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid family group id: {0}")]
    InvalidFamilyGroup(String),

    #[error("invalid steam id: {0}")]
    InvalidSteamId(String),
}

/// Steam Web API client.
///
/// The Web API key authenticates the public endpoints; family library
/// endpoints instead take a per-user access token.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl Client {
    /// Creates a new client with the given Web API key.
    pub fn new(api_key: &str, response_timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(response_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Sets a custom base URL (for testing).
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Performs a GET request and decodes the JSON body.
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = format!("{}{}", self.base_url, endpoint);
        let resp = self.http.get(&url).query(params).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Returns the games owned by a user, with lifetime playtime.
    ///
    /// A private profile yields an empty list rather than an error.
    pub async fn owned_games(&self, steam_user_id: u64) -> Result<Vec<OwnedGame>, Error> {
        let params = [
            ("key", self.api_key.clone()),
            ("steamid", steam_user_id.to_string()),
            ("format", "json".to_string()),
            ("include_appinfo", "true".to_string()),
            ("include_extended_appinfo", "true".to_string()),
        ];
        let resp: Envelope<OwnedGamesResponse> = self
            .get("/IPlayerService/GetOwnedGames/v0001", &params)
            .await?;
        debug!(
            steam_user_id,
            games = resp.response.games.len(),
            "fetched owned games"
        );
        Ok(resp.response.games)
    }

    /// Returns the family group the user belongs to, if any.
    pub async fn family_group_for_user(
        &self,
        steam_user_id: u64,
        access_token: &str,
    ) -> Result<Option<u64>, Error> {
        let params = [
            ("access_token", access_token.to_string()),
            ("steamid", steam_user_id.to_string()),
            ("include_family_group_response", "true".to_string()),
        ];
        let resp: Envelope<FamilyGroupResponse> = self
            .get("/IFamilyGroupsService/GetFamilyGroupForUser/v1/", &params)
            .await?;

        match resp.response.family_groupid {
            None => Ok(None),
            Some(id) => id
                .parse::<u64>()
                .map(Some)
                .map_err(|_| Error::InvalidFamilyGroup(id)),
        }
    }

    /// Returns the apps shared within a family group, including the
    /// caller's own.
    ///
    /// Apps owned by several members appear once, at their first position.
    pub async fn shared_library_apps(
        &self,
        family_group_id: u64,
        access_token: &str,
    ) -> Result<Vec<SharedApp>, Error> {
        let params = [
            ("access_token", access_token.to_string()),
            ("include_own", "true".to_string()),
            ("family_groupid", family_group_id.to_string()),
        ];
        let resp: Envelope<SharedLibraryResponse> = self
            .get("/IFamilyGroupsService/GetSharedLibraryApps/v1/", &params)
            .await?;

        let mut seen = HashSet::new();
        let apps: Vec<SharedApp> = resp
            .response
            .apps
            .into_iter()
            .filter(|app| seen.insert(app.appid))
            .collect();
        debug!(family_group_id, apps = apps.len(), "fetched shared library");
        Ok(apps)
    }

    /// Resolves a profile vanity name (the `<name>` in
    /// `steamcommunity.com/id/<name>`) to a 64-bit Steam id.
    ///
    /// Returns `None` when Steam reports no match.
    pub async fn resolve_vanity_url(&self, vanity: &str) -> Result<Option<u64>, Error> {
        let params = [
            ("key", self.api_key.clone()),
            ("vanityurl", vanity.to_string()),
        ];
        let resp: Envelope<VanityUrlResponse> = self
            .get("/ISteamUser/ResolveVanityURL/v0001/", &params)
            .await?;

        if resp.response.success != 1 {
            debug!(vanity, message = %resp.response.message, "vanity url not resolved");
            return Ok(None);
        }
        match resp.response.steamid {
            None => Ok(None),
            Some(id) => id
                .parse::<u64>()
                .map(Some)
                .map_err(|_| Error::InvalidSteamId(id)),
        }
    }

    /// Returns the global app id → name table. Blank names are dropped.
    pub async fn app_list(&self) -> Result<HashMap<u32, String>, Error> {
        let resp: AppListResponse = self.get("/ISteamApps/GetAppList/v2/", &[]).await?;
        Ok(resp
            .applist
            .apps
            .into_iter()
            .filter(|app| !app.name.trim().is_empty())
            .map(|app| (app.appid, app.name))
            .collect())
    }
}
