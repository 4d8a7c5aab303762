//! SteamGridDB API client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{ApiResponse, GameDetail, GridsPage, ImageData};

const DEFAULT_BASE_URL: &str = "https://www.steamgriddb.com/api/v2";

/// Errors from the SteamGridDB client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid API key")]
    InvalidKey,
}

impl Error {
    /// Returns `true` if SteamGridDB answered 404 for the requested resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// SteamGridDB API client.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Creates a new client with the given API key.
    ///
    /// `response_timeout` bounds every metadata request.
    pub fn new(api_key: &str, response_timeout: Duration) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| Error::InvalidKey)?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(response_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Sets a custom base URL (for testing).
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Performs an authenticated GET request and decodes the JSON body.
    ///
    /// A 404 becomes [`Error::NotFound`] naming `resource`; any other
    /// non-success status becomes [`Error::Api`].
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        resource: &str,
    ) -> Result<T, Error> {
        let url = format!("{}{}", self.base_url, endpoint);
        let resp = self.http.get(&url).query(params).send().await?;
        let status = resp.status();

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                resource: resource.to_string(),
            });
        }
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

    /// Resolves a Steam app id to the SteamGridDB game id.
    pub async fn game_id_for_steam_app(&self, steam_app_id: u64) -> Result<i64, Error> {
        let resp: ApiResponse<GameDetail> = self
            .get(
                &format!("/games/steam/{steam_app_id}"),
                &[],
                &format!("SteamGridDB game for steam app {steam_app_id}"),
            )
            .await?;
        Ok(resp.data.id)
    }

    /// Returns one page of grid images for a game, static and animated.
    pub async fn grids_page(&self, game_id: i64, page: u32) -> Result<GridsPage, Error> {
        let params = [
            ("page", page.to_string()),
            ("types", "static,animated".to_string()),
        ];
        self.get(
            &format!("/grids/game/{game_id}"),
            &params,
            &format!("grids for SteamGridDB game {game_id}"),
        )
        .await
    }

    /// Returns every grid image for a game.
    ///
    /// Page 0 tells how many pages exist; the remaining pages are then
    /// requested one after another and appended in provider order.
    pub async fn all_grids(&self, game_id: i64) -> Result<Vec<ImageData>, Error> {
        let first = self.grids_page(game_id, 0).await?;
        let pages = first.page_count();
        let mut grids = first.data;

        for page in 1..pages {
            let next = self.grids_page(game_id, page).await?;
            grids.extend(next.data);
        }

        debug!(game_id, pages, grids = grids.len(), "listed grids");
        Ok(grids)
    }

    /// Resolves a Steam app id and lists all of its grid images.
    pub async fn grids_for_steam_app(&self, steam_app_id: u64) -> Result<Vec<ImageData>, Error> {
        let game_id = self.game_id_for_steam_app(steam_app_id).await?;
        self.all_grids(game_id).await
    }
}
