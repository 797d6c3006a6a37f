//! HTTP client for the jukebox backend.

use beats_proto::protocol::{
    routes, Album, Command, EqualizerInfo, LoginResponse, NowPlaying, QueueResponse,
    SearchResponse, SessionInfo, SessionUser, Song,
};
use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;

/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct BeatsApi {
    http: reqwest::Client,
    base_url: String,
}

impl BeatsApi {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("beats/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_status(status))
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let response = self.http.get(self.url(path)).query(query).send().await?;
        let body = Self::check(response)?.json::<T>().await?;
        Ok(body)
    }

    // ── Catalogue ────────────────────────────────────────────────────────────

    pub async fn search_songs(&self, query: &str) -> Result<Vec<Song>, ApiError> {
        let resp: SearchResponse<Song> = self.get_json(routes::SEARCH, &[("q", query)]).await?;
        Ok(resp.results)
    }

    /// Same endpoint as `search_songs`; `artist:` queries answer with albums.
    pub async fn search_albums(&self, query: &str) -> Result<Vec<Album>, ApiError> {
        let resp: SearchResponse<Album> = self.get_json(routes::SEARCH, &[("q", query)]).await?;
        Ok(resp.results)
    }

    pub async fn random_songs(&self) -> Result<Vec<Song>, ApiError> {
        let resp: SearchResponse<Song> = self.get_json(routes::RANDOM, &[]).await?;
        Ok(resp.results)
    }

    // ── Player ───────────────────────────────────────────────────────────────

    pub async fn equalizer_info(&self) -> Result<EqualizerInfo, ApiError> {
        self.get_json(routes::EQUALIZER, &[]).await
    }

    pub async fn now_playing(&self) -> Result<NowPlaying, ApiError> {
        self.get_json(routes::NOW_PLAYING, &[]).await
    }

    /// The full queue.  With a user name the backend fills in `has_voted`.
    pub async fn queue(&self, user: Option<&str>) -> Result<QueueResponse, ApiError> {
        match user {
            Some(name) => self.get_json(routes::QUEUE, &[("user", name)]).await,
            None => self.get_json(routes::QUEUE, &[]).await,
        }
    }

    /// POST an authenticated command as a form with the session token.
    pub async fn send(&self, token: &str, command: &Command) -> Result<(), ApiError> {
        let mut form = vec![("token", token.to_string())];
        form.extend(command.form());
        debug!("POST {} {:?}", command.endpoint(), command);
        let response = self
            .http
            .post(self.url(command.endpoint()))
            .form(&form)
            .send()
            .await?;
        Self::check(response)?;
        Ok(())
    }

    // ── Session ──────────────────────────────────────────────────────────────

    /// Returns the new session token.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .post(self.url(routes::SESSION))
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        let body: LoginResponse = Self::check(response)?.json().await?;
        Ok(body.token)
    }

    pub async fn logout(&self, token: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("{}/{}", routes::SESSION, token));
        let response = self.http.delete(url).send().await?;
        Self::check(response)?;
        Ok(())
    }

    pub async fn validate(&self, token: &str) -> Result<SessionUser, ApiError> {
        let info: SessionInfo = self
            .get_json(&format!("{}/{}", routes::SESSION, token), &[])
            .await?;
        Ok(info.user)
    }
}
