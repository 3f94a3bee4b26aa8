//! Spotify Web API client for the `SpotifyPlayer` / `SpotifyPauser` tools.
//!
//! Auth is the refresh-token grant: the long-lived refresh token from the
//! environment is exchanged for a short-lived access token, which is cached
//! until shortly before it expires.

use serde::Deserialize;
use serde_json::json;
use similar::TextDiff;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::ToolError;
use crate::config::{SpotifyConfig, SpotifyCredentials};

const NOT_CONNECTED: &str = "Spotify is not connected.";
const SEARCH_LIMIT: &str = "5";
/// Refresh this many seconds before the reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<Track>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
    pub name: String,
}

impl Track {
    fn artist_line(&self) -> String {
        if self.artists.is_empty() {
            return "unknown artist".to_string();
        }
        self.artists.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", ")
    }
}

struct CachedToken {
    value: String,
    expires_at: i64,
}

pub struct SpotifyClient {
    http: reqwest::Client,
    config: SpotifyConfig,
    credentials: SpotifyCredentials,
    token: Mutex<Option<CachedToken>>,
}

/// Spotify availability, decided once at startup.
pub enum SpotifyHandle {
    Connected(SpotifyClient),
    Disconnected,
}

impl SpotifyHandle {
    /// Try to authenticate. Missing credentials or a failed first token
    /// exchange yield `Disconnected` for the rest of the process.
    pub async fn connect(config: SpotifyConfig, credentials: Option<SpotifyCredentials>) -> Self {
        let Some(credentials) = credentials else {
            info!("spotify credentials not set; spotify tools disabled");
            return SpotifyHandle::Disconnected;
        };
        let client = match SpotifyClient::new(config, credentials) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "spotify client setup failed; spotify tools disabled");
                return SpotifyHandle::Disconnected;
            }
        };
        match client.access_token().await {
            Ok(_) => {
                info!("spotify connected");
                SpotifyHandle::Connected(client)
            }
            Err(e) => {
                warn!(error = %e, "spotify auth failed; spotify tools disabled");
                SpotifyHandle::Disconnected
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, SpotifyHandle::Connected(_))
    }

    pub async fn play(&self, song: &str) -> Result<String, ToolError> {
        match self {
            SpotifyHandle::Connected(c) => c.play(song).await,
            SpotifyHandle::Disconnected => Ok(NOT_CONNECTED.to_string()),
        }
    }

    pub async fn pause(&self) -> String {
        match self {
            SpotifyHandle::Connected(c) => match c.pause().await {
                Ok(()) => "Music paused on Spotify.".to_string(),
                Err(e) => format!("Could not pause Spotify. Maybe nothing is playing? Error: {e}"),
            },
            SpotifyHandle::Disconnected => NOT_CONNECTED.to_string(),
        }
    }
}

impl SpotifyClient {
    pub fn new(config: SpotifyConfig, credentials: SpotifyCredentials) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self { http, config, credentials, token: Mutex::new(None) })
    }

    async fn access_token(&self) -> Result<String, ToolError> {
        let mut cached = self.token.lock().await;
        let now = now_unix();
        if let Some(tok) = cached.as_ref()
            && tok.expires_at > now + EXPIRY_MARGIN_SECS
        {
            return Ok(tok.value.clone());
        }

        debug!("refreshing spotify access token");
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", self.credentials.refresh_token.as_str()),
        ];
        let res = self
            .http
            .post(&self.config.token_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&form)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ToolError::Api(format!("token refresh failed: HTTP {status}: {body}")));
        }
        let token = res.json::<TokenResponse>().await?;
        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: now + token.expires_in.unwrap_or(3600),
        });
        Ok(value)
    }

    async fn search(&self, song: &str) -> Result<Vec<Track>, ToolError> {
        let token = self.access_token().await?;
        let query = format!("track:\"{song}\"");
        let res = self
            .http
            .get(format!("{}/search", self.config.api_base_url))
            .bearer_auth(token)
            .query(&[("q", query.as_str()), ("type", "track"), ("limit", SEARCH_LIMIT)])
            .send()
            .await?;
        let res = ok(res).await?;
        Ok(res.json::<SearchResponse>().await?.tracks.items)
    }

    async fn play(&self, song: &str) -> Result<String, ToolError> {
        let song = song.trim();
        if song.is_empty() {
            return Err(ToolError::InvalidInput("no song name given".into()));
        }
        let tracks = self.search(song).await?;
        let Some(track) = best_match(song, &tracks) else {
            return Ok(format!("Could not find the song: {song}"));
        };
        debug!(track = %track.name, uri = %track.uri, "starting playback");

        let token = self.access_token().await?;
        let res = self
            .http
            .put(format!("{}/me/player/play", self.config.api_base_url))
            .bearer_auth(token)
            .json(&json!({ "uris": [track.uri] }))
            .send()
            .await?;
        ok(res).await?;
        Ok(format!("Playing {} by {} on Spotify.", track.name, track.artist_line()))
    }

    async fn pause(&self) -> Result<(), ToolError> {
        let token = self.access_token().await?;
        let res = self
            .http
            .put(format!("{}/me/player/pause", self.config.api_base_url))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_LENGTH, "0")
            .send()
            .await?;
        ok(res).await?;
        Ok(())
    }
}

async fn ok(res: reqwest::Response) -> Result<reqwest::Response, ToolError> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status();
    let body = res.text().await.unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(ToolError::Api(format!("HTTP {status}: {body}")))
}

/// Pick the track whose name is most similar to `query` (case-insensitive,
/// character ratio). Ties keep the earlier search result.
pub fn best_match<'a>(query: &str, tracks: &'a [Track]) -> Option<&'a Track> {
    let query = query.to_lowercase();
    let mut best: Option<(&Track, f32)> = None;
    for track in tracks {
        let name = track.name.to_lowercase();
        let score = TextDiff::from_chars(query.as_str(), name.as_str()).ratio();
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((track, score)),
        }
    }
    best.map(|(t, _)| t)
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str) -> Track {
        Track {
            name: name.into(),
            uri: format!("spotify:track:{}", name.len()),
            artists: vec![Artist { name: "Linkin Park".into() }],
        }
    }

    #[test]
    fn best_match_prefers_closest_name() {
        let tracks = [track("Numb / Encore"), track("Numb"), track("Numbers")];
        assert_eq!(best_match("numb", &tracks).unwrap().name, "Numb");
    }

    #[test]
    fn best_match_is_case_insensitive() {
        let tracks = [track("In The End"), track("IN THE END (Live)")];
        assert_eq!(best_match("in the end", &tracks).unwrap().name, "In The End");
    }

    #[test]
    fn best_match_ties_keep_first() {
        let tracks = [track("abc"), track("abc")];
        let picked = best_match("abc", &tracks).unwrap();
        assert!(std::ptr::eq(picked, &tracks[0]));
    }

    #[test]
    fn best_match_empty() {
        assert!(best_match("anything", &[]).is_none());
    }

    #[test]
    fn parses_search_page() {
        let body = r#"{"tracks":{"items":[{"name":"Numb","uri":"spotify:track:1","artists":[{"name":"Linkin Park"},{"name":"Jay-Z"}]}]}}"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.tracks.items[0].artist_line(), "Linkin Park, Jay-Z");
    }

    #[tokio::test]
    async fn missing_credentials_disconnects() {
        let config = SpotifyConfig {
            api_base_url: "http://127.0.0.1:9/v1".into(),
            token_url: "http://127.0.0.1:9/token".into(),
        };
        let handle = SpotifyHandle::connect(config, None).await;
        assert!(!handle.is_connected());
        assert_eq!(handle.pause().await, NOT_CONNECTED);
    }

    #[tokio::test]
    async fn failed_token_exchange_disconnects() {
        let config = SpotifyConfig {
            api_base_url: "http://127.0.0.1:9/v1".into(),
            token_url: "http://127.0.0.1:9/token".into(),
        };
        let creds = SpotifyCredentials {
            client_id: "id".into(),
            client_secret: "secret".into(),
            refresh_token: "refresh".into(),
        };
        let handle = SpotifyHandle::connect(config, Some(creds)).await;
        assert!(!handle.is_connected());
        assert_eq!(handle.play("Numb").await.unwrap(), NOT_CONNECTED);
    }
}
