//! Tools subsystem: the static registry of side-effecting tools the model
//! may ask for.
//!
//! Every tool has the same contract: one string in, one string out. The
//! registry is assembled once at startup by [`standard_registry`] and never
//! changes afterwards.

pub mod launcher;
pub mod spotify;
pub mod weather;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::config::ToolsConfig;
use crate::llm::ToolSpec;
use spotify::SpotifyHandle;
use weather::WeatherTool;

pub const WEATHER: &str = "Weather";
pub const SPOTIFY_PLAYER: &str = "SpotifyPlayer";
pub const SPOTIFY_PAUSER: &str = "SpotifyPauser";
pub const WEBSITE_OPENER: &str = "WebsiteOpener";
pub const APP_FINDER: &str = "AppFinder";
pub const APP_OPENER: &str = "AppOpener";

/// Failure of a single tool invocation. The `Display` text is what the user
/// sees after `"{name} error: "`.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("{0}")]
    Api(String),
    #[error("could not launch {0}")]
    Launch(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for ToolError {
    fn from(e: reqwest::Error) -> Self {
        ToolError::Http(e.to_string())
    }
}

pub type ToolFuture = Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'static>>;

/// A registered tool body.
pub type ToolFn = Arc<dyn Fn(String) -> ToolFuture + Send + Sync>;

struct ToolEntry {
    spec: ToolSpec,
    handler: ToolFn,
}

/// Name → tool mapping. Insertion order is kept for the declarations sent
/// to the model.
#[derive(Default)]
pub struct ToolRegistry {
    entries: HashMap<&'static str, ToolEntry>,
    order: Vec<&'static str>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. A second registration under the same name replaces the first.
    pub fn with_tool<F, Fut>(mut self, name: &'static str, description: &'static str, f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        let handler: ToolFn = Arc::new(move |input: String| Box::pin(f(input)) as ToolFuture);
        if !self.entries.contains_key(name) {
            self.order.push(name);
        }
        self.entries.insert(name, ToolEntry { spec: ToolSpec { name, description }, handler });
        self
    }

    pub fn get(&self, name: &str) -> Option<ToolFn> {
        self.entries.get(name).map(|e| e.handler.clone())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.order.clone()
    }

    /// Declarations advertised to the model, in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter_map(|n| self.entries.get(n))
            .map(|e| e.spec.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the six built-in tools.
pub fn standard_registry(config: &ToolsConfig, spotify: SpotifyHandle) -> Result<ToolRegistry, ToolError> {
    let weather = Arc::new(WeatherTool::new(config.weather.clone())?);
    let spotify = Arc::new(spotify);
    let player = spotify.clone();
    let pauser = spotify;

    Ok(ToolRegistry::new()
        .with_tool(
            WEATHER,
            "Useful for when you need to get the current weather. Input is a place name; \
             the location is inferred automatically if not provided.",
            move |input| {
                let weather = weather.clone();
                async move { Ok(weather.report(&input).await) }
            },
        )
        .with_tool(
            APP_FINDER,
            "Useful for finding the installation path of an application. \
             Input should be the name of the application executable, e.g. 'firefox'.",
            |input| async move { Ok(launcher::find_app(&input)) },
        )
        .with_tool(
            APP_OPENER,
            "Useful for opening an application. \
             Input should be the name of the application executable, e.g. 'firefox'.",
            |input| async move { launcher::open_app(&input) },
        )
        .with_tool(
            SPOTIFY_PLAYER,
            "Useful for playing a song on Spotify. Input should be the name of the song.",
            move |input| {
                let player = player.clone();
                async move { player.play(&input).await }
            },
        )
        .with_tool(
            SPOTIFY_PAUSER,
            "Useful for pausing the current music on Spotify. No input is required.",
            move |_input| {
                let pauser = pauser.clone();
                async move { Ok(pauser.pause().await) }
            },
        )
        .with_tool(
            WEBSITE_OPENER,
            "Useful for opening a website. Input should be the URL of the website.",
            |input| async move { launcher::open_website(&input) },
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SpotifyConfig, WeatherConfig};

    fn tools_config() -> ToolsConfig {
        ToolsConfig {
            weather: WeatherConfig {
                geocoding_url: "http://localhost:0/search".into(),
                forecast_url: "http://localhost:0/forecast".into(),
                ip_lookup_url: "http://localhost:0/ip".into(),
            },
            spotify: SpotifyConfig {
                api_base_url: "http://localhost:0/v1".into(),
                token_url: "http://localhost:0/token".into(),
            },
        }
    }

    #[test]
    fn standard_registry_has_all_tools_in_order() {
        let reg = standard_registry(&tools_config(), SpotifyHandle::Disconnected).unwrap();
        assert_eq!(
            reg.names(),
            [WEATHER, APP_FINDER, APP_OPENER, SPOTIFY_PLAYER, SPOTIFY_PAUSER, WEBSITE_OPENER]
        );
        assert_eq!(reg.specs().len(), 6);
        assert!(reg.get("Calculator").is_none());
    }

    #[tokio::test]
    async fn disconnected_spotify_reports_fixed_message() {
        let reg = standard_registry(&tools_config(), SpotifyHandle::Disconnected).unwrap();
        let play = reg.get(SPOTIFY_PLAYER).unwrap();
        assert_eq!(play("Numb".into()).await.unwrap(), "Spotify is not connected.");
        let pause = reg.get(SPOTIFY_PAUSER).unwrap();
        assert_eq!(pause(String::new()).await.unwrap(), "Spotify is not connected.");
    }

    #[tokio::test]
    async fn re_registering_replaces_without_duplicating() {
        let reg = ToolRegistry::new()
            .with_tool("Echo", "first", |i| async move { Ok(i) })
            .with_tool("Echo", "second", |i| async move { Ok(i.to_uppercase()) });
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.specs()[0].description, "second");
        assert_eq!(reg.get("Echo").unwrap()("hi".into()).await.unwrap(), "HI");
    }
}
