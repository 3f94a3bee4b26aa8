//! Weather tool: Open-Meteo geocoding + current conditions.
//!
//! Network failures never surface as tool errors: the user gets an apology
//! line with the error text instead.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::ToolError;
use crate::config::WeatherConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Used when the IP lookup itself fails (New Delhi).
const FALLBACK_COORDS: (f64, f64) = (28.61, 77.20);

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeHit>,
}

#[derive(Debug, Deserialize)]
struct GeocodeHit {
    name: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: f64,
}

#[derive(Debug, Deserialize)]
struct IpInfo {
    /// `"lat,lon"`
    loc: Option<String>,
}

pub struct WeatherTool {
    http: reqwest::Client,
    config: WeatherConfig,
}

impl WeatherTool {
    pub fn new(config: WeatherConfig) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, config })
    }

    /// Describe the current weather at `location`, or at the machine's
    /// approximate position when `location` is empty or `"auto"`.
    pub async fn report(&self, location: &str) -> String {
        match self.try_report(location.trim()).await {
            Ok(line) => line,
            Err(e) => format!("Sorry, I couldn't fetch the weather. Error: {e}"),
        }
    }

    async fn try_report(&self, location: &str) -> Result<String, ToolError> {
        let (name, lat, lon) = if location.is_empty() || location.eq_ignore_ascii_case("auto") {
            let (lat, lon) = self.locate_by_ip().await;
            ("your area".to_string(), lat, lon)
        } else {
            match self.geocode(location).await? {
                Some(hit) => (hit.name, hit.latitude, hit.longitude),
                None => return Ok(format!("Could not find location: {location}")),
            }
        };

        let current = self.current_weather(lat, lon).await?;
        Ok(format_report(&name, &current))
    }

    async fn geocode(&self, location: &str) -> Result<Option<GeocodeHit>, ToolError> {
        let res = self
            .http
            .get(&self.config.geocoding_url)
            .query(&[("name", location), ("count", "1")])
            .send()
            .await?;
        let body: GeocodeResponse = ok_json(res).await?;
        Ok(body.results.into_iter().next())
    }

    async fn current_weather(&self, lat: f64, lon: f64) -> Result<CurrentWeather, ToolError> {
        let res = self
            .http
            .get(&self.config.forecast_url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await?;
        let body: ForecastResponse = ok_json(res).await?;
        Ok(body.current_weather)
    }

    async fn locate_by_ip(&self) -> (f64, f64) {
        let lookup = async {
            let res = self.http.get(&self.config.ip_lookup_url).send().await?;
            let info: IpInfo = ok_json(res).await?;
            Ok::<_, ToolError>(info.loc.as_deref().and_then(parse_loc))
        };
        match lookup.await {
            Ok(Some(coords)) => coords,
            Ok(None) => FALLBACK_COORDS,
            Err(e) => {
                debug!(error = %e, "ip location lookup failed; using fallback coordinates");
                FALLBACK_COORDS
            }
        }
    }
}

async fn ok_json<T: serde::de::DeserializeOwned>(res: reqwest::Response) -> Result<T, ToolError> {
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(ToolError::Api(format!("HTTP {status}: {body}")));
    }
    Ok(res.json::<T>().await?)
}

fn parse_loc(loc: &str) -> Option<(f64, f64)> {
    let (lat, lon) = loc.split_once(',')?;
    Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?))
}

fn format_report(name: &str, current: &CurrentWeather) -> String {
    format!(
        "Current temperature in {name} is {}°C with a wind speed of {} km/h.",
        reading(current.temperature),
        reading(current.windspeed)
    )
}

/// Whole readings keep one decimal (`18.0`); others print as reported.
fn reading(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_geocode_results() {
        let body = r#"{"results":[{"name":"Paris","latitude":48.85,"longitude":2.35,"country":"France"}]}"#;
        let parsed: GeocodeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results[0].name, "Paris");
    }

    #[test]
    fn missing_results_means_no_hit() {
        let parsed: GeocodeResponse = serde_json::from_str(r#"{"generationtime_ms":0.2}"#).unwrap();
        assert!(parsed.results.is_empty());
    }

    #[test]
    fn report_line_format() {
        let body = r#"{"current_weather":{"temperature":18.3,"windspeed":9.4,"weathercode":3}}"#;
        let parsed: ForecastResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            format_report("Paris", &parsed.current_weather),
            "Current temperature in Paris is 18.3°C with a wind speed of 9.4 km/h."
        );

        let body = r#"{"current_weather":{"temperature":18,"windspeed":0.0}}"#;
        let parsed: ForecastResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            format_report("Oslo", &parsed.current_weather),
            "Current temperature in Oslo is 18.0°C with a wind speed of 0.0 km/h."
        );
        assert_eq!(reading(-2.0), "-2.0");
        assert_eq!(reading(12.25), "12.25");
    }

    #[test]
    fn ip_loc_parsing() {
        assert_eq!(parse_loc("48.85,2.35"), Some((48.85, 2.35)));
        assert_eq!(parse_loc("garbage"), None);
        assert_eq!(parse_loc("1,x"), None);
    }

    #[tokio::test]
    async fn unreachable_service_yields_apology() {
        let tool = WeatherTool::new(WeatherConfig {
            geocoding_url: "http://127.0.0.1:9/search".into(),
            forecast_url: "http://127.0.0.1:9/forecast".into(),
            ip_lookup_url: "http://127.0.0.1:9/ip".into(),
        })
        .unwrap();
        let out = tool.report("Paris").await;
        assert!(out.starts_with("Sorry, I couldn't fetch the weather. Error: "), "{out}");
    }
}
