use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use crate::config::Settings;
use crate::models::WeatherSummary;

/// Resolves coordinates to current climate conditions.
#[async_trait]
pub trait ClimateProvider: Send + Sync {
    /// Current conditions at the coordinates. Falls back to
    /// 70 °F / 50 % / 5 mph on failure.
    async fn resolve_climate(&self, lat: f64, lon: f64) -> WeatherSummary;
}

/// OpenWeatherMap current-weather client (imperial units).
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenWeatherClient {
    pub fn new(client: Client, settings: &Settings) -> Self {
        Self {
            client,
            base_url: settings.openweather_base_url.clone(),
            api_key: settings.openweather_api_key.clone(),
        }
    }

    async fn fetch_weather(&self, lat: f64, lon: f64) -> anyhow::Result<WeatherSummary> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        let mut query = vec![
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("units", "imperial".to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("appid", key.clone()));
        }

        let response = self.client.get(&url).query(&query).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("weather API returned status {}", response.status());
        }

        let body: Value = response.json().await?;
        let defaults = WeatherSummary::default();
        let temperature = body
            .get("main")
            .and_then(|m| m.get("temp"))
            .and_then(|t| t.as_f64())
            .ok_or_else(|| anyhow::anyhow!("no temperature in weather response"))?;
        let humidity = body
            .get("main")
            .and_then(|m| m.get("humidity"))
            .and_then(|h| h.as_f64())
            .unwrap_or(defaults.humidity);
        let wind_speed = body
            .get("wind")
            .and_then(|w| w.get("speed"))
            .and_then(|s| s.as_f64())
            .unwrap_or(defaults.wind_speed);
        let description = body
            .get("weather")
            .and_then(|w| w.as_array())
            .and_then(|w| w.first())
            .and_then(|w| w.get("description"))
            .and_then(|d| d.as_str())
            .unwrap_or("Unknown")
            .to_string();

        Ok(WeatherSummary {
            temperature,
            humidity,
            wind_speed,
            description,
        })
    }
}

#[async_trait]
impl ClimateProvider for OpenWeatherClient {
    async fn resolve_climate(&self, lat: f64, lon: f64) -> WeatherSummary {
        match self.fetch_weather(lat, lon).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Climate lookup failed for ({lat}, {lon}): {e}, using defaults");
                WeatherSummary::default()
            }
        }
    }
}
