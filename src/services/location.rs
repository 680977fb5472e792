use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::models::LocationInfo;

/// Resolves coordinates into demographics and FIPS codes.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Location name, population, and median income for the county containing
    /// the coordinates. Falls back to `LocationInfo::default()` on failure.
    async fn resolve_location(&self, lat: f64, lon: f64) -> LocationInfo;

    /// Human-readable address for display. Non-critical; `None` on failure.
    async fn resolve_address(&self, lat: f64, lon: f64) -> Option<String>;
}

/// Census geocoder + ACS 5-year lookup, with Mapbox for reverse geocoding.
pub struct CensusLocationClient {
    client: Client,
    geocoder_url: String,
    acs_url: String,
    mapbox_base_url: String,
    census_api_key: Option<String>,
    mapbox_token: Option<String>,
}

impl CensusLocationClient {
    pub fn new(client: Client, settings: &Settings) -> Self {
        Self {
            client,
            geocoder_url: settings.census_geocoder_url.clone(),
            acs_url: settings.census_acs_url.clone(),
            mapbox_base_url: settings.mapbox_base_url.clone(),
            census_api_key: settings.census_api_key.clone(),
            mapbox_token: settings.mapbox_token.clone(),
        }
    }

    /// Coordinates to (state, county) FIPS via the Census geocoder.
    async fn lookup_fips(&self, lat: f64, lon: f64) -> anyhow::Result<(String, String)> {
        let response = self
            .client
            .get(&self.geocoder_url)
            .query(&[
                ("x", lon.to_string()),
                ("y", lat.to_string()),
                ("benchmark", "Public_AR_Current".to_string()),
                ("vintage", "Current_Current".to_string()),
                ("format", "json".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("geocoder returned status {}", response.status());
        }

        let body: Value = response.json().await?;
        let county = body
            .get("result")
            .and_then(|r| r.get("geographies"))
            .and_then(|g| g.get("Counties"))
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| anyhow::anyhow!("no county for coordinates"))?;

        let state_fips = county
            .get("STATE")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let county_fips = county
            .get("COUNTY")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        Ok((state_fips, county_fips))
    }

    /// Population and median income for a county from the ACS 5-year tables.
    async fn lookup_demographics(
        &self,
        state_fips: &str,
        county_fips: &str,
    ) -> anyhow::Result<(String, u64, i64)> {
        let mut query = vec![
            ("get", "NAME,B01003_001E,B19013_001E".to_string()),
            ("for", format!("county:{county_fips}")),
            ("in", format!("state:{state_fips}")),
        ];
        if let Some(key) = &self.census_api_key {
            query.push(("key", key.clone()));
        }

        let response = self
            .client
            .get(&self.acs_url)
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("census API returned status {}", response.status());
        }

        // The ACS API returns a header row followed by data rows, all strings.
        let body: Value = response.json().await?;
        let row = body
            .as_array()
            .filter(|rows| rows.len() >= 2)
            .and_then(|rows| rows[1].as_array())
            .ok_or_else(|| anyhow::anyhow!("unexpected census response shape"))?;

        let name = row
            .first()
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown")
            .to_string();
        let population = row
            .get(1)
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
        let median_income = row
            .get(2)
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);

        Ok((name, population, median_income))
    }
}

#[async_trait]
impl LocationProvider for CensusLocationClient {
    async fn resolve_location(&self, lat: f64, lon: f64) -> LocationInfo {
        let (state_fips, county_fips) = match self.lookup_fips(lat, lon).await {
            Ok(fips) => fips,
            Err(e) => {
                warn!("Location geocoding failed for ({lat}, {lon}): {e}");
                return LocationInfo::default();
            }
        };

        match self.lookup_demographics(&state_fips, &county_fips).await {
            Ok((name, population, median_income)) => {
                debug!("Resolved ({lat}, {lon}) to {name} (state {state_fips})");
                LocationInfo {
                    location_name: name,
                    population,
                    median_income,
                    state_fips,
                    county_fips,
                }
            }
            Err(e) => {
                warn!("Census demographics lookup failed: {e}");
                LocationInfo {
                    state_fips,
                    county_fips,
                    ..LocationInfo::default()
                }
            }
        }
    }

    async fn resolve_address(&self, lat: f64, lon: f64) -> Option<String> {
        let token = self.mapbox_token.as_ref()?;
        let url = format!(
            "{}/geocoding/v5/mapbox.places/{lon},{lat}.json",
            self.mapbox_base_url
        );
        let result = self
            .client
            .get(&url)
            .query(&[("access_token", token.as_str()), ("limit", "1")])
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                let body: Value = response.json().await.ok()?;
                body.get("features")
                    .and_then(|f| f.as_array())
                    .and_then(|f| f.first())
                    .and_then(|f| f.get("place_name"))
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
            }
            Ok(response) => {
                debug!("Reverse geocoding returned status {}", response.status());
                None
            }
            Err(e) => {
                debug!("Reverse geocoding failed: {e}");
                None
            }
        }
    }
}
