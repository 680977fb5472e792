use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use crate::config::Settings;
use crate::models::EnergyPrice;

/// Resolves a state to its industrial electricity price.
#[async_trait]
pub trait EnergyPriceProvider: Send + Sync {
    /// Latest annual industrial price for the state. Falls back to the
    /// national average ($0.11/kWh) on failure.
    async fn resolve_energy(&self, state: &str) -> EnergyPrice;
}

/// EIA v2 retail-sales client.
pub struct EiaEnergyClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl EiaEnergyClient {
    pub fn new(client: Client, settings: &Settings) -> Self {
        Self {
            client,
            base_url: settings.eia_base_url.clone(),
            api_key: settings.eia_api_key.clone(),
        }
    }

    async fn fetch_price(&self, state: &str) -> anyhow::Result<f64> {
        let url = format!("{}/v2/electricity/retail-sales/data/", self.base_url);
        let mut query = vec![
            ("frequency", "annual".to_string()),
            ("data[0]", "price".to_string()),
            ("facets[stateid][]", state.to_string()),
            ("facets[sectorid][]", "IND".to_string()),
            ("sort[0][column]", "period".to_string()),
            ("sort[0][direction]", "desc".to_string()),
            ("length", "1".to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("api_key", key.clone()));
        }

        let response = self.client.get(&url).query(&query).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("EIA API returned status {}", response.status());
        }

        let body: Value = response.json().await?;
        let price = body
            .get("response")
            .and_then(|r| r.get("data"))
            .and_then(|d| d.as_array())
            .and_then(|d| d.first())
            .and_then(|row| row.get("price"))
            .and_then(|p| {
                // The price field arrives as a number or a numeric string.
                p.as_f64()
                    .or_else(|| p.as_str().and_then(|s| s.parse().ok()))
            })
            .ok_or_else(|| anyhow::anyhow!("no price in EIA response"))?;

        // EIA reports cents per kWh.
        Ok(price / 100.0)
    }
}

#[async_trait]
impl EnergyPriceProvider for EiaEnergyClient {
    async fn resolve_energy(&self, state: &str) -> EnergyPrice {
        match self.fetch_price(state).await {
            Ok(price_per_kwh) => EnergyPrice {
                price_per_kwh,
                state: state.to_string(),
            },
            Err(e) => {
                warn!("Energy price lookup failed for '{state}': {e}, using national average");
                EnergyPrice::fallback(state)
            }
        }
    }
}
