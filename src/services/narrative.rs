use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::Settings;
use crate::models::ForecastReport;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 8192;

pub type NarrativeStream = BoxStream<'static, Result<String>>;

/// Produces the written impact analysis for a finished forecast.
#[async_trait]
pub trait NarrativeProvider: Send + Sync {
    /// Generates the complete analysis in one call.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Streams the analysis as text chunks. The stream ends when the model
    /// finishes; a mid-stream failure surfaces as an `Err` item.
    async fn stream(&self, prompt: &str) -> Result<NarrativeStream>;
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl AnthropicClient {
    pub fn new(client: Client, settings: &Settings) -> Self {
        Self {
            client,
            base_url: settings.anthropic_base_url.clone(),
            api_key: settings.anthropic_api_key.clone(),
            model: settings.anthropic_model.clone(),
        }
    }

    fn request_body(&self, prompt: &str, stream: bool) -> Value {
        json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "stream": stream,
            "messages": [{ "role": "user", "content": prompt }],
        })
    }

    async fn send(&self, prompt: &str, stream: bool) -> Result<reqwest::Response> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("ANTHROPIC_API_KEY not configured"))?;

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(prompt, stream))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("analysis API returned status {}", response.status());
        }
        Ok(response)
    }
}

#[async_trait]
impl NarrativeProvider for AnthropicClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self.send(prompt, false).await?;
        let body: Value = response.json().await?;
        let text = body
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|block| block.get("text"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| anyhow!("no text content in analysis response"))?;
        debug!("Received analysis ({} chars)", text.len());
        Ok(text.to_string())
    }

    async fn stream(&self, prompt: &str) -> Result<NarrativeStream> {
        let response = self.send(prompt, true).await?;
        let bytes = response.bytes_stream();
        let (tx, rx) = mpsc::unbounded();

        tokio::spawn(async move {
            futures::pin_mut!(bytes);
            let mut buffer = String::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.unbounded_send(Err(e.into()));
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(newline) = buffer.find('\n') {
                    let line: String = buffer.drain(..=newline).collect();
                    match parse_stream_line(line.trim_end()) {
                        StreamPayload::Text(text) => {
                            if tx.unbounded_send(Ok(text)).is_err() {
                                return;
                            }
                        }
                        StreamPayload::Error(message) => {
                            let _ = tx.unbounded_send(Err(anyhow!(message)));
                            return;
                        }
                        StreamPayload::Done => return,
                        StreamPayload::Ignore => {}
                    }
                }
            }
        });

        Ok(rx.boxed())
    }
}

enum StreamPayload {
    Text(String),
    Error(String),
    Done,
    Ignore,
}

/// Interprets one line of the messages event stream. Only
/// `content_block_delta` text and terminal events matter; everything else
/// (event names, pings, block boundaries) is skipped.
fn parse_stream_line(line: &str) -> StreamPayload {
    let Some(data) = line.strip_prefix("data: ") else {
        return StreamPayload::Ignore;
    };
    let Ok(value) = serde_json::from_str::<Value>(data) else {
        warn!("Unparseable stream payload: {data}");
        return StreamPayload::Ignore;
    };

    match value.get("type").and_then(|t| t.as_str()) {
        Some("content_block_delta") => value
            .get("delta")
            .and_then(|d| d.get("text"))
            .and_then(|t| t.as_str())
            .map(|t| StreamPayload::Text(t.to_string()))
            .unwrap_or(StreamPayload::Ignore),
        Some("message_stop") => StreamPayload::Done,
        Some("error") => {
            let message = value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("analysis stream error")
                .to_string();
            StreamPayload::Error(message)
        }
        _ => StreamPayload::Ignore,
    }
}

/// Builds the impact-analysis prompt from a finished report (the `analysis`
/// field is ignored).
pub fn build_analysis_prompt(report: &ForecastReport) -> String {
    let dc = &report.datacenter;
    let loc = &report.location;
    let sim = &report.simulation;
    let carbon = &report.carbon;
    let impact = &report.community_impact;

    format!(
        r#"You are an environmental impact analyst for data centers. Analyze the following data center simulation results:

DATA CENTER SPECIFICATIONS:
- Type: {name}
- Power Capacity: {power_mw} MW
- Number of Servers: {servers}
- Size: {square_feet:.0} square feet
- Cooling Type: {cooling:?}
- Server Type: {server:?}
- Data Center Type: {workload:?}
- Employees: {employees}

LOCATION DATA:
- Coordinates: {lat}, {lon}
- Location: {location_name}, {state}
- Grid Region: {grid_region}
- Population: {population}
- Median Income: ${median_income}

CLIMATE DATA:
- Temperature: {temperature}°F
- Humidity: {humidity}%
- Conditions: {conditions}

SIMULATION RESULTS ({hours}-hour simulation):
Energy Performance:
- Peak Power: {peak_kw:.0} kW
- Average Power: {avg_kw:.0} kW
- Annual Consumption: {annual_mwh:.0} MWh
- Annual Energy Cost: ${annual_cost:.0}
- Average PUE: {avg_pue:.2}
- Best PUE: {best_pue:.2}
- Worst PUE: {worst_pue:.2}

Workload Characteristics:
- Average Utilization: {avg_util:.1}%
- Peak Utilization: {peak_util:.1}%

Carbon Impact:
- Annual CO2 Emissions: {co2_tons:.0} tons
- Grid Carbon Intensity: {carbon_intensity:.3} kg CO₂/kWh
- Equivalent to {cars:.0} cars
- Equivalent to power for {homes:.0} homes

Community & Grid Impact:
- Peak Impact on Grid: {peak_impact:.2}%
- Average Impact on Grid: {avg_impact:.2}%
- Grid Stability Risk: {risk:?}
- Grid Impact Classification: {class:?}
- Monthly Cost Per Household: ${monthly_cost:.2}
- Household Bill Increase: {bill_increase:.2}%
- Infrastructure Cost: ${infra_cost:.0}
- Infrastructure Required: {infra_required}

Please provide a comprehensive analysis covering:
1. **Overall Performance Assessment** - How well does this data center perform based on the simulation?
2. **Energy Efficiency Analysis** - Assess PUE trends, cooling efficiency, and optimization opportunities
3. **Grid & Community Impact** - Detailed analysis of impact on local grid and households
4. **Workload Pattern Analysis** - What do the utilization patterns tell us about this facility?
5. **Environmental Concerns** - Carbon footprint and environmental sustainability analysis
6. **Infrastructure Requirements** - What grid infrastructure upgrades are needed?
7. **Cost-Benefit Analysis** - Economic impacts (jobs, costs to community, energy costs)
8. **Risk Assessment** - Grid stability risks, power supply concerns, regulatory challenges
9. **Recommendations** - Specific mitigation strategies, optimization opportunities, and site suitability

Be specific, data-driven, and balanced. Use the actual simulation data to support your analysis. Consider both technical performance and community impact."#,
        name = dc.name,
        power_mw = dc.power_mw,
        servers = dc.servers,
        square_feet = dc.square_feet,
        cooling = dc.cooling_type,
        server = dc.server_type,
        workload = dc.datacenter_type,
        employees = dc.employees,
        lat = loc.latitude,
        lon = loc.longitude,
        location_name = loc.name,
        state = loc.state,
        grid_region = loc.grid_region,
        population = loc.population,
        median_income = loc.median_income,
        temperature = report.climate.temperature,
        humidity = report.climate.humidity,
        conditions = report.climate.description,
        hours = sim.hours_simulated,
        peak_kw = sim.peak_power_kw,
        avg_kw = sim.average_power_kw,
        annual_mwh = sim.annual_consumption_mwh,
        annual_cost = report.energy.annual_cost,
        avg_pue = sim.average_pue,
        best_pue = sim.best_pue,
        worst_pue = sim.worst_pue,
        avg_util = sim.average_utilization,
        peak_util = sim.peak_utilization,
        co2_tons = carbon.annual_tons_co2,
        carbon_intensity = carbon.carbon_intensity_kg_kwh,
        cars = carbon.equivalent_cars,
        homes = carbon.equivalent_homes,
        peak_impact = impact.peak_impact_pct,
        avg_impact = impact.avg_impact_pct,
        risk = impact.stability_risk,
        class = impact.grid_class,
        monthly_cost = impact.household_impact.monthly_usd,
        bill_increase = impact.household_impact.pct_increase,
        infra_cost = impact.infrastructure_cost.total,
        infra_required = impact.infrastructure_cost.required,
    )
}
