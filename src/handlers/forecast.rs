use axum::{extract::State, response::Json};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::catalog;
use crate::error::Result;
use crate::handlers::{grid_context, ForecastInputs};
use crate::models::{ForecastReport, ForecastRequest};
use crate::report::{self, ReportInputs};
use crate::services::narrative::build_analysis_prompt;
use crate::simulation::{GridRegion, Simulator};
use crate::AppState;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
    }))
}

pub async fn datacenter_types() -> Json<Value> {
    let presets = catalog::size_presets();
    Json(json!(presets))
}

/// Runs the full forecast synchronously and returns the report.
pub async fn run_forecast(
    State(state): State<AppState>,
    Json(request): Json<ForecastRequest>,
) -> Result<Json<ForecastReport>> {
    let run_id = Uuid::new_v4();
    let inputs = ForecastInputs::from_request(&request)?;
    info!(
        %run_id,
        "Forecasting data center at ({}, {}) for {} hours",
        inputs.latitude,
        inputs.longitude,
        inputs.hours
    );

    let location = state
        .location
        .resolve_location(inputs.latitude, inputs.longitude)
        .await;
    let region = GridRegion::from_state_fips(&location.state_fips);

    // Energy, climate, and the display address only depend on the resolved
    // location, so they can run together.
    let (energy, weather, address) = tokio::join!(
        state.energy.resolve_energy(&location.state_fips),
        state.climate.resolve_climate(inputs.latitude, inputs.longitude),
        state.location.resolve_address(inputs.latitude, inputs.longitude),
    );
    info!(
        %run_id,
        "Resolved region {} with rate ${}/kWh",
        region,
        energy.price_per_kwh
    );

    let spec = inputs.config.to_spec();
    let climate_sample = weather.to_climate_sample();
    let context = grid_context(region, &location);

    let simulator = Simulator::for_spec(&spec)?;
    let mut rng = inputs.rng();
    let result = simulator
        .run(
            &spec,
            &climate_sample,
            &context,
            inputs.hours,
            inputs.start,
            &mut rng,
            None,
        )
        .await?;

    let profile = state.registry.profile(region);
    let mut forecast = report::build_report(
        &ReportInputs {
            latitude: inputs.latitude,
            longitude: inputs.longitude,
            config: &inputs.config,
            location: &location,
            address,
            weather: &weather,
            region,
            profile,
            hours: inputs.hours,
        },
        &result,
    );

    // A narrative failure degrades to error text in the report; the
    // simulation results still go back to the caller.
    let prompt = build_analysis_prompt(&forecast);
    forecast.analysis = match state.narrative.generate(&prompt).await {
        Ok(analysis) => analysis,
        Err(e) => {
            error!(%run_id, "Analysis generation failed: {e}");
            format!("Error generating analysis: {e}")
        }
    };

    report::persist_report(&state.settings.report_path, &forecast).await;
    info!(%run_id, "Forecast complete: {:.0} MWh/yr", forecast.energy.annual_mwh);

    Ok(Json(forecast))
}
