use std::path::Path;

use chrono::Utc;
use tracing::warn;

use crate::catalog;
use crate::models::{
    CarbonReport, EnergyReport, FacilityConfig, ForecastReport, HourlySeries, LocationInfo,
    LocationReport, SimulationReport, SimulationResult, WeatherSummary,
};
use crate::simulation::{GridProfile, GridRegion};

/// Response payloads downsample the hourly arrays at this stride; the full
/// traces stay server-side.
const SAMPLE_STRIDE: usize = 24;

/// kg CO₂ per US short ton.
const KG_PER_US_TON: f64 = 907.185;
/// Average passenger car emissions, tons CO₂ per year.
const CAR_TONS_CO2_PER_YEAR: f64 = 4.6;
/// Average US home consumption, kWh per year.
const HOME_KWH_PER_YEAR: f64 = 10_000.0;

/// Inputs C9 needs beyond the simulation result itself.
pub struct ReportInputs<'a> {
    pub latitude: f64,
    pub longitude: f64,
    pub config: &'a FacilityConfig,
    pub location: &'a LocationInfo,
    pub address: Option<String>,
    pub weather: &'a WeatherSummary,
    pub region: GridRegion,
    pub profile: &'a GridProfile,
    pub hours: u32,
}

/// Assembles the forecast report from simulator output and provider data.
/// The `analysis` field is left empty for the narrative stage to fill.
pub fn build_report(inputs: &ReportInputs<'_>, result: &SimulationResult) -> ForecastReport {
    let annual_kwh = result.annual_mwh * 1000.0;
    let annual_cost = annual_kwh * inputs.profile.base_rate_usd_per_kwh;
    let annual_co2_kg = annual_kwh * inputs.profile.carbon_kg_per_kwh;
    let annual_co2_tons = annual_co2_kg / KG_PER_US_TON;

    ForecastReport {
        timestamp: Utc::now(),
        location: LocationReport {
            latitude: inputs.latitude,
            longitude: inputs.longitude,
            name: inputs.location.location_name.clone(),
            state: catalog::state_name_from_fips(&inputs.location.state_fips).to_string(),
            state_fips: inputs.location.state_fips.clone(),
            grid_region: inputs.region.code().to_string(),
            population: inputs.location.population,
            median_income: inputs.location.median_income,
            address: inputs.address.clone(),
        },
        datacenter: inputs.config.clone(),
        climate: inputs.weather.clone(),
        simulation: simulation_report(inputs.hours, result),
        energy: EnergyReport {
            annual_mwh: result.annual_mwh,
            annual_kwh,
            annual_cost,
            grid_region: inputs.region.code().to_string(),
            base_rate: inputs.profile.base_rate_usd_per_kwh,
            peak_multiplier: inputs.profile.peak_multiplier,
            percent_increase: result.impact.avg_impact_pct,
        },
        carbon: CarbonReport {
            annual_tons_co2: annual_co2_tons,
            carbon_intensity_kg_kwh: inputs.profile.carbon_kg_per_kwh,
            equivalent_cars: annual_co2_tons / CAR_TONS_CO2_PER_YEAR,
            equivalent_homes: annual_kwh / HOME_KWH_PER_YEAR,
        },
        community_impact: result.impact.clone(),
        analysis: String::new(),
    }
}

fn simulation_report(hours: u32, result: &SimulationResult) -> SimulationReport {
    let n = result.hourly_utilization_pct.len() as f64;
    let average_utilization = result.hourly_utilization_pct.iter().sum::<f64>() / n;
    let peak_utilization = result
        .hourly_utilization_pct
        .iter()
        .copied()
        .fold(f64::MIN, f64::max);
    let average_pue = result.hourly_pue.iter().sum::<f64>() / n;
    let best_pue = result.hourly_pue.iter().copied().fold(f64::MAX, f64::min);
    let worst_pue = result.hourly_pue.iter().copied().fold(f64::MIN, f64::max);

    SimulationReport {
        hours_simulated: hours,
        peak_power_kw: result.peak_power_kw,
        average_power_kw: result.avg_power_kw,
        annual_consumption_mwh: result.annual_mwh,
        average_utilization,
        peak_utilization,
        average_pue,
        best_pue,
        worst_pue,
        hourly_data: downsample(result),
    }
}

/// Every 24th hour of the three traces, to bound payload size.
fn downsample(result: &SimulationResult) -> HourlySeries {
    let indices: Vec<usize> = (0..result.hourly_power_kw.len())
        .step_by(SAMPLE_STRIDE)
        .collect();
    HourlySeries {
        hours: indices.iter().map(|&i| i as u32).collect(),
        power_kw: indices.iter().map(|&i| result.hourly_power_kw[i]).collect(),
        utilization: indices
            .iter()
            .map(|&i| result.hourly_utilization_pct[i])
            .collect(),
        pue: indices.iter().map(|&i| result.hourly_pue[i]).collect(),
    }
}

/// Persists the report atomically (write-then-rename) so concurrent readers
/// never observe a torn file. Best-effort: failures are logged, not raised.
pub async fn persist_report(path: &str, report: &ForecastReport) {
    if let Err(e) = write_report(path, report).await {
        warn!("Failed to persist forecast report to {path}: {e}");
    }
}

async fn write_report(path: &str, report: &ForecastReport) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(report)?;
    let tmp = format!("{path}.tmp");
    tokio::fs::write(&tmp, &json).await?;
    tokio::fs::rename(&tmp, Path::new(path)).await?;
    Ok(())
}
