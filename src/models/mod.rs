use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// A point-in-time climate reading used for cooling calculations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClimateSample {
    pub dry_bulb_f: f64,
    pub wet_bulb_f: f64,
    pub humidity_pct: f64,
    pub wind_mph: f64,
    #[serde(default)]
    pub solar_irradiance_wm2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoolingType {
    Air,
    Water,
    Evaporative,
    Liquid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerClass {
    Enterprise,
    GpuCompute,
    CpuIntensive,
    TpuV4,
    NvidiaH100,
    InferenceAccelerator,
    ArmServer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadClass {
    Enterprise,
    CloudCompute,
    AiTraining,
    Gaming,
}

/// Configuration of the facility under evaluation, as the simulator sees it.
#[derive(Debug, Clone)]
pub struct DataCenterSpec {
    pub server_count: u32,
    pub max_watts_per_server: f64,
    pub facility_sqft: f64,
    pub cooling_type: CoolingType,
    pub server_class: ServerClass,
    pub workload_class: WorkloadClass,
}

/// The user-facing facility configuration: what the catalog serves and what
/// the report echoes back. `to_spec` derives the simulator input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityConfig {
    pub name: String,
    pub power_mw: f64,
    pub servers: u32,
    pub square_feet: f64,
    pub water_gallons_per_day: f64,
    pub employees: u32,
    pub cooling_type: CoolingType,
    pub server_type: ServerClass,
    pub datacenter_type: WorkloadClass,
}

impl FacilityConfig {
    pub fn to_spec(&self) -> DataCenterSpec {
        let max_watts_per_server = if self.servers > 0 {
            self.power_mw * 1_000_000.0 / f64::from(self.servers)
        } else {
            500.0
        };
        DataCenterSpec {
            server_count: self.servers,
            max_watts_per_server,
            facility_sqft: self.square_feet,
            cooling_type: self.cooling_type,
            server_class: self.server_type,
            workload_class: self.datacenter_type,
        }
    }
}

/// Body of `POST /api/forecast` and `POST /api/forecast/stream`.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub custom: bool,
    pub name: Option<String>,
    pub power_mw: Option<f64>,
    pub servers: Option<u32>,
    pub square_feet: Option<f64>,
    pub water_gallons_per_day: Option<f64>,
    pub employees: Option<u32>,
    pub cooling_type: Option<CoolingType>,
    pub server_type: Option<ServerClass>,
    pub datacenter_type: Option<WorkloadClass>,
    pub simulation_hours: Option<u32>,
}

impl ForecastRequest {
    /// Validates the request and resolves the facility configuration plus
    /// simulation horizon. Input problems surface as 400s.
    pub fn resolve(&self) -> Result<(f64, f64, FacilityConfig, u32), ServiceError> {
        let lat = self
            .latitude
            .ok_or_else(|| ServiceError::validation("Missing required parameter: latitude"))?;
        let lon = self
            .longitude
            .ok_or_else(|| ServiceError::validation("Missing required parameter: longitude"))?;
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ServiceError::validation(format!(
                "latitude {lat} out of range [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(ServiceError::validation(format!(
                "longitude {lon} out of range [-180, 180]"
            )));
        }

        let hours = self.simulation_hours.unwrap_or(crate::simulation::HOURS_PER_YEAR);
        if hours < 1 {
            return Err(ServiceError::validation(
                "simulation_hours must be at least 1",
            ));
        }

        let config = if self.custom {
            let servers = self.servers.unwrap_or(1000);
            if servers < 1 {
                return Err(ServiceError::validation("servers must be at least 1"));
            }
            let power_mw = self.power_mw.unwrap_or(10.0);
            if power_mw <= 0.0 {
                return Err(ServiceError::validation("power_mw must be positive"));
            }
            FacilityConfig {
                name: self
                    .name
                    .clone()
                    .unwrap_or_else(|| "Custom Data Center".to_string()),
                power_mw,
                servers,
                square_feet: self.square_feet.unwrap_or(50_000.0),
                water_gallons_per_day: self.water_gallons_per_day.unwrap_or(300_000.0),
                employees: self.employees.unwrap_or(50),
                cooling_type: self.cooling_type.unwrap_or(CoolingType::Air),
                server_type: self.server_type.unwrap_or(ServerClass::Enterprise),
                datacenter_type: self.datacenter_type.unwrap_or(WorkloadClass::Enterprise),
            }
        } else {
            crate::catalog::preset_or_default(self.size.as_deref())
        };

        Ok((lat, lon, config, hours))
    }
}

/// Site-specific grid state derived from resolved location data.
#[derive(Debug, Clone)]
pub struct GridContext {
    pub region: crate::simulation::GridRegion,
    pub baseline_demand_mw: f64,
    pub total_households: u64,
    pub avg_household_bill_usd: f64,
}

impl GridContext {
    pub const DEFAULT_HOUSEHOLD_BILL_USD: f64 = 120.0;

    /// Builds the grid context from a resolved population figure.
    /// Populations below 1,000 are treated as unreliable and replaced.
    pub fn from_location(region: crate::simulation::GridRegion, population: u64) -> Self {
        let population = if population < 1_000 {
            tracing::warn!(
                "Population {} too low for grid estimation, using default 100,000",
                population
            );
            100_000
        } else {
            population
        };
        let households = (population as f64 / 2.5) as u64;
        // Rough baseline: 1.5 kW average draw per household.
        let baseline_demand_mw = households as f64 * 1.5 / 1000.0;
        Self {
            region,
            baseline_demand_mw,
            total_households: households,
            avg_household_bill_usd: Self::DEFAULT_HOUSEHOLD_BILL_USD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityRisk {
    Low,
    Moderate,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridImpactClass {
    Negligible,
    Low,
    Moderate,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EfficiencyRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfrastructureCost {
    pub transmission: f64,
    pub distribution: f64,
    pub substation: f64,
    pub total: f64,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseholdImpact {
    pub monthly_usd: f64,
    pub annual_usd: f64,
    pub pct_increase: f64,
    pub total_community_usd: f64,
}

/// Aggregate grid and community impact of the facility's power trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactSummary {
    pub peak_impact_pct: f64,
    pub avg_impact_pct: f64,
    pub stability_risk: StabilityRisk,
    pub grid_class: GridImpactClass,
    pub infrastructure_cost: InfrastructureCost,
    pub household_impact: HouseholdImpact,
}

/// Complete simulator output: three parallel hourly arrays plus aggregates.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub hourly_power_kw: Vec<f64>,
    pub hourly_utilization_pct: Vec<f64>,
    pub hourly_pue: Vec<f64>,
    pub peak_power_kw: f64,
    pub avg_power_kw: f64,
    pub annual_mwh: f64,
    pub impact: ImpactSummary,
}

/// Running statistics emitted at each 24-hour progress boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationProgress {
    pub hours_completed: u32,
    pub percent_complete: f64,
    pub current_avg_power_kw: f64,
    pub current_avg_utilization: f64,
    pub current_avg_pue: f64,
}

/// Events emitted on the SSE stream, tagged by `status` on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForecastEvent {
    Started { step: String },
    Progress { step: String },
    Simulating { hours_total: u32 },
    SimulationProgress {
        #[serde(flatten)]
        progress: SimulationProgress,
    },
    CalculatingCosts,
    GeneratingAnalysis,
    AnalysisChunk { text: String },
    AnalysisError { message: String },
    Heartbeat,
    Complete { report: Box<ForecastReport> },
    Error { message: String },
}

// ---------------------------------------------------------------------------
// Provider value types
// ---------------------------------------------------------------------------

/// Location, demographics, and FIPS codes for a coordinate pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationInfo {
    pub location_name: String,
    pub population: u64,
    pub median_income: i64,
    pub state_fips: String,
    pub county_fips: String,
}

impl Default for LocationInfo {
    fn default() -> Self {
        Self {
            location_name: "Unknown".to_string(),
            population: 0,
            median_income: 0,
            state_fips: String::new(),
            county_fips: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyPrice {
    pub price_per_kwh: f64,
    pub state: String,
}

impl EnergyPrice {
    /// US national industrial average, used when the lookup fails.
    pub const DEFAULT_PRICE_PER_KWH: f64 = 0.11;

    pub fn fallback(state: &str) -> Self {
        Self {
            price_per_kwh: Self::DEFAULT_PRICE_PER_KWH,
            state: state.to_string(),
        }
    }
}

/// Current conditions as returned by the weather provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSummary {
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub description: String,
}

impl Default for WeatherSummary {
    fn default() -> Self {
        Self {
            temperature: 70.0,
            humidity: 50.0,
            wind_speed: 5.0,
            description: "Unknown".to_string(),
        }
    }
}

impl WeatherSummary {
    /// Derives the full climate sample, estimating wet-bulb temperature from
    /// dry-bulb and relative humidity (Stull's arctangent approximation).
    pub fn to_climate_sample(&self) -> ClimateSample {
        let t = self.temperature;
        let rh = self.humidity;
        let wet_bulb = t * (0.151977 * (rh + 8.313659).sqrt()).atan() + (t + rh).atan()
            - (rh - 1.676331).atan()
            + 0.00391838 * rh.powf(1.5) * (0.023101 * rh).atan()
            - 4.686035;
        ClimateSample {
            dry_bulb_f: t,
            wet_bulb_f: wet_bulb,
            humidity_pct: rh,
            wind_mph: self.wind_speed,
            solar_irradiance_wm2: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationReport {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub state: String,
    pub state_fips: String,
    pub grid_region: String,
    pub population: u64,
    pub median_income: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlySeries {
    pub hours: Vec<u32>,
    pub power_kw: Vec<f64>,
    pub utilization: Vec<f64>,
    pub pue: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub hours_simulated: u32,
    pub peak_power_kw: f64,
    pub average_power_kw: f64,
    pub annual_consumption_mwh: f64,
    pub average_utilization: f64,
    pub peak_utilization: f64,
    pub average_pue: f64,
    pub best_pue: f64,
    pub worst_pue: f64,
    pub hourly_data: HourlySeries,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyReport {
    pub annual_mwh: f64,
    pub annual_kwh: f64,
    pub annual_cost: f64,
    pub grid_region: String,
    pub base_rate: f64,
    pub peak_multiplier: f64,
    pub percent_increase: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbonReport {
    pub annual_tons_co2: f64,
    pub carbon_intensity_kg_kwh: f64,
    pub equivalent_cars: f64,
    pub equivalent_homes: f64,
}

/// The complete forecast document returned to clients and persisted to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
    pub timestamp: DateTime<Utc>,
    pub location: LocationReport,
    pub datacenter: FacilityConfig,
    pub climate: WeatherSummary,
    pub simulation: SimulationReport,
    pub energy: EnergyReport,
    pub carbon: CarbonReport,
    pub community_impact: ImpactSummary,
    pub analysis: String,
}
