pub mod forecast;
pub mod stream;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::models::{FacilityConfig, ForecastRequest, GridContext, LocationInfo};
use crate::simulation::GridRegion;

/// Everything a forecast run needs before touching the simulator,
/// resolved and validated from the raw request.
pub struct ForecastInputs {
    pub latitude: f64,
    pub longitude: f64,
    pub config: FacilityConfig,
    pub hours: u32,
    pub start: DateTime<Utc>,
}

impl ForecastInputs {
    pub fn from_request(request: &ForecastRequest) -> Result<Self, crate::error::ServiceError> {
        let (latitude, longitude, config, hours) = request.resolve()?;
        Ok(Self {
            latitude,
            longitude,
            config,
            hours,
            start: Utc::now(),
        })
    }

    /// Task-local RNG for the workload generator. Seeded from entropy per
    /// request; tests drive the simulator directly with pinned seeds.
    pub fn rng(&self) -> StdRng {
        StdRng::from_entropy()
    }
}

/// Derives the grid context for a resolved location.
pub fn grid_context(region: GridRegion, location: &LocationInfo) -> GridContext {
    GridContext::from_location(region, location.population)
}
