//! The simulation engine: server power curves, stochastic workload
//! generation, climate-driven cooling efficiency, and grid impact
//! aggregation, composed over an hourly loop.

pub mod cooling;
pub mod grid;
pub mod power_curve;
pub mod simulator;
pub mod workload;

pub use cooling::{CoolingConfig, CoolingModel};
pub use grid::{GridImpactCalculator, GridProfile, GridRegion, GridRegistry};
pub use power_curve::PowerCurve;
pub use simulator::{ProgressSink, SinkClosed, Simulator};
pub use workload::{WorkloadGenerator, WorkloadPattern};

use thiserror::Error;

/// Hours in a non-leap year; the default simulation horizon.
pub const HOURS_PER_YEAR: u32 = 8760;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("simulation horizon must be at least 1 hour, got {hours}")]
    InvalidHours { hours: u32 },

    #[error("failed to construct sampling distribution: {0}")]
    Distribution(String),

    #[error("non-finite power value produced at hour {hour}")]
    NonFinite { hour: u32 },

    #[error("simulation cancelled: progress sink closed")]
    Cancelled,
}
