use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use rand::rngs::StdRng;

use crate::models::{ClimateSample, DataCenterSpec, GridContext, SimulationProgress, SimulationResult};
use crate::simulation::{
    CoolingModel, GridImpactCalculator, PowerCurve, SimulationError, WorkloadGenerator,
};

/// A progress event is emitted after every completed simulated day.
const PROGRESS_INTERVAL_HOURS: u32 = 24;

/// Returned by a sink whose consumer has gone away. The simulator treats it
/// as a cancellation signal.
#[derive(Debug)]
pub struct SinkClosed;

/// Receives running statistics at each progress boundary. Injected rather
/// than a bare closure so the simulator stays testable without a network.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(&self, progress: SimulationProgress) -> Result<(), SinkClosed>;
}

/// Composes the power curve, workload generator, and cooling model over an
/// hourly loop and aggregates the result against the grid context.
#[derive(Debug, Clone)]
pub struct Simulator {
    curve: PowerCurve,
    workload: WorkloadGenerator,
    cooling: CoolingModel,
}

impl Simulator {
    /// Resolves the three component models for a facility spec.
    pub fn for_spec(spec: &DataCenterSpec) -> Result<Self, SimulationError> {
        Ok(Self {
            curve: PowerCurve::for_class(spec.server_class),
            workload: WorkloadGenerator::for_class(spec.workload_class)?,
            cooling: CoolingModel::for_type(spec.cooling_type),
        })
    }

    pub fn max_pue(&self) -> f64 {
        self.cooling.max_pue()
    }

    /// Runs the hourly loop for `hours` steps starting at `start`.
    ///
    /// The loop performs no I/O; with a sink attached it suspends only at
    /// 24-hour progress boundaries, where a closed sink cancels the run.
    /// Under a fixed RNG seed the output is exactly reproducible.
    pub async fn run(
        &self,
        spec: &DataCenterSpec,
        climate: &ClimateSample,
        context: &GridContext,
        hours: u32,
        start: DateTime<Utc>,
        rng: &mut StdRng,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<SimulationResult, SimulationError> {
        if hours < 1 {
            return Err(SimulationError::InvalidHours { hours });
        }

        let capacity = hours as usize;
        let mut hourly_power_kw = Vec::with_capacity(capacity);
        let mut hourly_utilization_pct = Vec::with_capacity(capacity);
        let mut hourly_pue = Vec::with_capacity(capacity);

        let mut power_sum = 0.0;
        let mut utilization_sum = 0.0;
        let mut pue_sum = 0.0;

        for hour in 0..hours {
            let timestamp = start + Duration::hours(i64::from(hour));
            let hour_of_day = timestamp.hour();
            let weekday = timestamp.weekday().num_days_from_monday();
            let month = timestamp.month();

            let utilization = self.workload.sample(hour_of_day, weekday, month, rng);
            let server_power_w = self
                .curve
                .server_power_w(spec.max_watts_per_server, utilization);
            let total_it_w = server_power_w * f64::from(spec.server_count);

            let pue = self.cooling.pue(climate);
            let total_kw = total_it_w / 1000.0 * pue;

            if !total_kw.is_finite() {
                return Err(SimulationError::NonFinite { hour });
            }

            hourly_power_kw.push(total_kw);
            hourly_utilization_pct.push(utilization);
            hourly_pue.push(pue);

            power_sum += total_kw;
            utilization_sum += utilization;
            pue_sum += pue;

            if let Some(sink) = sink {
                let completed = hour + 1;
                if completed % PROGRESS_INTERVAL_HOURS == 0 {
                    let n = f64::from(completed);
                    let progress = SimulationProgress {
                        hours_completed: completed,
                        percent_complete: round_to(
                            f64::from(completed) / f64::from(hours) * 100.0,
                            1,
                        ),
                        current_avg_power_kw: round_to(power_sum / n, 2),
                        current_avg_utilization: round_to(utilization_sum / n, 2),
                        current_avg_pue: round_to(pue_sum / n, 3),
                    };
                    if sink.emit(progress).await.is_err() {
                        return Err(SimulationError::Cancelled);
                    }
                }
            }
        }

        let peak_power_kw = hourly_power_kw.iter().copied().fold(0.0, f64::max);
        let avg_power_kw = power_sum / f64::from(hours);
        let annual_mwh = power_sum / 1000.0;

        let impact = GridImpactCalculator::new().assess(&hourly_power_kw, context);

        Ok(SimulationResult {
            hourly_power_kw,
            hourly_utilization_pct,
            hourly_pue,
            peak_power_kw,
            avg_power_kw,
            annual_mwh,
            impact,
        })
    }
}

fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}
