//! End-to-end scenarios driving the simulation engine directly, plus
//! property checks over its invariants.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Mutex;

use forecast_service::catalog;
use forecast_service::models::{
    ClimateSample, CoolingType, DataCenterSpec, GridContext, ServerClass, SimulationProgress,
    StabilityRisk, WeatherSummary, WorkloadClass,
};
use forecast_service::simulation::{
    GridRegion, GridRegistry, ProgressSink, Simulator, SinkClosed, HOURS_PER_YEAR,
};

fn climate(temperature: f64, humidity: f64, wind: f64) -> ClimateSample {
    WeatherSummary {
        temperature,
        humidity,
        wind_speed: wind,
        description: "test".to_string(),
    }
    .to_climate_sample()
}

fn context(region: GridRegion, baseline_mw: f64) -> GridContext {
    GridContext {
        region,
        baseline_demand_mw: baseline_mw,
        total_households: 500_000,
        avg_household_bill_usd: 120.0,
    }
}

fn start() -> chrono::DateTime<Utc> {
    // A Monday at midnight, so weekday arithmetic is easy to reason about.
    Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap()
}

struct RecordingSink {
    events: Mutex<Vec<SimulationProgress>>,
}

impl RecordingSink {
    fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn emit(&self, progress: SimulationProgress) -> Result<(), SinkClosed> {
        self.events.lock().unwrap().push(progress);
        Ok(())
    }
}

#[tokio::test]
async fn medium_preset_in_ercot_summer() {
    // State FIPS 48 (Texas) resolves to ERCOT.
    let region = GridRegion::from_state_fips("48");
    assert_eq!(region, GridRegion::Ercot);

    let config = catalog::preset_or_default(Some("medium"));
    let spec = config.to_spec();
    let simulator = Simulator::for_spec(&spec).unwrap();
    let mut rng = StdRng::seed_from_u64(1001);
    let result = simulator
        .run(
            &spec,
            &climate(85.0, 60.0, 5.0),
            &context(region, 40_000.0),
            HOURS_PER_YEAR,
            start(),
            &mut rng,
            None,
        )
        .await
        .unwrap();

    // 10 MW of IT at ~78% power ratio under a 1.685 PUE lands near 115 GWh.
    assert!(
        (105_000.0..=125_000.0).contains(&result.annual_mwh),
        "annual_mwh was {}",
        result.annual_mwh
    );
    assert!(result.peak_power_kw > result.avg_power_kw);
    assert!(matches!(
        result.impact.stability_risk,
        StabilityRisk::Low | StabilityRisk::Moderate
    ));
}

#[tokio::test]
async fn mega_preset_in_caiso_mild_climate() {
    let region = GridRegion::from_state_fips("06");
    assert_eq!(region, GridRegion::Caiso);

    let config = catalog::preset_or_default(Some("mega"));
    let spec = config.to_spec();
    assert_eq!(spec.cooling_type, CoolingType::Liquid);

    let simulator = Simulator::for_spec(&spec).unwrap();
    let mut rng = StdRng::seed_from_u64(1002);
    let result = simulator
        .run(
            &spec,
            &climate(70.0, 50.0, 10.0),
            &context(region, 50_000.0),
            HOURS_PER_YEAR,
            start(),
            &mut rng,
            None,
        )
        .await
        .unwrap();

    let avg_pue =
        result.hourly_pue.iter().sum::<f64>() / result.hourly_pue.len() as f64;
    assert!(avg_pue < 1.10, "liquid cooling avg PUE was {avg_pue}");

    // 150 MW nameplate running AI training nearly flat out: ~1.33M MWh.
    assert!(
        (1_250_000.0..=1_400_000.0).contains(&result.annual_mwh),
        "annual_mwh was {}",
        result.annual_mwh
    );

    let registry = GridRegistry::new();
    assert_eq!(registry.profile(region).carbon_kg_per_kwh, 0.209);
}

#[tokio::test]
async fn small_preset_with_unknown_state() {
    let region = GridRegion::from_state_fips("99");
    assert_eq!(region, GridRegion::Default);
    let registry = GridRegistry::new();
    assert_eq!(registry.profile(region).base_rate_usd_per_kwh, 0.10);

    let config = catalog::preset_or_default(Some("small"));
    let spec = config.to_spec();
    let simulator = Simulator::for_spec(&spec).unwrap();
    let mut rng = StdRng::seed_from_u64(1003);
    let result = simulator
        .run(
            &spec,
            &climate(70.0, 50.0, 5.0),
            &context(region, 40_000.0),
            HOURS_PER_YEAR,
            start(),
            &mut rng,
            None,
        )
        .await
        .unwrap();

    // 1 MW of IT with air cooling: roughly 10 GWh for the year.
    assert!(
        (9_000.0..=11_200.0).contains(&result.annual_mwh),
        "annual_mwh was {}",
        result.annual_mwh
    );
    assert_eq!(result.impact.stability_risk, StabilityRisk::Low);
}

#[tokio::test]
async fn single_server_ai_training_day() {
    let spec = DataCenterSpec {
        server_count: 1,
        max_watts_per_server: 500.0,
        facility_sqft: 100.0,
        cooling_type: CoolingType::Air,
        server_class: ServerClass::NvidiaH100,
        workload_class: WorkloadClass::AiTraining,
    };
    let simulator = Simulator::for_spec(&spec).unwrap();
    let sink = RecordingSink::new();
    let mut rng = StdRng::seed_from_u64(1004);
    let result = simulator
        .run(
            &spec,
            &climate(70.0, 50.0, 5.0),
            &context(GridRegion::Default, 40_000.0),
            24,
            start(),
            &mut rng,
            Some(&sink),
        )
        .await
        .unwrap();

    assert_eq!(result.hourly_power_kw.len(), 24);
    assert_eq!(result.hourly_utilization_pct.len(), 24);
    assert_eq!(result.hourly_pue.len(), 24);

    let avg_utilization =
        result.hourly_utilization_pct.iter().sum::<f64>() / 24.0;
    assert!(
        avg_utilization >= 75.0,
        "ai_training day averaged {avg_utilization}% utilization"
    );

    // The progress cadence is every 24 completed hours, so a 24-hour run
    // fires exactly once, and a 23-hour run not at all.
    assert_eq!(sink.events.lock().unwrap().len(), 1);
    assert_eq!(sink.events.lock().unwrap()[0].hours_completed, 24);

    let sink = RecordingSink::new();
    let mut rng = StdRng::seed_from_u64(1004);
    simulator
        .run(
            &spec,
            &climate(70.0, 50.0, 5.0),
            &context(GridRegion::Default, 40_000.0),
            23,
            start(),
            &mut rng,
            Some(&sink),
        )
        .await
        .unwrap();
    assert!(sink.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn zero_baseline_is_substituted_not_divided() {
    let config = catalog::preset_or_default(Some("small"));
    let spec = config.to_spec();
    let simulator = Simulator::for_spec(&spec).unwrap();
    let mut rng = StdRng::seed_from_u64(1005);
    let result = simulator
        .run(
            &spec,
            &climate(70.0, 50.0, 5.0),
            &context(GridRegion::Default, 0.0),
            48,
            start(),
            &mut rng,
            None,
        )
        .await
        .unwrap();

    // Impact is computed against the substituted 100 MW baseline.
    assert!(result.impact.peak_impact_pct.is_finite());
    let expected = result.peak_power_kw / 1000.0 / 100.0 * 100.0;
    assert!((result.impact.peak_impact_pct - expected).abs() < 1e-9);
    assert!(result.impact.household_impact.monthly_usd.is_finite());
}

#[tokio::test]
async fn full_year_is_reproducible_under_a_fixed_seed() {
    let config = catalog::preset_or_default(Some("medium"));
    let spec = config.to_spec();
    let simulator = Simulator::for_spec(&spec).unwrap();
    let sample = climate(85.0, 60.0, 5.0);
    let ctx = context(GridRegion::Ercot, 40_000.0);

    let mut rng_a = StdRng::seed_from_u64(7777);
    let a = simulator
        .run(&spec, &sample, &ctx, HOURS_PER_YEAR, start(), &mut rng_a, None)
        .await
        .unwrap();
    let mut rng_b = StdRng::seed_from_u64(7777);
    let b = simulator
        .run(&spec, &sample, &ctx, HOURS_PER_YEAR, start(), &mut rng_b, None)
        .await
        .unwrap();

    assert_eq!(a.hourly_power_kw, b.hourly_power_kw);
    assert_eq!(a.hourly_utilization_pct, b.hourly_utilization_pct);
    assert_eq!(a.peak_power_kw, b.peak_power_kw);
    assert_eq!(a.annual_mwh, b.annual_mwh);
}

// ---------------------------------------------------------------------------
// Property checks
// ---------------------------------------------------------------------------

fn server_class_strategy() -> impl Strategy<Value = ServerClass> {
    prop_oneof![
        Just(ServerClass::Enterprise),
        Just(ServerClass::GpuCompute),
        Just(ServerClass::CpuIntensive),
        Just(ServerClass::TpuV4),
        Just(ServerClass::NvidiaH100),
        Just(ServerClass::InferenceAccelerator),
        Just(ServerClass::ArmServer),
    ]
}

fn workload_class_strategy() -> impl Strategy<Value = WorkloadClass> {
    prop_oneof![
        Just(WorkloadClass::Enterprise),
        Just(WorkloadClass::CloudCompute),
        Just(WorkloadClass::AiTraining),
        Just(WorkloadClass::Gaming),
    ]
}

fn cooling_type_strategy() -> impl Strategy<Value = CoolingType> {
    prop_oneof![
        Just(CoolingType::Air),
        Just(CoolingType::Water),
        Just(CoolingType::Evaporative),
        Just(CoolingType::Liquid),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn run_upholds_result_invariants(
        hours in 1u32..400,
        seed in any::<u64>(),
        server_count in 1u32..5_000,
        max_watts in 100.0f64..2_000.0,
        server_class in server_class_strategy(),
        workload_class in workload_class_strategy(),
        cooling_type in cooling_type_strategy(),
        temperature in -10.0f64..115.0,
        humidity in 0.0f64..100.0,
        wind in 0.0f64..40.0,
    ) {
        let spec = DataCenterSpec {
            server_count,
            max_watts_per_server: max_watts,
            facility_sqft: 10_000.0,
            cooling_type,
            server_class,
            workload_class,
        };
        let simulator = Simulator::for_spec(&spec).unwrap();
        let max_pue = simulator.max_pue();
        let sample = climate(temperature, humidity, wind);
        let ctx = context(GridRegion::Default, 10_000.0);
        let mut rng = StdRng::seed_from_u64(seed);

        let result = tokio_test::block_on(simulator.run(
            &spec, &sample, &ctx, hours, start(), &mut rng, None,
        )).unwrap();

        // Three arrays, each exactly H long, all values finite and in band.
        prop_assert_eq!(result.hourly_power_kw.len(), hours as usize);
        prop_assert_eq!(result.hourly_utilization_pct.len(), hours as usize);
        prop_assert_eq!(result.hourly_pue.len(), hours as usize);
        for &kw in &result.hourly_power_kw {
            prop_assert!(kw.is_finite() && kw >= 0.0);
        }
        for &u in &result.hourly_utilization_pct {
            prop_assert!((5.0..=98.0).contains(&u));
        }
        for &p in &result.hourly_pue {
            prop_assert!(p >= 1.02 - 1e-12 && p <= max_pue + 1e-12);
        }

        // Aggregates match the traces within floating tolerance.
        let max = result.hourly_power_kw.iter().copied().fold(0.0, f64::max);
        let sum: f64 = result.hourly_power_kw.iter().sum();
        prop_assert!((result.peak_power_kw - max).abs() < 1e-9);
        prop_assert!((result.avg_power_kw - sum / hours as f64).abs() < 1e-9);
        prop_assert!((result.annual_mwh - sum / 1000.0).abs() < 1e-9);
        prop_assert!(result.peak_power_kw >= result.avg_power_kw);
        prop_assert!(result.impact.peak_impact_pct >= result.impact.avg_impact_pct);
    }
}
