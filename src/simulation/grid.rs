use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{
    GridContext, GridImpactClass, HouseholdImpact, ImpactSummary, InfrastructureCost,
    StabilityRisk,
};

// Stability-risk thresholds on peak impact percent.
const STABILITY_MODERATE_PCT: f64 = 0.5;
const STABILITY_HIGH_PCT: f64 = 2.0;
const STABILITY_CRITICAL_PCT: f64 = 5.0;

// Impact-classification thresholds on peak impact percent.
const CLASS_LOW_PCT: f64 = 0.1;
const CLASS_MODERATE_PCT: f64 = 0.5;
const CLASS_HIGH_PCT: f64 = 2.0;
const CLASS_CRITICAL_PCT: f64 = 5.0;

// Capital cost per MW of new capacity.
const TRANSMISSION_COST_PER_MW: f64 = 50_000.0;
const DISTRIBUTION_COST_PER_MW: f64 = 75_000.0;
const SUBSTATION_COST_PER_MW: f64 = 100_000.0;
const MINOR_UPGRADE_COST_PER_MW: f64 = 25_000.0;

/// Headroom assumed available on the existing grid before new builds.
const CAPACITY_MARGIN: f64 = 0.15;
/// Infrastructure cost is passed to ratepayers over this horizon.
const AMORTIZATION_YEARS: f64 = 15.0;

/// Substitutions applied when the context carries unusable values.
const DEFAULT_BASELINE_MW: f64 = 100.0;
const DEFAULT_HOUSEHOLDS: u64 = 40_000;

/// The major US balancing authorities plus a national-average fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GridRegion {
    Caiso,
    Ercot,
    Pjm,
    Nyiso,
    Spp,
    Isone,
    Miso,
    Serc,
    Pacnw,
    West,
    Default,
}

impl GridRegion {
    pub const ALL: [GridRegion; 11] = [
        GridRegion::Caiso,
        GridRegion::Ercot,
        GridRegion::Pjm,
        GridRegion::Nyiso,
        GridRegion::Spp,
        GridRegion::Isone,
        GridRegion::Miso,
        GridRegion::Serc,
        GridRegion::Pacnw,
        GridRegion::West,
        GridRegion::Default,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            GridRegion::Caiso => "CAISO",
            GridRegion::Ercot => "ERCOT",
            GridRegion::Pjm => "PJM",
            GridRegion::Nyiso => "NYISO",
            GridRegion::Spp => "SPP",
            GridRegion::Isone => "ISONE",
            GridRegion::Miso => "MISO",
            GridRegion::Serc => "SERC",
            GridRegion::Pacnw => "PACNW",
            GridRegion::West => "WEST",
            GridRegion::Default => "DEFAULT",
        }
    }

    /// Resolves a two-digit state FIPS code to its grid region.
    ///
    /// Several states straddle two operators (Illinois sits in both PJM and
    /// MISO, the Carolinas in both PJM and SERC, Montana in PACNW and WEST);
    /// those resolve to the operator that serves the majority of load, and
    /// the resolutions below are final. Unknown codes fall back to DEFAULT.
    pub fn from_state_fips(state_fips: &str) -> GridRegion {
        let region = match state_fips {
            // CAISO: California
            "06" => GridRegion::Caiso,
            // ERCOT: Texas (isolated interconnect)
            "48" => GridRegion::Ercot,
            // PJM: Mid-Atlantic
            "10" | "11" | "21" | "24" | "34" | "39" | "42" | "51" | "54" => GridRegion::Pjm,
            // NYISO: New York
            "36" => GridRegion::Nyiso,
            // SPP: central plains
            "20" | "31" | "38" | "40" | "46" => GridRegion::Spp,
            // ISONE: New England
            "09" | "23" | "25" | "33" | "44" | "50" => GridRegion::Isone,
            // MISO: upper Midwest, plus the split states it carries the
            // majority of (IL, IN, MI, MO, IA, MN, AR, LA)
            "55" | "17" | "18" | "26" | "29" | "19" | "27" | "05" | "22" => GridRegion::Miso,
            // SERC: Southeast, plus split NC/TN/MS
            "12" | "13" | "01" | "45" | "37" | "47" | "28" => GridRegion::Serc,
            // PACNW: hydro-dominated Northwest
            "53" | "41" | "16" => GridRegion::Pacnw,
            // WEST: Mountain West, plus split MT
            "04" | "32" | "49" | "08" | "35" | "56" | "30" => GridRegion::West,
            // Alaska, Hawaii, and anything unmapped
            _ => GridRegion::Default,
        };
        tracing::debug!("Mapped state FIPS '{}' to grid region '{}'", state_fips, region);
        region
    }
}

impl fmt::Display for GridRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Regional electrical characteristics. Table-lookup only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridProfile {
    pub base_rate_usd_per_kwh: f64,
    pub peak_multiplier: f64,
    pub carbon_kg_per_kwh: f64,
}

/// Immutable table of per-region tariff, peak multiplier, and carbon
/// intensity. Built once at startup and shared read-only across requests.
///
/// Rates are EIA 2024 industrial averages; carbon intensities are EPA
/// eGRID 2022 subregion figures.
#[derive(Debug, Clone)]
pub struct GridRegistry {
    profiles: HashMap<GridRegion, GridProfile>,
}

impl GridRegistry {
    pub fn new() -> Self {
        let mut profiles = HashMap::new();
        let mut insert = |region, rate, peak, carbon| {
            profiles.insert(
                region,
                GridProfile {
                    base_rate_usd_per_kwh: rate,
                    peak_multiplier: peak,
                    carbon_kg_per_kwh: carbon,
                },
            );
        };
        // High renewables penetration; duck-curve peak pricing.
        insert(GridRegion::Caiso, 0.13, 2.5, 0.209);
        // Gas/wind mix; the most volatile peak market in the country.
        insert(GridRegion::Ercot, 0.08, 3.0, 0.391);
        insert(GridRegion::Pjm, 0.09, 2.0, 0.367);
        insert(GridRegion::Nyiso, 0.11, 2.2, 0.178);
        // Coal-heavy plains grid with strong seasonal swings.
        insert(GridRegion::Spp, 0.07, 2.8, 0.454);
        // Constrained transmission, winter peaks, highest rates in the US.
        insert(GridRegion::Isone, 0.16, 2.4, 0.235);
        insert(GridRegion::Miso, 0.08, 2.3, 0.425);
        insert(GridRegion::Serc, 0.09, 2.1, 0.398);
        // Abundant hydro: cheap, stable, and clean.
        insert(GridRegion::Pacnw, 0.07, 1.8, 0.158);
        // Summer A/C peaks across the Mountain West.
        insert(GridRegion::West, 0.09, 2.6, 0.412);
        // US national averages.
        insert(GridRegion::Default, 0.10, 2.2, 0.386);
        Self { profiles }
    }

    pub fn profile(&self, region: GridRegion) -> &GridProfile {
        self.profiles
            .get(&region)
            .unwrap_or(&self.profiles[&GridRegion::Default])
    }
}

impl Default for GridRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregates an hourly power trace against the regional grid context.
#[derive(Debug, Clone, Default)]
pub struct GridImpactCalculator;

impl GridImpactCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Computes the impact summary for a kW trace and grid context.
    ///
    /// Unusable context values are substituted (and logged) rather than
    /// rejected: baseline ≤ 0 becomes 100 MW, zero households becomes
    /// 40,000. The substituted values feed every downstream figure.
    pub fn assess(&self, hourly_power_kw: &[f64], context: &GridContext) -> ImpactSummary {
        let power_mw: Vec<f64> = hourly_power_kw.iter().map(|kw| kw / 1000.0).collect();
        let peak_dc_mw = power_mw.iter().copied().fold(0.0, f64::max);
        let avg_dc_mw = if power_mw.is_empty() {
            0.0
        } else {
            power_mw.iter().sum::<f64>() / power_mw.len() as f64
        };

        let baseline_mw = if context.baseline_demand_mw <= 0.0 {
            tracing::warn!(
                "baseline_demand_mw was {}, using default {} MW",
                context.baseline_demand_mw,
                DEFAULT_BASELINE_MW
            );
            DEFAULT_BASELINE_MW
        } else {
            context.baseline_demand_mw
        };

        let households = if context.total_households == 0 {
            tracing::warn!(
                "total_households was {}, using default {}",
                context.total_households,
                DEFAULT_HOUSEHOLDS
            );
            DEFAULT_HOUSEHOLDS
        } else {
            context.total_households
        };

        let peak_impact_pct = peak_dc_mw / baseline_mw * 100.0;
        let avg_impact_pct = avg_dc_mw / baseline_mw * 100.0;

        let infrastructure_cost = Self::infrastructure_cost(peak_dc_mw, baseline_mw);
        let household_impact = Self::household_impact(
            &infrastructure_cost,
            households,
            context.avg_household_bill_usd,
        );

        ImpactSummary {
            peak_impact_pct,
            avg_impact_pct,
            stability_risk: Self::stability_risk(peak_impact_pct),
            grid_class: Self::classify(peak_impact_pct),
            infrastructure_cost,
            household_impact,
        }
    }

    fn stability_risk(peak_impact_pct: f64) -> StabilityRisk {
        if peak_impact_pct < STABILITY_MODERATE_PCT {
            StabilityRisk::Low
        } else if peak_impact_pct < STABILITY_HIGH_PCT {
            StabilityRisk::Moderate
        } else if peak_impact_pct < STABILITY_CRITICAL_PCT {
            StabilityRisk::High
        } else {
            StabilityRisk::Critical
        }
    }

    fn classify(peak_impact_pct: f64) -> GridImpactClass {
        if peak_impact_pct < CLASS_LOW_PCT {
            GridImpactClass::Negligible
        } else if peak_impact_pct < CLASS_MODERATE_PCT {
            GridImpactClass::Low
        } else if peak_impact_pct < CLASS_HIGH_PCT {
            GridImpactClass::Moderate
        } else if peak_impact_pct < CLASS_CRITICAL_PCT {
            GridImpactClass::High
        } else {
            GridImpactClass::Critical
        }
    }

    fn infrastructure_cost(peak_dc_mw: f64, baseline_mw: f64) -> InfrastructureCost {
        let capacity_utilization =
            (baseline_mw + peak_dc_mw) / (baseline_mw * (1.0 + CAPACITY_MARGIN));

        if capacity_utilization > 1.0 {
            // The facility pushes demand past available headroom: new
            // transmission and substation capacity for the excess, plus
            // distribution for the full connection.
            let excess_mw = peak_dc_mw - baseline_mw * CAPACITY_MARGIN;
            let transmission = excess_mw * TRANSMISSION_COST_PER_MW;
            let distribution = peak_dc_mw * DISTRIBUTION_COST_PER_MW;
            let substation = excess_mw * SUBSTATION_COST_PER_MW;
            InfrastructureCost {
                transmission,
                distribution,
                substation,
                total: transmission + distribution + substation,
                required: true,
            }
        } else {
            let distribution = peak_dc_mw * MINOR_UPGRADE_COST_PER_MW;
            InfrastructureCost {
                transmission: 0.0,
                distribution,
                substation: 0.0,
                total: distribution,
                required: false,
            }
        }
    }

    fn household_impact(
        infrastructure: &InfrastructureCost,
        households: u64,
        avg_household_bill: f64,
    ) -> HouseholdImpact {
        let annual_community = infrastructure.total / AMORTIZATION_YEARS;
        let annual_per_house = annual_community / households as f64;
        let monthly_per_house = annual_per_house / 12.0;
        HouseholdImpact {
            monthly_usd: monthly_per_house,
            annual_usd: annual_per_house,
            pct_increase: monthly_per_house / avg_household_bill * 100.0,
            total_community_usd: annual_community,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(baseline_mw: f64, households: u64) -> GridContext {
        GridContext {
            region: GridRegion::Default,
            baseline_demand_mw: baseline_mw,
            total_households: households,
            avg_household_bill_usd: 120.0,
        }
    }

    #[test]
    fn registry_holds_all_eleven_regions() {
        let registry = GridRegistry::new();
        for region in GridRegion::ALL {
            let profile = registry.profile(region);
            assert!(profile.base_rate_usd_per_kwh > 0.0);
            assert!(profile.peak_multiplier >= 1.0);
            assert!(profile.carbon_kg_per_kwh >= 0.0);
        }
        assert_eq!(registry.profile(GridRegion::Caiso).carbon_kg_per_kwh, 0.209);
        assert_eq!(registry.profile(GridRegion::Ercot).peak_multiplier, 3.0);
        assert_eq!(registry.profile(GridRegion::Default).base_rate_usd_per_kwh, 0.10);
    }

    #[test]
    fn fips_resolution_basic_states() {
        assert_eq!(GridRegion::from_state_fips("06"), GridRegion::Caiso);
        assert_eq!(GridRegion::from_state_fips("48"), GridRegion::Ercot);
        assert_eq!(GridRegion::from_state_fips("36"), GridRegion::Nyiso);
        assert_eq!(GridRegion::from_state_fips("53"), GridRegion::Pacnw);
        assert_eq!(GridRegion::from_state_fips("42"), GridRegion::Pjm);
        assert_eq!(GridRegion::from_state_fips("25"), GridRegion::Isone);
        assert_eq!(GridRegion::from_state_fips("20"), GridRegion::Spp);
        assert_eq!(GridRegion::from_state_fips("12"), GridRegion::Serc);
        assert_eq!(GridRegion::from_state_fips("04"), GridRegion::West);
    }

    #[test]
    fn split_states_resolve_to_majority_operator() {
        // IL, IN, MI, MO, IA, MN, AR, LA sit in MISO.
        for fips in ["17", "18", "26", "29", "19", "27", "05", "22"] {
            assert_eq!(GridRegion::from_state_fips(fips), GridRegion::Miso, "{fips}");
        }
        // NC, TN, MS resolve to SERC, Montana to WEST.
        for fips in ["37", "47", "28"] {
            assert_eq!(GridRegion::from_state_fips(fips), GridRegion::Serc, "{fips}");
        }
        assert_eq!(GridRegion::from_state_fips("30"), GridRegion::West);
    }

    #[test]
    fn unknown_fips_falls_back_to_default() {
        assert_eq!(GridRegion::from_state_fips("99"), GridRegion::Default);
        assert_eq!(GridRegion::from_state_fips(""), GridRegion::Default);
        assert_eq!(GridRegion::from_state_fips("02"), GridRegion::Default);
        assert_eq!(GridRegion::from_state_fips("15"), GridRegion::Default);
    }

    #[test]
    fn impact_percentages_track_trace_shape() {
        let calc = GridImpactCalculator::new();
        // 10 MW peak, 5 MW average against a 1,000 MW baseline.
        let trace = vec![5_000.0, 10_000.0, 5_000.0, 0.0];
        let summary = calc.assess(&trace, &context(1_000.0, 50_000));
        assert!((summary.peak_impact_pct - 1.0).abs() < 1e-9);
        assert!((summary.avg_impact_pct - 0.5).abs() < 1e-9);
        assert_eq!(summary.stability_risk, StabilityRisk::Moderate);
        assert_eq!(summary.grid_class, GridImpactClass::Moderate);
    }

    #[test]
    fn stability_thresholds_at_boundaries() {
        assert_eq!(GridImpactCalculator::stability_risk(0.49), StabilityRisk::Low);
        assert_eq!(GridImpactCalculator::stability_risk(0.5), StabilityRisk::Moderate);
        assert_eq!(GridImpactCalculator::stability_risk(2.0), StabilityRisk::High);
        assert_eq!(GridImpactCalculator::stability_risk(5.0), StabilityRisk::Critical);
    }

    #[test]
    fn classification_thresholds_at_boundaries() {
        assert_eq!(GridImpactCalculator::classify(0.05), GridImpactClass::Negligible);
        assert_eq!(GridImpactCalculator::classify(0.1), GridImpactClass::Low);
        assert_eq!(GridImpactCalculator::classify(0.5), GridImpactClass::Moderate);
        assert_eq!(GridImpactCalculator::classify(2.0), GridImpactClass::High);
        assert_eq!(GridImpactCalculator::classify(5.0), GridImpactClass::Critical);
    }

    #[test]
    fn small_load_needs_only_minor_upgrades() {
        let calc = GridImpactCalculator::new();
        // 10 MW peak against 1,000 MW baseline: well inside the 15% margin.
        let trace = vec![10_000.0];
        let summary = calc.assess(&trace, &context(1_000.0, 50_000));
        assert!(!summary.infrastructure_cost.required);
        assert_eq!(summary.infrastructure_cost.transmission, 0.0);
        assert_eq!(summary.infrastructure_cost.substation, 0.0);
        assert!((summary.infrastructure_cost.total - 10.0 * 25_000.0).abs() < 1e-6);
    }

    #[test]
    fn oversized_load_triggers_new_infrastructure() {
        let calc = GridImpactCalculator::new();
        // 200 MW peak against a 1,000 MW baseline exceeds the 150 MW margin.
        let trace = vec![200_000.0];
        let summary = calc.assess(&trace, &context(1_000.0, 50_000));
        let cost = &summary.infrastructure_cost;
        assert!(cost.required);
        let excess = 200.0 - 150.0;
        assert!((cost.transmission - excess * 50_000.0).abs() < 1e-6);
        assert!((cost.distribution - 200.0 * 75_000.0).abs() < 1e-6);
        assert!((cost.substation - excess * 100_000.0).abs() < 1e-6);
        assert!((cost.total - (cost.transmission + cost.distribution + cost.substation)).abs() < 1e-6);
    }

    #[test]
    fn household_amortization_math() {
        let calc = GridImpactCalculator::new();
        let trace = vec![200_000.0];
        let summary = calc.assess(&trace, &context(1_000.0, 50_000));
        let expected_annual_community = summary.infrastructure_cost.total / 15.0;
        let hh = &summary.household_impact;
        assert!((hh.total_community_usd - expected_annual_community).abs() < 1e-6);
        assert!((hh.annual_usd - expected_annual_community / 50_000.0).abs() < 1e-9);
        assert!((hh.monthly_usd - hh.annual_usd / 12.0).abs() < 1e-9);
        assert!((hh.pct_increase - hh.monthly_usd / 120.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_baseline_substitutes_100_mw() {
        let calc = GridImpactCalculator::new();
        let trace = vec![2_000.0];
        let summary = calc.assess(&trace, &context(0.0, 50_000));
        // 2 MW against the substituted 100 MW baseline.
        assert!((summary.peak_impact_pct - 2.0).abs() < 1e-9);
        assert!(summary.peak_impact_pct.is_finite());
        assert!(summary.household_impact.monthly_usd.is_finite());
    }

    #[test]
    fn zero_households_substitutes_40_000() {
        let calc = GridImpactCalculator::new();
        let trace = vec![200_000.0];
        let summary = calc.assess(&trace, &context(1_000.0, 0));
        let expected_annual = summary.infrastructure_cost.total / 15.0 / 40_000.0;
        assert!((summary.household_impact.annual_usd - expected_annual).abs() < 1e-9);
    }

    #[test]
    fn impact_is_monotone_in_peak_power() {
        let calc = GridImpactCalculator::new();
        let ctx = context(1_000.0, 50_000);
        let mut previous = 0.0;
        for peak_kw in [1_000.0, 10_000.0, 50_000.0, 250_000.0] {
            let summary = calc.assess(&[peak_kw], &ctx);
            assert!(summary.peak_impact_pct > previous);
            previous = summary.peak_impact_pct;
        }
    }
}
