use crate::models::{ClimateSample, CoolingType, EfficiencyRating};

/// PUE never drops below this regardless of climate.
const PUE_FLOOR: f64 = 1.02;
/// Wind benefit is capped at this PUE reduction.
const WIND_BENEFIT_CAP: f64 = 0.1;
/// Wind only helps above this speed (mph).
const WIND_THRESHOLD_MPH: f64 = 5.0;
/// Humidity above this percentage starts hurting cooling efficiency.
const HUMIDITY_THRESHOLD_PCT: f64 = 45.0;
/// Wet-bulb penalty for evaporative systems starts here (°F).
const EVAPORATIVE_WET_BULB_THRESHOLD_F: f64 = 65.0;
const EVAPORATIVE_WET_BULB_PENALTY_PER_F: f64 = 0.01;
/// Water usage rises 2 % per °F of dry-bulb above this.
const WATER_TEMP_THRESHOLD_F: f64 = 70.0;
const WATER_TEMP_MULTIPLIER_PER_F: f64 = 0.02;

/// Tuning constants for one cooling technology.
#[derive(Debug, Clone, Copy)]
pub struct CoolingConfig {
    pub base_pue: f64,
    pub optimal_temp_f: f64,
    /// PUE increase per °F of dry-bulb above optimal.
    pub temp_sensitivity: f64,
    /// PUE increase per % relative humidity above the threshold.
    pub humidity_factor: f64,
    /// PUE reduction per mph of wind above the threshold.
    pub wind_benefit: f64,
    pub max_pue: f64,
    /// Gallons of water per kWh of heat rejected.
    pub water_factor: f64,
}

impl CoolingConfig {
    pub fn for_type(cooling_type: CoolingType) -> Self {
        match cooling_type {
            CoolingType::Air => Self {
                base_pue: 1.4,
                optimal_temp_f: 65.0,
                temp_sensitivity: 0.012,
                humidity_factor: 0.003,
                wind_benefit: 0.005,
                max_pue: 2.0,
                water_factor: 0.2,
            },
            CoolingType::Water => Self {
                base_pue: 1.25,
                optimal_temp_f: 75.0,
                temp_sensitivity: 0.008,
                humidity_factor: 0.001,
                wind_benefit: 0.001,
                max_pue: 1.8,
                water_factor: 1.8,
            },
            CoolingType::Evaporative => Self {
                base_pue: 1.15,
                optimal_temp_f: 70.0,
                temp_sensitivity: 0.015,
                humidity_factor: 0.008,
                wind_benefit: 0.003,
                max_pue: 2.2,
                water_factor: 1.0,
            },
            CoolingType::Liquid => Self {
                base_pue: 1.05,
                optimal_temp_f: 80.0,
                temp_sensitivity: 0.005,
                humidity_factor: 0.0005,
                wind_benefit: 0.0,
                max_pue: 1.3,
                water_factor: 0.3,
            },
        }
    }
}

/// Climate-driven cooling efficiency model for one cooling technology.
#[derive(Debug, Clone)]
pub struct CoolingModel {
    cooling_type: CoolingType,
    config: CoolingConfig,
}

impl CoolingModel {
    pub fn for_type(cooling_type: CoolingType) -> Self {
        Self {
            cooling_type,
            config: CoolingConfig::for_type(cooling_type),
        }
    }

    pub fn cooling_type(&self) -> CoolingType {
        self.cooling_type
    }

    pub fn max_pue(&self) -> f64 {
        self.config.max_pue
    }

    /// Power usage effectiveness for the given climate, clamped to
    /// [1.02, max_pue].
    pub fn pue(&self, climate: &ClimateSample) -> f64 {
        let config = &self.config;
        let mut pue = config.base_pue;

        let temp_delta = (climate.dry_bulb_f - config.optimal_temp_f).max(0.0);
        pue += temp_delta * config.temp_sensitivity;

        let humidity_penalty =
            (climate.humidity_pct - HUMIDITY_THRESHOLD_PCT).max(0.0) * config.humidity_factor;
        pue += humidity_penalty;

        if climate.wind_mph > WIND_THRESHOLD_MPH {
            let wind_benefit = (config.wind_benefit
                * (climate.wind_mph - WIND_THRESHOLD_MPH))
                .min(WIND_BENEFIT_CAP);
            pue -= wind_benefit;
        }

        // Evaporative systems lose effectiveness as wet-bulb approaches dry-bulb.
        if self.cooling_type == CoolingType::Evaporative {
            pue += (climate.wet_bulb_f - EVAPORATIVE_WET_BULB_THRESHOLD_F).max(0.0)
                * EVAPORATIVE_WET_BULB_PENALTY_PER_F;
        }

        pue.clamp(PUE_FLOOR, config.max_pue)
    }

    /// Water draw in gallons per hour for a given IT load and climate.
    pub fn water_gph(&self, it_power_kw: f64, climate: &ClimateSample) -> f64 {
        let pue = self.pue(climate);
        let cooling_power_kw = it_power_kw * (pue - 1.0);
        let temp_multiplier = 1.0
            + (climate.dry_bulb_f - WATER_TEMP_THRESHOLD_F).max(0.0) * WATER_TEMP_MULTIPLIER_PER_F;
        cooling_power_kw * self.config.water_factor * temp_multiplier
    }

    /// Qualitative band for a PUE value.
    pub fn pue_rating(pue: f64) -> EfficiencyRating {
        if pue < 1.2 {
            EfficiencyRating::Excellent
        } else if pue < 1.4 {
            EfficiencyRating::Good
        } else if pue < 1.6 {
            EfficiencyRating::Fair
        } else {
            EfficiencyRating::Poor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn climate(dry_bulb: f64, humidity: f64, wind: f64) -> ClimateSample {
        ClimateSample {
            dry_bulb_f: dry_bulb,
            wet_bulb_f: dry_bulb - 10.0,
            humidity_pct: humidity,
            wind_mph: wind,
            solar_irradiance_wm2: 0.0,
        }
    }

    #[test]
    fn liquid_cooling_in_mild_climate_is_near_base_pue() {
        let model = CoolingModel::for_type(CoolingType::Liquid);
        // 70 F is below the 80 F optimum; humidity 50 adds 5 * 0.0005.
        let pue = model.pue(&climate(70.0, 50.0, 10.0));
        assert!((pue - 1.0525).abs() < 1e-9, "pue was {pue}");
    }

    #[test]
    fn hot_humid_climate_raises_air_cooled_pue() {
        let model = CoolingModel::for_type(CoolingType::Air);
        let mild = model.pue(&climate(65.0, 40.0, 0.0));
        let hot = model.pue(&climate(95.0, 80.0, 0.0));
        assert!((mild - 1.4).abs() < 1e-9);
        // 30 F over optimal plus 35 points of humidity.
        assert!((hot - (1.4 + 30.0 * 0.012 + 35.0 * 0.003)).abs() < 1e-9);
        assert!(hot > mild);
    }

    #[test]
    fn pue_clamps_at_configured_maximum() {
        let model = CoolingModel::for_type(CoolingType::Air);
        let extreme = model.pue(&climate(150.0, 100.0, 0.0));
        assert!((extreme - 2.0).abs() < 1e-12);
    }

    #[test]
    fn wind_benefit_is_capped() {
        let model = CoolingModel::for_type(CoolingType::Air);
        let breezy = model.pue(&climate(85.0, 50.0, 15.0));
        let gale = model.pue(&climate(85.0, 50.0, 80.0));
        // 0.005 * 10 mph = 0.05 below the cap; 0.005 * 75 would exceed it.
        let base = 1.4 + 20.0 * 0.012 + 5.0 * 0.003;
        assert!((breezy - (base - 0.05)).abs() < 1e-9);
        assert!((gale - (base - 0.1)).abs() < 1e-9);
    }

    #[test]
    fn evaporative_pays_a_wet_bulb_penalty() {
        let model = CoolingModel::for_type(CoolingType::Evaporative);
        let mut sample = climate(80.0, 40.0, 0.0);
        sample.wet_bulb_f = 60.0;
        let dry_wb = model.pue(&sample);
        sample.wet_bulb_f = 75.0;
        let wet_wb = model.pue(&sample);
        assert!((wet_wb - dry_wb - 0.10).abs() < 1e-9);
    }

    #[test]
    fn pue_never_drops_below_floor() {
        for cooling_type in [
            CoolingType::Air,
            CoolingType::Water,
            CoolingType::Evaporative,
            CoolingType::Liquid,
        ] {
            let model = CoolingModel::for_type(cooling_type);
            let pue = model.pue(&climate(-20.0, 0.0, 60.0));
            assert!(pue >= 1.02, "{cooling_type:?} produced {pue}");
        }
    }

    #[test]
    fn water_usage_scales_with_heat_and_temperature() {
        let model = CoolingModel::for_type(CoolingType::Water);
        let cool = model.water_gph(1000.0, &climate(60.0, 40.0, 0.0));
        let hot = model.water_gph(1000.0, &climate(90.0, 40.0, 0.0));
        assert!(cool > 0.0);
        assert!(hot > cool);

        // Air cooling uses far less water than cooling towers.
        let air = CoolingModel::for_type(CoolingType::Air);
        assert!(air.water_gph(1000.0, &climate(90.0, 40.0, 0.0)) < hot);
    }

    #[test]
    fn pue_rating_bands() {
        assert_eq!(CoolingModel::pue_rating(1.1), EfficiencyRating::Excellent);
        assert_eq!(CoolingModel::pue_rating(1.3), EfficiencyRating::Good);
        assert_eq!(CoolingModel::pue_rating(1.5), EfficiencyRating::Fair);
        assert_eq!(CoolingModel::pue_rating(1.9), EfficiencyRating::Poor);
    }
}
