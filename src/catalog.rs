use std::collections::BTreeMap;

use crate::models::{CoolingType, FacilityConfig, ServerClass, WorkloadClass};

/// Named facility size presets served by `GET /api/datacenter-types` and
/// resolved from the `size` request field.
pub fn size_presets() -> BTreeMap<&'static str, FacilityConfig> {
    let mut presets = BTreeMap::new();
    presets.insert(
        "small",
        FacilityConfig {
            name: "Small Edge Data Center".to_string(),
            power_mw: 1.0,
            servers: 100,
            square_feet: 5_000.0,
            water_gallons_per_day: 25_000.0,
            employees: 10,
            cooling_type: CoolingType::Air,
            server_type: ServerClass::Enterprise,
            datacenter_type: WorkloadClass::Enterprise,
        },
    );
    presets.insert(
        "medium",
        FacilityConfig {
            name: "Medium Enterprise Data Center".to_string(),
            power_mw: 10.0,
            servers: 1_000,
            square_feet: 50_000.0,
            water_gallons_per_day: 300_000.0,
            employees: 50,
            cooling_type: CoolingType::Air,
            server_type: ServerClass::Enterprise,
            datacenter_type: WorkloadClass::Enterprise,
        },
    );
    presets.insert(
        "large",
        FacilityConfig {
            name: "Large Hyperscale Data Center".to_string(),
            power_mw: 50.0,
            servers: 10_000,
            square_feet: 250_000.0,
            water_gallons_per_day: 1_500_000.0,
            employees: 200,
            cooling_type: CoolingType::Water,
            server_type: ServerClass::Enterprise,
            datacenter_type: WorkloadClass::CloudCompute,
        },
    );
    presets.insert(
        "mega",
        FacilityConfig {
            name: "Mega Hyperscale Data Center".to_string(),
            power_mw: 150.0,
            servers: 50_000,
            square_feet: 750_000.0,
            water_gallons_per_day: 5_000_000.0,
            employees: 500,
            cooling_type: CoolingType::Liquid,
            server_type: ServerClass::NvidiaH100,
            datacenter_type: WorkloadClass::AiTraining,
        },
    );
    presets
}

/// Resolves a preset by name, falling back to `medium` for unknown or
/// missing sizes.
pub fn preset_or_default(size: Option<&str>) -> FacilityConfig {
    let presets = size_presets();
    let key = size.unwrap_or("medium");
    match presets.get(key) {
        Some(preset) => preset.clone(),
        None => {
            tracing::warn!("Unknown data center size '{}', using medium", key);
            presets["medium"].clone()
        }
    }
}

/// Two-digit state FIPS code to state name, for report display.
pub fn state_name_from_fips(state_fips: &str) -> &'static str {
    match state_fips {
        "01" => "Alabama",
        "02" => "Alaska",
        "04" => "Arizona",
        "05" => "Arkansas",
        "06" => "California",
        "08" => "Colorado",
        "09" => "Connecticut",
        "10" => "Delaware",
        "11" => "District of Columbia",
        "12" => "Florida",
        "13" => "Georgia",
        "15" => "Hawaii",
        "16" => "Idaho",
        "17" => "Illinois",
        "18" => "Indiana",
        "19" => "Iowa",
        "20" => "Kansas",
        "21" => "Kentucky",
        "22" => "Louisiana",
        "23" => "Maine",
        "24" => "Maryland",
        "25" => "Massachusetts",
        "26" => "Michigan",
        "27" => "Minnesota",
        "28" => "Mississippi",
        "29" => "Missouri",
        "30" => "Montana",
        "31" => "Nebraska",
        "32" => "Nevada",
        "33" => "New Hampshire",
        "34" => "New Jersey",
        "35" => "New Mexico",
        "36" => "New York",
        "37" => "North Carolina",
        "38" => "North Dakota",
        "39" => "Ohio",
        "40" => "Oklahoma",
        "41" => "Oregon",
        "42" => "Pennsylvania",
        "44" => "Rhode Island",
        "45" => "South Carolina",
        "46" => "South Dakota",
        "47" => "Tennessee",
        "48" => "Texas",
        "49" => "Utah",
        "50" => "Vermont",
        "51" => "Virginia",
        "53" => "Washington",
        "54" => "West Virginia",
        "55" => "Wisconsin",
        "56" => "Wyoming",
        _ => "Unknown",
    }
}
