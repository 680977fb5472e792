use std::env;

/// Runtime settings, loaded once at startup from the environment
/// (`config.env` is read into the environment by `main` before this runs).
///
/// Provider base URLs are configurable so integration tests can point the
/// service at a local mock server.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    // Credentials. Never logged.
    pub anthropic_api_key: Option<String>,
    pub census_api_key: Option<String>,
    pub eia_api_key: Option<String>,
    pub openweather_api_key: Option<String>,
    pub mapbox_token: Option<String>,

    // Provider endpoints.
    pub census_geocoder_url: String,
    pub census_acs_url: String,
    pub eia_base_url: String,
    pub openweather_base_url: String,
    pub mapbox_base_url: String,
    pub anthropic_base_url: String,

    pub anthropic_model: String,
    pub provider_timeout_secs: u64,
    pub report_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok(),
            census_api_key: env::var("CENSUS_API_KEY").ok(),
            eia_api_key: env::var("EIA_API_KEY").ok(),
            openweather_api_key: env::var("OPENWEATHER_API_KEY").ok(),
            mapbox_token: env::var("MAPBOX_TOKEN").ok(),
            census_geocoder_url: env::var("CENSUS_GEOCODER_URL").unwrap_or_else(|_| {
                "https://geocoding.geo.census.gov/geocoder/geographies/coordinates".to_string()
            }),
            census_acs_url: env::var("CENSUS_ACS_URL")
                .unwrap_or_else(|_| "https://api.census.gov/data/2021/acs/acs5".to_string()),
            eia_base_url: env::var("EIA_BASE_URL")
                .unwrap_or_else(|_| "https://api.eia.gov".to_string()),
            openweather_base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org".to_string()),
            mapbox_base_url: env::var("MAPBOX_BASE_URL")
                .unwrap_or_else(|_| "https://api.mapbox.com".to_string()),
            anthropic_base_url: env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com".to_string()),
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-5-20250929".to_string()),
            provider_timeout_secs: env::var("PROVIDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            report_path: env::var("REPORT_PATH")
                .unwrap_or_else(|_| "forecast_report.json".to_string()),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::default()
    }
}
