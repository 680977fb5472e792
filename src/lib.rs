//! Data center power forecast service.
//!
//! Simulates the annual operating profile of a proposed data center at a
//! geographic location, quantifies its grid and community impact, and
//! streams progress and analysis to clients over SSE.

pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod report;
pub mod services;
pub mod simulation;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::services::{
    AnthropicClient, CensusLocationClient, ClimateProvider, EiaEnergyClient, EnergyPriceProvider,
    LocationProvider, NarrativeProvider, OpenWeatherClient,
};
use crate::simulation::GridRegistry;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub registry: Arc<GridRegistry>,
    pub location: Arc<dyn LocationProvider>,
    pub energy: Arc<dyn EnergyPriceProvider>,
    pub climate: Arc<dyn ClimateProvider>,
    pub narrative: Arc<dyn NarrativeProvider>,
}

impl AppState {
    /// Wires the HTTP provider clients from settings. Provider calls share a
    /// client with a hard timeout; the narrative client only bounds
    /// connection setup, since analysis streams can legitimately run long.
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let provider_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.provider_timeout_secs))
            .build()?;
        let narrative_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(settings.provider_timeout_secs))
            .build()?;

        Ok(Self {
            location: Arc::new(CensusLocationClient::new(provider_client.clone(), &settings)),
            energy: Arc::new(EiaEnergyClient::new(provider_client.clone(), &settings)),
            climate: Arc::new(OpenWeatherClient::new(provider_client, &settings)),
            narrative: Arc::new(AnthropicClient::new(narrative_client, &settings)),
            registry: Arc::new(GridRegistry::new()),
            settings,
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::forecast::health_check))
        .route(
            "/api/datacenter-types",
            get(handlers::forecast::datacenter_types),
        )
        .route("/api/forecast", post(handlers::forecast::run_forecast))
        .route(
            "/api/forecast/stream",
            post(handlers::stream::stream_forecast),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
