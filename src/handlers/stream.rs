use std::convert::Infallible;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::Result;
use crate::handlers::{grid_context, ForecastInputs};
use crate::models::{ForecastEvent, ForecastRequest, SimulationProgress};
use crate::report::{self, ReportInputs};
use crate::services::narrative::build_analysis_prompt;
use crate::simulation::{GridRegion, ProgressSink, SimulationError, Simulator, SinkClosed};
use crate::AppState;

/// A heartbeat is injected whenever this long passes without another event,
/// so intermediate proxies keep the connection open.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const EVENT_BUFFER: usize = 64;

/// Runs the forecast pipeline and streams progress as server-sent events.
/// Input validation happens before the stream opens, so bad requests still
/// get a plain 400.
pub async fn stream_forecast(
    State(state): State<AppState>,
    Json(request): Json<ForecastRequest>,
) -> Result<Response> {
    let inputs = ForecastInputs::from_request(&request)?;

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    tokio::spawn(run_pipeline(state, inputs, tx));

    let mut response = Sse::new(with_heartbeats(rx)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    Ok(response)
}

/// Wraps the event channel, yielding heartbeats across quiet stretches.
/// The stream ends when the pipeline task drops its sender.
fn with_heartbeats(
    rx: mpsc::Receiver<ForecastEvent>,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    futures::stream::unfold(rx, |mut rx| async move {
        match tokio::time::timeout(HEARTBEAT_INTERVAL, rx.recv()).await {
            Ok(Some(event)) => Some((Ok(sse_event(&event)), rx)),
            Ok(None) => None,
            Err(_) => Some((Ok(sse_event(&ForecastEvent::Heartbeat)), rx)),
        }
    })
}

fn sse_event(event: &ForecastEvent) -> Event {
    Event::default().json_data(event).unwrap_or_else(|e| {
        error!("Failed to serialize stream event: {e}");
        Event::default().data("{\"status\":\"error\",\"message\":\"event serialization failed\"}")
    })
}

enum PipelineAbort {
    /// The client disconnected; stop silently without a report.
    ClientGone,
    /// Something inside the pipeline broke; surface a terminal error event.
    Fatal(String),
}

impl From<SimulationError> for PipelineAbort {
    fn from(e: SimulationError) -> Self {
        match e {
            SimulationError::Cancelled => PipelineAbort::ClientGone,
            other => PipelineAbort::Fatal(other.to_string()),
        }
    }
}

async fn run_pipeline(state: AppState, inputs: ForecastInputs, tx: mpsc::Sender<ForecastEvent>) {
    let run_id = Uuid::new_v4();
    match pipeline(&state, &inputs, &tx, run_id).await {
        Ok(()) => info!(%run_id, "Streaming forecast complete"),
        Err(PipelineAbort::ClientGone) => {
            debug!(%run_id, "Client disconnected, forecast abandoned");
        }
        Err(PipelineAbort::Fatal(message)) => {
            error!(%run_id, "Streaming forecast failed: {message}");
            let _ = tx.send(ForecastEvent::Error { message }).await;
        }
    }
}

async fn send(
    tx: &mpsc::Sender<ForecastEvent>,
    event: ForecastEvent,
) -> std::result::Result<(), PipelineAbort> {
    tx.send(event).await.map_err(|_| PipelineAbort::ClientGone)
}

/// Forwards simulator progress onto the event channel. A closed channel
/// reads as cancellation back in the simulation loop.
struct ChannelSink {
    tx: mpsc::Sender<ForecastEvent>,
}

#[async_trait]
impl ProgressSink for ChannelSink {
    async fn emit(&self, progress: SimulationProgress) -> std::result::Result<(), SinkClosed> {
        self.tx
            .send(ForecastEvent::SimulationProgress { progress })
            .await
            .map_err(|_| SinkClosed)
    }
}

async fn pipeline(
    state: &AppState,
    inputs: &ForecastInputs,
    tx: &mpsc::Sender<ForecastEvent>,
    run_id: Uuid,
) -> std::result::Result<(), PipelineAbort> {
    send(
        tx,
        ForecastEvent::Started {
            step: "initializing".to_string(),
        },
    )
    .await?;

    send(
        tx,
        ForecastEvent::Progress {
            step: "fetching_location_data".to_string(),
        },
    )
    .await?;
    let location = state
        .location
        .resolve_location(inputs.latitude, inputs.longitude)
        .await;

    send(
        tx,
        ForecastEvent::Progress {
            step: "fetching_energy_data".to_string(),
        },
    )
    .await?;
    let region = GridRegion::from_state_fips(&location.state_fips);

    send(
        tx,
        ForecastEvent::Progress {
            step: "fetching_climate_data".to_string(),
        },
    )
    .await?;
    // Independent lookups, so they run together.
    let (energy, weather, address) = tokio::join!(
        state.energy.resolve_energy(&location.state_fips),
        state.climate.resolve_climate(inputs.latitude, inputs.longitude),
        state.location.resolve_address(inputs.latitude, inputs.longitude),
    );
    info!(
        %run_id,
        "Region {} resolved, rate ${}/kWh",
        region,
        energy.price_per_kwh
    );

    send(
        tx,
        ForecastEvent::Progress {
            step: "preparing_simulation".to_string(),
        },
    )
    .await?;
    let spec = inputs.config.to_spec();
    let climate_sample = weather.to_climate_sample();
    let context = grid_context(region, &location);
    let simulator = Simulator::for_spec(&spec)?;

    send(
        tx,
        ForecastEvent::Simulating {
            hours_total: inputs.hours,
        },
    )
    .await?;
    let sink = ChannelSink { tx: tx.clone() };
    let mut rng = inputs.rng();
    let result = simulator
        .run(
            &spec,
            &climate_sample,
            &context,
            inputs.hours,
            inputs.start,
            &mut rng,
            Some(&sink),
        )
        .await?;

    send(tx, ForecastEvent::CalculatingCosts).await?;
    let profile = state.registry.profile(region);
    let mut forecast = report::build_report(
        &ReportInputs {
            latitude: inputs.latitude,
            longitude: inputs.longitude,
            config: &inputs.config,
            location: &location,
            address,
            weather: &weather,
            region,
            profile,
            hours: inputs.hours,
        },
        &result,
    );

    send(tx, ForecastEvent::GeneratingAnalysis).await?;
    let prompt = build_analysis_prompt(&forecast);
    forecast.analysis = match state.narrative.stream(&prompt).await {
        Ok(mut chunks) => {
            let mut analysis = String::new();
            let mut failure: Option<String> = None;
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(text) => {
                        analysis.push_str(&text);
                        send(tx, ForecastEvent::AnalysisChunk { text }).await?;
                    }
                    Err(e) => {
                        failure = Some(e.to_string());
                        break;
                    }
                }
            }
            match failure {
                Some(message) => {
                    error!(%run_id, "Analysis stream failed: {message}");
                    send(
                        tx,
                        ForecastEvent::AnalysisError {
                            message: message.clone(),
                        },
                    )
                    .await?;
                    format!("Error generating analysis: {message}")
                }
                None => analysis,
            }
        }
        Err(e) => {
            error!(%run_id, "Analysis request failed: {e}");
            send(
                tx,
                ForecastEvent::AnalysisError {
                    message: e.to_string(),
                },
            )
            .await?;
            format!("Error generating analysis: {e}")
        }
    };

    report::persist_report(&state.settings.report_path, &forecast).await;

    send(
        tx,
        ForecastEvent::Complete {
            report: Box::new(forecast),
        },
    )
    .await?;
    Ok(())
}
