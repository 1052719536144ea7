//! API Handlers
use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::stream::{self, Stream, StreamExt};
use guide_core::{Guide, GuideError, GuideRequest, ProgressEvent, GUIDE_ENGINE_VERSION};
use guide_engine::TripState;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::info;

fn outcome(result: &Result<Guide, GuideError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(err) => err.code(),
    }
}

pub async fn create_guide(
    State(state): State<AppState>,
    payload: Result<Json<GuideRequest>, JsonRejection>,
) -> Result<Json<Guide>, ApiError> {
    let Json(request) = payload?;
    info!(destination = %request.destination, "guide requested");

    let started = Instant::now();
    let result = state.engine.generate_guide(request).await;
    state.metrics.observe(outcome(&result), started.elapsed());
    Ok(Json(result?))
}

fn progress_event(progress: &ProgressEvent) -> Event {
    Event::default()
        .event("progress")
        .json_data(progress)
        .unwrap_or_else(|_| Event::default().event("progress").data(progress.message.clone()))
}

fn final_event(result: Result<Guide, ApiError>) -> Event {
    let (name, body) = match result {
        Ok(guide) => ("guide", serde_json::to_value(guide).unwrap_or(Value::Null)),
        Err(err) => ("error", err.body()),
    };
    Event::default().event(name).data(body.to_string())
}

/// Progress events while the guide is generated, then one `guide` or
/// `error` event carrying the outcome
pub async fn stream_guide(
    State(state): State<AppState>,
    payload: Result<Json<GuideRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let Json(request) = payload?;
    let (tx, rx) = mpsc::unbounded_channel();

    let engine = state.engine.clone();
    let metrics = state.metrics.clone();
    let generation = tokio::spawn(async move {
        let started = Instant::now();
        let result = engine.generate_guide_with_progress(request, tx).await;
        metrics.observe(outcome(&result), started.elapsed());
        result
    });

    // The progress channel closes when generation drops its sender
    let progress = UnboundedReceiverStream::new(rx).map(|p| progress_event(&p));
    let finished = stream::once(async move {
        let result = match generation.await {
            Ok(result) => result.map_err(ApiError::from),
            Err(join) => Err(ApiError::Internal(join.to_string())),
        };
        final_event(result)
    });

    Ok(Sse::new(progress.chain(finished).map(Ok)).keep_alive(KeepAlive::default()))
}

async fn load_trip(state: &AppState, id: &str) -> Result<TripState, ApiError> {
    state
        .engine
        .load_trip(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("trip '{}'", id)))
}

pub async fn get_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TripState>, ApiError> {
    Ok(Json(load_trip(&state, &id).await?))
}

pub async fn get_trip_markdown(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let trip = load_trip(&state, &id).await?;
    let markdown = state.renderer.render(&trip.guide)?;
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        markdown,
    ))
}

pub async fn providers_health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "providers": state.engine.breakers(),
        "cache": state.engine.cache_stats(),
    }))
}

pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": GUIDE_ENGINE_VERSION })),
    )
}

pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .metrics
        .encode()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
