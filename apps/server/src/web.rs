use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use aircon_engine::error::{CycleError, ScheduleError, StoreError};
use aircon_engine::schedule::{self, fill_with_default, listing_window, validate_edit};
use aircon_engine::{Orchestrator, Outcome, ScheduleConfig, ScheduleEntry, TemperatureRange};

// Shared between the tick loop and the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub last_run: Arc<RwLock<LastRun>>,
}

#[derive(Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRun {
    pub outcome: Option<Outcome>,
    pub at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    last_run: LastRun,
    today: ScheduleEntry,
    temperature_range: TemperatureRange,
}

#[derive(Serialize)]
struct RunResponse {
    outcome: Outcome,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            last_run: Arc::new(RwLock::new(LastRun::default())),
        }
    }

    fn today(&self) -> NaiveDate {
        self.orchestrator.config().today(Utc::now())
    }

    /// Run one cycle and remember how it ended.
    pub async fn run_and_record(&self) -> Result<Outcome, CycleError> {
        let result = self.orchestrator.run_cycle().await;
        let mut last_run = self.last_run.write().await;
        last_run.at = Some(Utc::now());
        match &result {
            Ok(outcome) => {
                info!(%outcome, "cycle finished");
                last_run.outcome = Some(*outcome);
                last_run.error = None;
            }
            Err(e) => {
                error!(error = %e, "cycle aborted");
                last_run.outcome = None;
                last_run.error = Some(e.to_string());
            }
        }
        result
    }

    async fn entry(&self, date: NaiveDate) -> Result<ScheduleEntry, StoreError> {
        let effective = self.orchestrator.effective_schedule(date).await?;
        Ok(ScheduleEntry {
            date,
            schedule: effective.schedule,
            is_default: effective.is_default,
        })
    }
}

pub enum ApiError {
    BadDate(String),
    Body(JsonRejection),
    Invalid(ScheduleError),
    Store(StoreError),
    Cycle(CycleError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadDate(raw) => (
                StatusCode::BAD_REQUEST,
                format!("invalid date {raw:?}, expected YYYY-MM-DD"),
            ),
            ApiError::Body(rejection) => (rejection.status(), rejection.body_text()),
            ApiError::Invalid(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            ApiError::Store(e) => {
                error!(error = %e, "store request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Cycle(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };
        let body = Json(serde_json::json!({
            "success": false,
            "error": message,
        }));
        (status, body).into_response()
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    schedule::parse_date_key(raw).ok_or_else(|| ApiError::BadDate(raw.to_string()))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/schedules", get(list_schedules))
        .route(
            "/api/schedules/:date",
            get(get_schedule).put(put_schedule).delete(reset_schedule),
        )
        .route("/api/run", post(run_now))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let last_run = state.last_run.read().await.clone();
    let today = state.entry(state.today()).await?;
    Ok(Json(StatusResponse {
        last_run,
        today,
        temperature_range: state.orchestrator.config().temperature_range,
    }))
}

async fn list_schedules(State(state): State<AppState>) -> Result<Json<Vec<ScheduleEntry>>, ApiError> {
    let (start, end) = listing_window(state.today());
    let stored: BTreeMap<_, _> = state
        .orchestrator
        .schedules()
        .list(start, end)
        .await?
        .into_iter()
        .collect();
    let default_arrival = state.orchestrator.config().default_arrival;
    Ok(Json(fill_with_default(start, end, &stored, default_arrival)))
}

async fn get_schedule(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<ScheduleEntry>, ApiError> {
    let date = parse_date(&raw)?;
    Ok(Json(state.entry(date).await?))
}

async fn put_schedule(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    body: Result<Json<ScheduleConfig>, JsonRejection>,
) -> Result<Json<ScheduleEntry>, ApiError> {
    let date = parse_date(&raw)?;
    let Json(schedule) = body.map_err(ApiError::Body)?;
    validate_edit(state.today(), date, &schedule).map_err(ApiError::Invalid)?;
    state.orchestrator.schedules().set(date, schedule).await?;
    info!(%date, arrival = %schedule.arrival, disabled = schedule.disabled, "schedule updated");
    Ok(Json(ScheduleEntry {
        date,
        schedule,
        is_default: false,
    }))
}

async fn reset_schedule(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<StatusCode, ApiError> {
    let date = parse_date(&raw)?;
    state.orchestrator.schedules().reset(date).await?;
    info!(%date, "schedule reset to default");
    Ok(StatusCode::NO_CONTENT)
}

async fn run_now(State(state): State<AppState>) -> Result<Json<RunResponse>, ApiError> {
    let outcome = state.run_and_record().await.map_err(ApiError::Cycle)?;
    Ok(Json(RunResponse { outcome }))
}
