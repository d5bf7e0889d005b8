use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use log::{error, info, warn};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::calendar::Progress;
use crate::editor::{SaveOutcome, SaveRejection};
use crate::models::{is_valid_hour, ApiResponse, MonthKey, SaveHourInput};
use crate::session::Session;
use crate::store::{EntryStore, Identity, StaticIdentity, UserId};

/// Header carrying the signed-in user's id.
pub const USER_HEADER: &str = "x-user-id";

/// Shared handler state. Sessions are created on a user's first request and
/// kept until the user signs out.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn EntryStore>,
    predefined_tags: Arc<Vec<String>>,
    sessions: Arc<Mutex<HashMap<UserId, Arc<Session>>>>,
}

impl AppState {
    pub fn new(store: Arc<dyn EntryStore>, predefined_tags: Vec<String>) -> Self {
        Self {
            store,
            predefined_tags: Arc::new(predefined_tags),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn session_for(&self, headers: &HeaderMap) -> Result<Arc<Session>, StatusCode> {
        let identity = identity_from(headers);
        let user = identity
            .current_user()
            .await
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(&user) {
            return Ok(Arc::clone(session));
        }

        let start = MonthKey::of(Utc::now().date_naive());
        let session = Session::start(
            &identity,
            Arc::clone(&self.store),
            self.predefined_tags.as_ref().clone(),
            start,
        )
        .await
        .map_err(|e| {
            warn!("Rejected session: {}", e);
            StatusCode::UNAUTHORIZED
        })?;

        let session = Arc::new(session);
        sessions.insert(user, Arc::clone(&session));
        Ok(session)
    }

    /// Drops the user's session, and with it their month cache. Returns
    /// whether one existed.
    async fn end_session(&self, user: UserId) -> bool {
        let removed = self.sessions.lock().await.remove(&user).is_some();
        if removed {
            info!("Ended session for {}", user);
        }
        removed
    }
}

fn identity_from(headers: &HeaderMap) -> StaticIdentity {
    let user = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .map(UserId);
    StaticIdentity(user)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/tags", get(list_tags))
        .route("/calendar/:year/:month", get(get_calendar))
        .route("/session", delete(sign_out))
        .route("/days", delete(close_day))
        .route("/days/:date", get(open_day))
        .route("/days/:date/hours/:hour", put(save_hour))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> &'static str {
    "Hour Tracker API v0.1.0"
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn list_tags(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.predefined_tags.as_ref().clone())
}

/// Navigate to a month (1-based) and return its heatmap
async fn get_calendar(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<ApiResponse>, StatusCode> {
    let session = state.session_for(&headers).await?;
    let key = MonthKey::new(year, month).ok_or(StatusCode::BAD_REQUEST)?;

    // a newer navigation for the same user won the race
    let grid = session
        .show_month(key)
        .await
        .ok_or(StatusCode::CONFLICT)?;

    let legend: Vec<_> = Progress::ALL
        .iter()
        .map(|p| serde_json::json!({ "progress": p, "label": p.legend() }))
        .collect();

    Ok(Json(ApiResponse {
        status: "success".to_string(),
        message: grid.title.clone(),
        data: Some(serde_json::json!({
            "calendar": grid,
            "legend": legend,
        })),
    }))
}

/// Open a day in the editor and return its 24 slots
async fn open_day(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(date): Path<NaiveDate>,
) -> Result<Json<ApiResponse>, StatusCode> {
    let session = state.session_for(&headers).await?;
    // a newer selection for the same user won the race
    let day = session
        .select_date(date)
        .await
        .ok_or(StatusCode::CONFLICT)?;

    Ok(Json(ApiResponse {
        status: "success".to_string(),
        message: format!("{} of 24 hours tracked", day.filled_hours()),
        data: Some(serde_json::json!({
            "date": date,
            "hours": day.slot_views(),
        })),
    }))
}

/// Replace one hour's tags and details
async fn save_hour(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((date, hour)): Path<(NaiveDate, u8)>,
    Json(input): Json<SaveHourInput>,
) -> Result<Json<ApiResponse>, StatusCode> {
    let session = state.session_for(&headers).await?;
    if !is_valid_hour(hour) {
        return Err(StatusCode::BAD_REQUEST);
    }

    match session
        .save_hour(date, hour, &input.tags, input.details.as_deref())
        .await
    {
        SaveOutcome::Saved { entry, day, month } => Ok(Json(ApiResponse {
            status: "success".to_string(),
            message: format!("Saved {} {:02}:00", date, hour),
            data: Some(serde_json::json!({
                "entry": entry,
                "hours": day.unwrap_or_default().slot_views(),
                "month": month,
            })),
        })),
        SaveOutcome::Rejected(SaveRejection::EmptyTags) => Err(StatusCode::UNPROCESSABLE_ENTITY),
        SaveOutcome::Rejected(SaveRejection::NoHourSelected) => Err(StatusCode::BAD_REQUEST),
        SaveOutcome::Failed(e) => {
            error!("Error saving hour: {}", e);
            Err(StatusCode::BAD_GATEWAY)
        }
    }
}

/// Close the editor, discarding unsaved edits
async fn close_day(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, StatusCode> {
    let session = state.session_for(&headers).await?;
    session.close_day().await;
    Ok(StatusCode::NO_CONTENT)
}

/// Sign out, dropping the session and its cached months
async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, StatusCode> {
    let user = identity_from(&headers)
        .current_user()
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;
    state.end_session(user).await;
    Ok(StatusCode::NO_CONTENT)
}
