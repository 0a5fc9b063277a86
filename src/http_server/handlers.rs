//! Request handlers for the REST mirror

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::domain::{Difficulty, Operation, PracticeMode, UserSettings};
use crate::error::PracticeError;
use crate::stats::{PracticeSessionRecord, ProgressDelta, ProgressFilter, ProgressStore, TimeWindow};

/// Status code plus JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }
}

/// Body of `POST /api/achievements/check`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckRequest {
    #[serde(default)]
    session: Option<PracticeSessionRecord>,
}

/// Dispatch one request against the store
pub fn route(
    store: &ProgressStore,
    method: &str,
    path: &str,
    query: &str,
    body: &str,
    now: DateTime<Utc>,
) -> ApiResponse {
    match (method, path.trim_end_matches('/')) {
        ("GET", "/api/health") => ApiResponse::ok(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })),
        ("GET", "/api/progress") => handle_progress_get(store, query),
        ("POST", "/api/progress") => handle_progress_post(store, body, now),
        ("GET", "/api/sessions") => handle_sessions_get(store, query, now),
        ("POST", "/api/sessions") => handle_sessions_post(store, body, now),
        ("GET", "/api/settings") => match store.query().settings() {
            Ok(settings) => ApiResponse::ok(json!(settings)),
            Err(e) => store_error(e),
        },
        ("PUT", "/api/settings") => handle_settings_put(store, body),
        ("GET", "/api/achievements") => match store.achievements().progress(None, now) {
            Ok(progress) => ApiResponse::ok(json!({ "achievements": progress })),
            Err(e) => store_error(e),
        },
        ("POST", "/api/achievements/check") => handle_achievements_check(store, body, now),
        ("GET", "/api/export") => match store.export(now) {
            Ok(snapshot) => ApiResponse::ok(json!(snapshot)),
            Err(e) => store_error(e),
        },
        ("POST", "/api/clear") => match store.clear_all() {
            Ok(()) => ApiResponse::ok(json!({ "status": "ok" })),
            Err(e) => store_error(e),
        },
        _ => ApiResponse::error(404, "not_found"),
    }
}

fn handle_progress_get(store: &ProgressStore, query: &str) -> ApiResponse {
    let filter = match parse_filter(query) {
        Ok(filter) => filter,
        Err(e) => return ApiResponse::error(400, e.to_string()),
    };
    match store.query().progress(filter.operation, filter.difficulty) {
        Ok(progress) => ApiResponse::ok(json!({ "progress": progress })),
        Err(e) => store_error(e),
    }
}

fn handle_progress_post(store: &ProgressStore, body: &str, now: DateTime<Utc>) -> ApiResponse {
    let delta: ProgressDelta = match parse_body(body) {
        Ok(delta) => delta,
        Err(response) => return response,
    };
    match store.recorder().record_progress(&delta, now) {
        Ok(progress) => ApiResponse::ok(json!(progress)),
        Err(e) => store_error(e),
    }
}

fn handle_sessions_get(store: &ProgressStore, query: &str, now: DateTime<Utc>) -> ApiResponse {
    let filter = match parse_filter(query) {
        Ok(filter) => filter,
        Err(e) => return ApiResponse::error(400, e.to_string()),
    };
    match store.query().sessions(&filter, now) {
        Ok(sessions) => ApiResponse::ok(json!({ "sessions": sessions })),
        Err(e) => store_error(e),
    }
}

fn handle_sessions_post(store: &ProgressStore, body: &str, now: DateTime<Utc>) -> ApiResponse {
    let record: PracticeSessionRecord = match parse_body(body) {
        Ok(record) => record,
        Err(response) => return response,
    };
    match store.recorder().record_session(&record, now) {
        Ok(recorded) => ApiResponse {
            status: if recorded { 201 } else { 200 },
            body: json!({ "id": record.id, "recorded": recorded }),
        },
        Err(e) => store_error(e),
    }
}

fn handle_settings_put(store: &ProgressStore, body: &str) -> ApiResponse {
    let settings: UserSettings = match parse_body(body) {
        Ok(settings) => settings,
        Err(response) => return response,
    };
    if !settings.voice_speed.is_finite() || settings.voice_speed <= 0.0 {
        return ApiResponse::error(400, "voiceSpeed must be a positive number");
    }
    match store.recorder().save_settings(&settings) {
        Ok(()) => ApiResponse::ok(json!(settings)),
        Err(e) => store_error(e),
    }
}

fn handle_achievements_check(store: &ProgressStore, body: &str, now: DateTime<Utc>) -> ApiResponse {
    let request: CheckRequest = if body.trim().is_empty() {
        CheckRequest::default()
    } else {
        match parse_body(body) {
            Ok(request) => request,
            Err(response) => return response,
        }
    };
    if let Some(Err(e)) = request.session.as_ref().map(PracticeSessionRecord::validate) {
        return ApiResponse::error(400, e.to_string());
    }
    match store.achievements().check(request.session.as_ref(), now) {
        Ok(unlocked) => ApiResponse::ok(json!({ "unlocked": unlocked })),
        Err(e) => store_error(e),
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiResponse> {
    serde_json::from_str(body).map_err(|e| ApiResponse::error(400, format!("invalid JSON: {}", e)))
}

/// Parse `operation`, `difficulty`, `mode` and `window` query parameters.
/// Keys and values are percent-decoded first.
fn parse_filter(query: &str) -> Result<ProgressFilter, PracticeError> {
    let mut filter = ProgressFilter::default();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let value = value.as_ref();
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "operation" => filter.operation = Some(value.parse::<Operation>()?),
            "difficulty" => filter.difficulty = Some(value.parse::<Difficulty>()?),
            "mode" => filter.mode = Some(value.parse::<PracticeMode>()?),
            "window" => filter.window = value.parse::<TimeWindow>()?,
            _ => {}
        }
    }
    Ok(filter)
}

/// Invariant violations are the client's fault; anything else is ours
fn store_error(err: anyhow::Error) -> ApiResponse {
    match err.downcast_ref::<PracticeError>() {
        Some(PracticeError::InvalidConfiguration(msg)) | Some(PracticeError::InvalidState(msg)) => {
            ApiResponse::error(400, msg.clone())
        }
        _ => {
            error!("[mathdrill:http] Store error: {:#}", err);
            ApiResponse::error(500, "storage_failure")
        }
    }
}
