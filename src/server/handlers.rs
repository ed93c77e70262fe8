//! HTTP handlers for the race API.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::orchestration::{StartRequest, SubmitOutcome};
use crate::pipeline::Strategy;
use crate::race::{Part, RaceSnapshot};
use crate::{rlog, rlog_debug};

use super::error::ApiResult;
use super::AppState;

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub has_session: bool,
    pub current_year: i32,
}

#[derive(Debug, Deserialize)]
pub struct StartBody {
    pub year: u16,
    pub day: u8,
    #[serde(default)]
    pub aoc_session: Option<String>,
    /// One-shot solving instead of the multi-agent pipeline.
    #[serde(default)]
    pub fast_mode: bool,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub success: bool,
    pub race_id: String,
    pub puzzle_title: String,
    pub puzzle_part1: String,
    pub input_url: String,
    pub strategy: Strategy,
    pub practice_mode: bool,
}

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    pub part: u8,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub rate_limited: bool,
}

impl From<SubmitOutcome> for SubmitResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        Self {
            success: true,
            correct: outcome.correct,
            message: Some(outcome.message),
            hint: outcome.hint,
            rate_limited: outcome.rate_limited,
        }
    }
}

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        has_session: state.service.has_default_session(),
        current_year: chrono::Local::now().year(),
    })
}

/// POST /api/race/start
pub async fn start_race(
    State(state): State<AppState>,
    payload: Result<Json<StartBody>, JsonRejection>,
) -> ApiResult<Json<StartResponse>> {
    let Json(body) = payload?;
    rlog!(
        "POST /api/race/start year={} day={} fast_mode={}",
        body.year,
        body.day,
        body.fast_mode
    );
    // fast_mode only ever opts in; otherwise the configured strategy applies.
    let strategy = body.fast_mode.then_some(Strategy::OneShot);
    let snapshot = state
        .service
        .start_race(StartRequest {
            year: body.year,
            day: body.day,
            session: body.aoc_session,
            strategy,
        })
        .await?;

    Ok(Json(StartResponse {
        success: true,
        race_id: snapshot.race_id.to_string(),
        puzzle_title: snapshot.puzzle_title,
        puzzle_part1: snapshot.puzzle_part1,
        input_url: snapshot.input_url,
        strategy: snapshot.strategy,
        practice_mode: snapshot.practice_mode,
    }))
}

/// GET /api/race/status
pub async fn race_status(State(state): State<AppState>) -> ApiResult<Json<RaceSnapshot>> {
    Ok(Json(state.service.poll_status().await?))
}

/// POST /api/race/submit
pub async fn submit_answer(
    State(state): State<AppState>,
    payload: Result<Json<SubmitBody>, JsonRejection>,
) -> ApiResult<Json<SubmitResponse>> {
    let Json(body) = payload?;
    let part = Part::try_from(body.part)?;
    rlog_debug!("POST /api/race/submit part={}", part);
    let outcome = state.service.submit_answer(part, &body.answer).await?;
    Ok(Json(outcome.into()))
}

/// POST /api/race/reset
pub async fn reset_race(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.service.reset_race();
    Json(serde_json::json!({}))
}

/// GET /health
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Local::now().to_rfc3339(),
    }))
}
