use std::sync::Arc;

use atf_align::SimilarityClassifier;
use atf_codec::{LineCodec, WordCodec, clean_line};
use atf_mapping::MappingTable;
use atf_types::{Direction, Label, Thresholds, WordPair};
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest accepted `word`/`line`/form parameter, in characters.
pub const MAX_INPUT_CHARS: usize = 2048;

#[derive(Clone)]
pub struct AppState {
    pub lines: LineCodec,
    pub classifier: Arc<SimilarityClassifier<WordCodec>>,
    pub thresholds: Thresholds,
    pub disable_cache: bool,
}

impl AppState {
    pub fn new(table: Arc<MappingTable>, disable_cache: bool) -> Self {
        let words = WordCodec::new(table);
        Self {
            lines: LineCodec::new(words.clone()),
            classifier: Arc::new(SimilarityClassifier::new(words)),
            thresholds: Thresholds::default(),
            disable_cache,
        }
    }
}

#[derive(Deserialize)]
pub struct ConvertQuery {
    pub word: String,
    pub direction: String,
}

#[derive(Deserialize)]
pub struct ConvertLineQuery {
    pub line: String,
    pub direction: String,
    pub has_label: Option<bool>,
}

#[derive(Deserialize)]
pub struct CleanQuery {
    pub line: String,
    pub has_label: Option<bool>,
}

#[derive(Deserialize)]
pub struct ClassifyQuery {
    pub cdli: String,
    pub oracc: String,
    pub high: Option<f64>,
    pub likely_misaligned: Option<f64>,
}

#[derive(Serialize)]
pub struct ConvertResponse {
    input: String,
    direction: Direction,
    output: String,
}

#[derive(Serialize)]
pub struct CleanResponse {
    input: String,
    output: String,
}

#[derive(Serialize)]
pub struct ClassifyResponse {
    label: Label,
    sim_cdli_to_oracc: f64,
    sim_oracc_to_cdli: Option<f64>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/convert", get(convert))
        .route("/v1/convert_line", get(convert_line))
        .route("/v1/clean", get(clean))
        .route("/v1/classify", get(classify))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn convert(
    State(state): State<AppState>,
    Query(params): Query<ConvertQuery>,
) -> Result<Response, ApiError> {
    let direction = parse_direction(&params.direction)?;
    check_len("word", &params.word)?;
    let output = state
        .lines
        .word_codec()
        .convert(&params.word, direction)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(cached(
        &state,
        ConvertResponse {
            input: params.word,
            direction,
            output,
        },
    ))
}

async fn convert_line(
    State(state): State<AppState>,
    Query(params): Query<ConvertLineQuery>,
) -> Result<Response, ApiError> {
    let direction = parse_direction(&params.direction)?;
    check_len("line", &params.line)?;
    let output = state
        .lines
        .convert_line(&params.line, direction, params.has_label.unwrap_or(false))
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(cached(
        &state,
        ConvertResponse {
            input: params.line,
            direction,
            output,
        },
    ))
}

async fn clean(
    State(state): State<AppState>,
    Query(params): Query<CleanQuery>,
) -> Result<Response, ApiError> {
    check_len("line", &params.line)?;
    let output = clean_line(&params.line, params.has_label.unwrap_or(false));
    Ok(cached(
        &state,
        CleanResponse {
            input: params.line,
            output,
        },
    ))
}

async fn classify(
    State(state): State<AppState>,
    Query(params): Query<ClassifyQuery>,
) -> Result<Response, ApiError> {
    check_len("cdli", &params.cdli)?;
    check_len("oracc", &params.oracc)?;
    let thresholds = Thresholds::new(
        params.high.unwrap_or(state.thresholds.high),
        params
            .likely_misaligned
            .unwrap_or(state.thresholds.likely_misaligned),
    )
    .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let pair = WordPair::new("", "", params.cdli, params.oracc);
    let result = state
        .classifier
        .classify(&pair, &thresholds)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(cached(
        &state,
        ClassifyResponse {
            label: result.label,
            sim_cdli_to_oracc: result.sim_ab,
            sim_oracc_to_cdli: result.sim_ba,
        },
    ))
}

fn parse_direction(raw: &str) -> Result<Direction, ApiError> {
    Direction::from_name(raw).ok_or_else(|| {
        ApiError::bad_request(format!(
            "invalid direction {raw:?}; expected cdli-to-oracc or oracc-to-cdli"
        ))
    })
}

fn check_len(name: &str, value: &str) -> Result<(), ApiError> {
    if value.chars().count() > MAX_INPUT_CHARS {
        return Err(ApiError::bad_request(format!(
            "{name} must be at most {MAX_INPUT_CHARS} characters"
        )));
    }
    Ok(())
}

/// JSON body with the shared Cache-Control header unless caching is disabled.
fn cached<T: Serialize>(state: &AppState, body: T) -> Response {
    if state.disable_cache {
        return Json(body).into_response();
    }
    (
        [(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=300"),
        )],
        Json(body),
    )
        .into_response()
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                let body = Json(ErrorResponse { error: msg });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
        }
    }
}
