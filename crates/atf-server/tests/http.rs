use std::sync::Arc;

use atf_mapping::MappingTable;
use atf_server::{AppState, MAX_INPUT_CHARS, router};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use tower::util::ServiceExt;

fn make_state(disable_cache: bool) -> AppState {
    AppState::new(Arc::new(MappingTable::builtin().unwrap()), disable_cache)
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json(response: Response) -> serde_json::Value {
    let body_bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}

async fn assert_bad_request(uri: &str, needle: &str) {
    let response = get(router(make_state(false)), uri).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json(response).await;
    let error = body["error"].as_str().unwrap_or_default().to_lowercase();
    assert!(error.contains(needle), "{error:?} lacks {needle:?}");
}

#[tokio::test]
async fn healthz_ok() {
    let response = get(router(make_state(false)), "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn convert_word_to_oracc() {
    let response = get(
        router(make_state(false)),
        "/v1/convert?word=szu-s,i2&direction=cdli-to-oracc",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=300"
    );
    let body = json(response).await;
    assert_eq!(body["input"], "szu-s,i2");
    assert_eq!(body["direction"], "cdli-to-oracc");
    assert_eq!(body["output"], "šu-ṣi₂");
}

#[tokio::test]
async fn convert_word_to_cdli() {
    // šu₂
    let response = get(
        router(make_state(false)),
        "/v1/convert?word=%C5%A1u%E2%82%82&direction=o2c",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["direction"], "oracc-to-cdli");
    assert_eq!(body["output"], "szu2");
}

#[tokio::test]
async fn convert_line_keeps_label() {
    let response = get(
        router(make_state(false)),
        "/v1/convert_line?line=1.%20szu%20%7Bd%7Dutu&direction=c2o&has_label=true",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["output"], "1. šu {d}utu");
}

#[tokio::test]
async fn clean_strips_editorial_marks() {
    let response = get(
        router(make_state(false)),
        "/v1/clean?line=o.1%20%5Bx%5D%20%3Cszu%3E%20%7Bd%7Dutu&has_label=true",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["output"], "o.1 x szu d⁼utu");
}

#[tokio::test]
async fn classify_exact_pair() {
    let response = get(
        router(make_state(false)),
        "/v1/classify?cdli=szu&oracc=%C5%A1u",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["label"], "exact");
    assert_eq!(body["sim_cdli_to_oracc"], 1.0);
    assert_eq!(body["sim_oracc_to_cdli"], 1.0);
}

#[tokio::test]
async fn classify_misaligned_pair_skips_reverse_check() {
    let response = get(
        router(make_state(false)),
        "/v1/classify?cdli=dumu&oracc=dumu%5D-er-s,e-tim",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["label"], "likely_misaligned");
    assert_eq!(body["sim_cdli_to_oracc"], 0.25);
    assert!(body["sim_oracc_to_cdli"].is_null());
}

#[tokio::test]
async fn classify_honours_custom_thresholds() {
    // ma-na vs ma-n: 0.8 both ways
    let uri = "/v1/classify?cdli=ma-na&oracc=ma-n&high=0.75";
    let body = json(get(router(make_state(false)), uri).await).await;
    assert_eq!(body["label"], "high");

    let body = json(get(router(make_state(false)), "/v1/classify?cdli=ma-na&oracc=ma-n").await).await;
    assert_eq!(body["label"], "conversion_issue");
}

#[tokio::test]
async fn rejects_invalid_requests() {
    assert_bad_request("/v1/convert?word=szu&direction=sideways", "invalid direction").await;
    assert_bad_request("/v1/convert?word=%7Bd&direction=c2o", "determinative").await;
    assert_bad_request(
        "/v1/convert_line?line=a%20b%7D&direction=c2o",
        "brace",
    )
    .await;
    assert_bad_request(
        "/v1/classify?cdli=a&oracc=a&high=0.2&likely_misaligned=0.5",
        "threshold",
    )
    .await;

    let long = "a".repeat(MAX_INPUT_CHARS + 1);
    assert_bad_request(
        &format!("/v1/convert?word={long}&direction=c2o"),
        "at most",
    )
    .await;
}

#[tokio::test]
async fn missing_params_are_rejected() {
    let response = get(router(make_state(false)), "/v1/convert?word=szu").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cache_header_can_be_disabled() {
    let response = get(
        router(make_state(true)),
        "/v1/convert?word=szu&direction=c2o",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CACHE_CONTROL).is_none());
}

#[tokio::test]
async fn custom_mapping_table_is_served() {
    let tempdir = tempfile::tempdir().unwrap();
    let path = tempdir.path().join("conventions.tsv");
    std::fs::write(&path, "cdli\toracc\nsz\tš\nh\tḫ\n").unwrap();
    let table = MappingTable::from_path(&path).unwrap();
    let app = router(AppState::new(Arc::new(table), false));

    let body = json(get(app.clone(), "/v1/convert?word=szu-hu&direction=c2o").await).await;
    assert_eq!(body["output"], "šu-ḫu");
    // no numeral rows, so index digits pass through
    let body = json(get(app, "/v1/convert?word=du3&direction=c2o").await).await;
    assert_eq!(body["output"], "du3");
}
