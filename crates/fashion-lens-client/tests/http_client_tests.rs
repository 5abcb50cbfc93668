//! Integration tests for the HTTP client against a local axum server.

use std::collections::HashMap;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use fashion_lens_client::{AnalysisError, HttpRecommendationClient, RecommendationService};
use fashion_lens_core::StillImage;
use serde_json::{Value, json};

async fn spawn_service(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let address = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server should run");
    });
    format!("http://{address}")
}

fn png_still() -> StillImage {
    StillImage::new(vec![0x89, b'P', b'N', b'G', 1, 2, 3], "image/png").expect("valid still")
}

async fn echo_detect(Form(form): Form<HashMap<String, String>>) -> Json<Value> {
    let image = form.get("image").cloned().unwrap_or_default();
    let gender = match StillImage::from_data_uri(&image) {
        Ok(_) => "female",
        Err(_) => "invalid",
    };
    Json(json!({
        "gender": gender,
        "skin_tone": "medium",
        "clothing_styles": [{"item": "Saree", "fabric": "Silk", "color": "Red"}]
    }))
}

#[tokio::test]
async fn http_client_tests_posts_data_uri_form_field() {
    let base = spawn_service(Router::new().route("/detect_face", post(echo_detect))).await;
    let client = HttpRecommendationClient::new(&base, Duration::from_secs(5)).expect("client");

    let response = client.detect_face(&png_still()).await.expect("analysis should succeed");
    assert_eq!(response.gender.as_deref(), Some("female"));
    assert_eq!(response.clothing_styles.map(|styles| styles.len()), Some(1));
}

#[tokio::test]
async fn http_client_tests_passes_embedded_error_through() {
    let router = Router::new().route(
        "/detect_face",
        post(|| async { Json(json!({"error": "No face detected"})) }),
    );
    let base = spawn_service(router).await;
    let client = HttpRecommendationClient::new(&base, Duration::from_secs(5)).expect("client");

    let response = client.detect_face(&png_still()).await.expect("200 is a valid envelope");
    assert_eq!(response.embedded_error(), Some("No face detected"));
}

#[tokio::test]
async fn http_client_tests_prefers_service_message_on_error_status() {
    let router = Router::new().route(
        "/detect_face",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "No image data provided"})),
            )
        }),
    );
    let base = spawn_service(router).await;
    let client = HttpRecommendationClient::new(&base, Duration::from_secs(5)).expect("client");

    let error = client.detect_face(&png_still()).await.expect_err("500 should fail");
    assert_eq!(error, AnalysisError::Application("No image data provided".to_string()));
}

#[tokio::test]
async fn http_client_tests_classifies_plain_error_status_as_transport() {
    let router = Router::new().route(
        "/detect_face",
        post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
    );
    let base = spawn_service(router).await;
    let client = HttpRecommendationClient::new(&base, Duration::from_secs(5)).expect("client");

    let error = client.detect_face(&png_still()).await.expect_err("502 should fail");
    assert!(matches!(error, AnalysisError::Transport(_)));
}

#[tokio::test]
async fn http_client_tests_deadline_expiry_is_transport_failure() {
    let router = Router::new().route(
        "/detect_face",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({}))
        }),
    );
    let base = spawn_service(router).await;
    let client = HttpRecommendationClient::new(&base, Duration::from_millis(200)).expect("client");

    let error = client.detect_face(&png_still()).await.expect_err("deadline should expire");
    assert_eq!(error, AnalysisError::Transport("request deadline exceeded".to_string()));
}

#[tokio::test]
async fn http_client_tests_downloads_styles_export() {
    let router = Router::new().route(
        "/generate_clothing_styles_json",
        get(|| async { Json(json!({"clothing_styles": [{"item": "Kurta"}]})) }),
    );
    let base = spawn_service(router).await;
    let client = HttpRecommendationClient::new(&base, Duration::from_secs(5)).expect("client");

    let bytes = client.download_styles().await.expect("download should succeed");
    let parsed: Value = serde_json::from_slice(&bytes).expect("export is json");
    assert_eq!(parsed["clothing_styles"][0]["item"], "Kurta");
}
