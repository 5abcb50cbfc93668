//! Integration tests for admission control, downloads, and versioning.

mod common;

use common::{SAREE_RESPONSE, harness, png_still};
use fashion_lens_analysis_contract::parse_detect_response;
use fashion_lens_app::orchestrator::{
    AdmissionError, AnalysisOrchestrator, RequestStatus, Resolution,
};
use fashion_lens_app::{AppError, DOWNLOAD_FAILURE_MESSAGE, app_version};
use fashion_lens_client::AnalysisError;
use fashion_lens_ui::{InputAffordances, UiState};

#[test]
fn lifecycle_tests_pending_request_blocks_second_submission() {
    let mut orchestrator = AnalysisOrchestrator::new();
    let pending = orchestrator.begin(png_still(16)).expect("first admitted");

    assert_eq!(
        orchestrator.begin(png_still(32)),
        Err(AdmissionError::Busy(pending))
    );
    assert_eq!(orchestrator.state().affordances(), InputAffordances::locked());
    assert_eq!(
        orchestrator.request().map(|request| request.image.len()),
        Some(16)
    );
}

#[test]
fn lifecycle_tests_clear_from_results_then_submit_enters_loading() {
    let mut orchestrator = AnalysisOrchestrator::new();
    let id = orchestrator.begin(png_still(16)).expect("admitted");
    let response = parse_detect_response(SAREE_RESPONSE).expect("fixture parses");
    assert_eq!(
        orchestrator.resolve(id, Ok(response)),
        Resolution::Applied(RequestStatus::Succeeded)
    );

    assert!(orchestrator.clear());
    assert_eq!(orchestrator.state(), &UiState::Idle);
    assert!(orchestrator.request().is_none());

    orchestrator.begin(png_still(16)).expect("accepted after clear");
    assert_eq!(orchestrator.state(), &UiState::Loading);
}

#[test]
fn lifecycle_tests_late_outcome_for_replaced_request_is_dropped() {
    let mut orchestrator = AnalysisOrchestrator::new();
    let first = orchestrator.begin(png_still(16)).expect("admitted");
    orchestrator.resolve(first, Err(AnalysisError::Transport("reset".to_string())));
    assert!(orchestrator.clear());
    let second = orchestrator.begin(png_still(16)).expect("admitted");

    let late = parse_detect_response(r#"{"error": "No face detected"}"#).expect("parses");
    assert_eq!(orchestrator.resolve(first, Ok(late)), Resolution::Stale);
    assert_eq!(orchestrator.pending(), Some(second));
    assert!(orchestrator.state().is_loading());
}

#[test]
fn lifecycle_tests_non_success_body_error_is_application_error() {
    let mut orchestrator = AnalysisOrchestrator::new();
    let id = orchestrator.begin(png_still(16)).expect("admitted");

    orchestrator.resolve(id, Err(AnalysisError::Application("Invalid image".to_string())));

    assert_eq!(orchestrator.state().error_message(), Some("Invalid image"));
}

#[tokio::test]
async fn lifecycle_tests_download_names_export_by_timestamp() {
    let mut h = harness();
    h.service.set_download(Ok(br#"[{"item":"Saree"}]"#.to_vec()));

    let export = h.lens.download_styles().await.expect("download succeeds");

    let stamp = export
        .file_name
        .strip_prefix("clothing_styles_")
        .and_then(|rest| rest.strip_suffix(".json"))
        .expect("export name shape");
    assert!(stamp.parse::<u128>().is_ok());
    assert_eq!(export.bytes, br#"[{"item":"Saree"}]"#.to_vec());
}

#[tokio::test]
async fn lifecycle_tests_download_failure_sets_notice_only() {
    let mut h = harness();
    h.service
        .set_download(Err(AnalysisError::Transport("service responded with 500".to_string())));

    let error = h.lens.download_styles().await.expect_err("download fails");

    assert!(matches!(error, AppError::Download(_)));
    assert_eq!(
        h.lens.notice().map(|notice| notice.message.as_str()),
        Some(DOWNLOAD_FAILURE_MESSAGE)
    );
    assert_eq!(h.lens.state(), &UiState::Idle);
}

#[test]
fn lifecycle_tests_version_matches_root_file() {
    let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../VERSION"));
    assert_eq!(app_version(), raw.trim());
}
