#![warn(missing_docs)]
//! # fashion-lens-app
//!
//! ## Purpose
//! Wires image acquisition, the remote recommendation service, and the view
//! state into one controller for `fashion-lens`.
//!
//! ## Responsibilities
//! - Keep the upload and camera inputs mutually exclusive.
//! - Admit at most one analysis request and drop stale outcomes.
//! - Map service outcomes into [`fashion_lens_ui::UiState`] with a fixed error
//!   precedence.
//! - Load layered settings for the binary.
//!
//! ## Data flow
//! File or camera frame -> [`session::ImageSourceSession`] selection ->
//! [`orchestrator::AnalysisOrchestrator`] request -> service response ->
//! [`fashion_lens_ui::UiState`] results or error.
//!
//! ## Ownership and lifetimes
//! [`FashionLens`] owns every stateful part. Stills are shared through
//! reference-counted buffers, so the preview and the in-flight request never
//! copy image bytes.
//!
//! ## Error model
//! Caller mistakes (busy, wrong mode, nothing selected) and subsystem failures
//! are returned as [`AppError`]. Service failures are not errors at this level;
//! they become [`fashion_lens_ui::UiState::Error`].

pub mod config;
pub mod controller;
pub mod orchestrator;
pub mod session;

use std::sync::Arc;

use fashion_lens_capture::{CameraPlatform, CaptureError, MediaCaptureController, RenderSurface};
use fashion_lens_client::{AnalysisError, ClientError, HttpRecommendationClient};
use thiserror::Error;

pub use config::{AppConfig, SettingsError};
pub use controller::{FashionLens, StylesExport};
pub use orchestrator::{AdmissionError, AnalysisOrchestrator, GENERIC_FAILURE_MESSAGE, RequestId};
pub use session::{FileSource, ImageSourceSession, InMemoryFile, InputMode, LocalFile, UploadError};

/// Build-time application version loaded from the root `VERSION` file.
pub const APP_VERSION: &str = env!("FASHION_LENS_VERSION");

/// Notice shown when the styles export cannot be fetched.
pub const DOWNLOAD_FAILURE_MESSAGE: &str = "Failed to download clothing styles";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Builds a controller talking HTTP to the configured service.
///
/// # Errors
/// Returns [`AppError::Client`] when the service endpoint is unusable.
pub fn connect(
    config: &AppConfig,
    platform: Arc<dyn CameraPlatform>,
    surface: Box<dyn RenderSurface>,
) -> Result<FashionLens<HttpRecommendationClient>, AppError> {
    let client = HttpRecommendationClient::new(&config.service.base_url, config.service.timeout())?;
    let capture = MediaCaptureController::new(platform, surface)
        .with_jpeg_quality(config.camera.jpeg_quality);
    let sources = ImageSourceSession::new(config.upload.max_bytes, config.camera.constraints());
    Ok(FashionLens::new(client, capture, sources))
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Inputs are locked while an analysis is running.
    #[error("an analysis is in progress")]
    Busy,
    /// Upload failed.
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),
    /// Camera failed.
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),
    /// Submission refused.
    #[error("admission error: {0}")]
    Admission(#[from] AdmissionError),
    /// Nothing to submit.
    #[error("no image selected")]
    NothingSelected,
    /// Styles export download failed.
    #[error("download error: {0}")]
    Download(AnalysisError),
    /// Settings could not be loaded.
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    /// Service client could not be built.
    #[error("client error: {0}")]
    Client(#[from] ClientError),
}
