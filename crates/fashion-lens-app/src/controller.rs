//! Presentation-facing facade over sessions, capture, and the orchestrator.

use std::time::{SystemTime, UNIX_EPOCH};

use fashion_lens_capture::{CaptureError, MediaCaptureController, StreamHandle};
use fashion_lens_client::RecommendationService;
use fashion_lens_core::{SourceKind, StillImage};
use fashion_lens_ui::{InputAffordances, Notice, UiState};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::AppError;
use crate::orchestrator::{AnalysisOrchestrator, RequestId};
use crate::session::{CameraPhase, FileSource, ImageSourceSession, InputMode};

/// Downloaded styles export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylesExport {
    /// Suggested file name, `clothing_styles_<unix_ms>.json`.
    pub file_name: String,
    /// Raw JSON bytes as served.
    pub bytes: Vec<u8>,
}

/// Image acquisition and result lifecycle controller.
///
/// Owns the capture controller, the input sessions, and the orchestrator;
/// presentation reads [`FashionLens::state`] and calls the entry points.
pub struct FashionLens<S> {
    service: S,
    capture: MediaCaptureController,
    sources: ImageSourceSession,
    orchestrator: AnalysisOrchestrator,
    notice: Option<Notice>,
}

impl<S: RecommendationService> FashionLens<S> {
    /// Wires the controller. Upload mode is live initially.
    pub fn new(service: S, capture: MediaCaptureController, sources: ImageSourceSession) -> Self {
        Self {
            service,
            capture,
            sources,
            orchestrator: AnalysisOrchestrator::new(),
            notice: None,
        }
    }

    /// Current view state.
    pub fn state(&self) -> &UiState {
        self.orchestrator.state()
    }

    /// Last session notice, if any.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Enabled input controls.
    pub fn affordances(&self) -> InputAffordances {
        self.state().affordances()
    }

    /// Live input mode.
    pub fn input_mode(&self) -> InputMode {
        self.sources.mode()
    }

    /// Selected still, if any.
    pub fn selected_image(&self) -> Option<&StillImage> {
        self.sources.selected()
    }

    /// Camera phase; `None` in upload mode.
    pub fn camera_phase(&self) -> Option<&CameraPhase> {
        self.sources.camera().map(|camera| camera.phase())
    }

    /// Capture controller, for diagnostics.
    pub fn capture_controller(&self) -> &MediaCaptureController {
        &self.capture
    }

    /// Orchestrator, for diagnostics.
    pub fn orchestrator(&self) -> &AnalysisOrchestrator {
        &self.orchestrator
    }

    fn ensure_unlocked(&self) -> Result<(), AppError> {
        if self.state().is_loading() {
            return Err(AppError::Busy);
        }
        Ok(())
    }

    /// Switches to upload mode, closing the camera if it is open.
    ///
    /// # Errors
    /// Returns [`AppError::Busy`] while an analysis is running.
    pub fn open_upload(&mut self) -> Result<(), AppError> {
        self.ensure_unlocked()?;
        self.sources.switch_to(InputMode::Upload, &mut self.capture);
        self.orchestrator.await_input(SourceKind::Upload);
        Ok(())
    }

    /// Validates and reads `source` into the selection (upload mode).
    ///
    /// Rejections are reported as a notice and through the error; the view
    /// state and any existing selection are left as they were. An accepted
    /// file dismisses a shown error and replaces the failed request as the
    /// retry candidate.
    ///
    /// # Errors
    /// Returns [`AppError::Busy`] while loading and [`AppError::Upload`] when
    /// the file is rejected or unreadable.
    pub async fn select_file(&mut self, source: &dyn FileSource) -> Result<StillImage, AppError> {
        self.ensure_unlocked()?;
        match self.sources.select_file(source).await {
            Ok(still) => {
                let still = still.clone();
                self.notice = None;
                self.orchestrator.input_selected(SourceKind::Upload);
                Ok(still)
            }
            Err(error) => {
                self.notice = Some(Notice::warning(error.user_message()));
                Err(error.into())
            }
        }
    }

    /// Selects `source` and submits it immediately.
    ///
    /// # Errors
    /// See [`FashionLens::select_file`] and [`FashionLens::submit`].
    pub async fn analyze_file(&mut self, source: &dyn FileSource) -> Result<RequestId, AppError> {
        let still = self.select_file(source).await?;
        self.submit(still).await
    }

    /// Switches to camera mode and starts the stream.
    ///
    /// A failed start moves the view to a capture error, except when the
    /// opening was cancelled. A successful start dismisses an earlier capture
    /// error.
    ///
    /// # Errors
    /// Returns [`AppError::Busy`] while loading and [`AppError::Capture`]
    /// when the camera cannot be started.
    pub async fn open_camera(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<StreamHandle, AppError> {
        self.ensure_unlocked()?;
        self.sources.switch_to(InputMode::Camera, &mut self.capture);

        let Some(camera) = self.sources.camera_mut() else {
            return Err(AppError::Capture(CaptureError::StreamInactive));
        };

        match camera.open(&mut self.capture, cancel).await {
            Ok(handle) => {
                self.notice = None;
                self.orchestrator.await_input(SourceKind::Camera);
                Ok(handle)
            }
            Err(CaptureError::Cancelled) => {
                info!("camera opening cancelled by caller");
                self.notice = Some(Notice::info(CaptureError::Cancelled.user_message()));
                Err(AppError::Capture(CaptureError::Cancelled))
            }
            Err(error) => {
                self.orchestrator.show_capture_error(error.user_message());
                Err(error.into())
            }
        }
    }

    /// Captures one still from the live camera.
    ///
    /// A frame that is not ready yet only raises a notice.
    ///
    /// # Errors
    /// Returns [`AppError::Busy`] while loading and [`AppError::Capture`]
    /// when capture fails.
    pub fn capture(&mut self) -> Result<StillImage, AppError> {
        self.ensure_unlocked()?;
        let camera = self
            .sources
            .camera_mut()
            .ok_or(AppError::Capture(CaptureError::StreamInactive))?;

        match camera.capture(&mut self.capture) {
            Ok(still) => {
                let still = still.clone();
                self.notice = None;
                Ok(still)
            }
            Err(error) => {
                self.notice = Some(Notice::warning(error.user_message()));
                Err(error.into())
            }
        }
    }

    /// Discards the captured still; returns whether there was one.
    pub fn retake(&mut self) -> bool {
        if self.state().is_loading() {
            return false;
        }
        self.sources.camera_mut().is_some_and(|camera| camera.retake())
    }

    /// Stops the camera and returns it to `Closed`.
    pub fn close_camera(&mut self) {
        if let Some(camera) = self.sources.camera_mut() {
            camera.close(&mut self.capture);
        }
    }

    /// Submits the captured still, replacing the selection and closing the
    /// camera.
    ///
    /// # Errors
    /// Returns [`AppError::NothingSelected`] without a capture, plus the
    /// errors of [`FashionLens::submit`].
    pub async fn submit_capture(&mut self) -> Result<RequestId, AppError> {
        self.ensure_unlocked()?;
        let still = self
            .sources
            .promote_capture(&mut self.capture)
            .cloned()
            .ok_or(AppError::NothingSelected)?;
        self.submit(still).await
    }

    /// Submits the current selection.
    ///
    /// # Errors
    /// Returns [`AppError::NothingSelected`] without a selection, plus the
    /// errors of [`FashionLens::submit`].
    pub async fn submit_current(&mut self) -> Result<RequestId, AppError> {
        let still = self.sources.selected().cloned().ok_or(AppError::NothingSelected)?;
        self.submit(still).await
    }

    /// Submits `image` for analysis and awaits the outcome.
    ///
    /// # Errors
    /// Returns [`AppError::Admission`] while another request is pending.
    pub async fn submit(&mut self, image: StillImage) -> Result<RequestId, AppError> {
        self.notice = None;
        Ok(self.orchestrator.submit(&self.service, image).await?)
    }

    /// Re-submits the image of the last failed analysis.
    ///
    /// # Errors
    /// Returns [`AppError::Admission`] when there is nothing to retry.
    pub async fn retry(&mut self) -> Result<RequestId, AppError> {
        Ok(self.orchestrator.retry(&self.service).await?)
    }

    /// Clears results or error back to `Idle` and drops the selection.
    pub fn clear(&mut self) -> bool {
        if !self.orchestrator.clear() {
            return false;
        }
        self.sources.clear_selection();
        self.notice = None;
        true
    }

    /// Downloads the latest styles export.
    ///
    /// # Errors
    /// Returns [`AppError::Busy`] while loading and [`AppError::Download`]
    /// when the service call fails.
    pub async fn download_styles(&mut self) -> Result<StylesExport, AppError> {
        self.ensure_unlocked()?;
        let bytes = self.service.download_styles().await.map_err(|error| {
            warn!(error = %error, "styles export download failed");
            self.notice = Some(Notice::warning(crate::DOWNLOAD_FAILURE_MESSAGE));
            AppError::Download(error)
        })?;

        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        info!(bytes = bytes.len(), "styles export downloaded");
        Ok(StylesExport {
            file_name: format!("clothing_styles_{stamp}.json"),
            bytes,
        })
    }

    /// Releases the camera before the controller goes away.
    pub fn shutdown(&mut self) {
        self.sources.teardown(&mut self.capture);
    }
}
