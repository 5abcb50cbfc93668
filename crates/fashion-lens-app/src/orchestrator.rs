//! Single in-flight analysis request and the view state it drives.
//!
//! State machine: `Idle -> Loading -> {Results | Error} -> Idle`. At most one
//! request is pending; further submissions are refused with
//! [`AdmissionError::Busy`] until the pending one resolves. Outcomes carry
//! the request id they belong to and anything other than the pending id is
//! dropped as stale.

use fashion_lens_analysis_contract::{DetectFaceResponse, map_analysis_result};
use fashion_lens_client::{AnalysisError, RecommendationService};
use fashion_lens_core::{SourceKind, StillImage};
use fashion_lens_ui::{ErrorKind, UiState};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Message shown for transport failures without a service message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to process image. Please try again.";

/// Monotonic identity of one analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Status of one analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    /// Waiting on the service.
    Pending,
    /// Results were applied.
    Succeeded,
    /// An error was applied.
    Failed,
}

/// One call to the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Identity.
    pub id: RequestId,
    /// Submitted still; kept after failure so the user can retry.
    pub image: StillImage,
    /// Lifecycle status.
    pub status: RequestStatus,
}

/// What [`AnalysisOrchestrator::resolve`] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Outcome applied to the view state.
    Applied(RequestStatus),
    /// Outcome did not belong to the pending request and was dropped.
    Stale,
}

/// Owner of the analysis request lifecycle and of [`UiState`].
#[derive(Debug, Default)]
pub struct AnalysisOrchestrator {
    state: UiState,
    request: Option<AnalysisRequest>,
    issued: u64,
}

impl AnalysisOrchestrator {
    /// Creates an idle orchestrator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current view state.
    pub fn state(&self) -> &UiState {
        &self.state
    }

    /// Most recent request, pending or resolved.
    pub fn request(&self) -> Option<&AnalysisRequest> {
        self.request.as_ref()
    }

    /// Id of the pending request, if one is in flight.
    pub fn pending(&self) -> Option<RequestId> {
        self.request
            .as_ref()
            .filter(|request| request.status == RequestStatus::Pending)
            .map(|request| request.id)
    }

    /// Shows that an input source is open.
    ///
    /// Moves out of `Idle`, another `AwaitingInput`, or a camera error. Results
    /// and analysis errors stay visible.
    pub fn await_input(&mut self, source: SourceKind) {
        let replaceable = matches!(
            self.state,
            UiState::Idle
                | UiState::AwaitingInput(_)
                | UiState::Error {
                    kind: ErrorKind::Capture,
                    ..
                }
        );
        if replaceable {
            self.state = UiState::AwaitingInput(source);
        }
    }

    /// Records that a new image was selected from `source`.
    ///
    /// Any error on screen is dismissed and a failed request stops being a
    /// retry candidate. Results stay visible.
    pub fn input_selected(&mut self, source: SourceKind) {
        if self.pending().is_some() {
            return;
        }
        if matches!(self.state, UiState::Error { .. }) {
            if self
                .request
                .as_ref()
                .is_some_and(|request| request.status == RequestStatus::Failed)
            {
                debug!("failed request superseded by new selection");
                self.request = None;
            }
            self.state = UiState::AwaitingInput(source);
            return;
        }
        self.await_input(source);
    }

    /// Surfaces a camera failure. Ignored while a request is pending.
    pub fn show_capture_error(&mut self, message: impl Into<String>) {
        if self.pending().is_some() {
            return;
        }
        self.state = UiState::Error {
            kind: ErrorKind::Capture,
            message: message.into(),
        };
    }

    /// Admits `image` as the new pending request and enters `Loading`.
    ///
    /// # Errors
    /// Returns [`AdmissionError::Busy`] while another request is pending.
    pub fn begin(&mut self, image: StillImage) -> Result<RequestId, AdmissionError> {
        if let Some(pending) = self.pending() {
            debug!(pending = pending.value(), "submission refused; request in flight");
            return Err(AdmissionError::Busy(pending));
        }

        self.issued += 1;
        let id = RequestId(self.issued);
        info!(
            request = id.value(),
            bytes = image.len(),
            fingerprint = %image.fingerprint(),
            "analysis request started"
        );
        self.request = Some(AnalysisRequest {
            id,
            image,
            status: RequestStatus::Pending,
        });
        self.state = UiState::Loading;
        Ok(id)
    }

    /// Applies the outcome of request `id`.
    ///
    /// An embedded service `error` wins over everything else; a transport
    /// failure without a service message shows [`GENERIC_FAILURE_MESSAGE`].
    pub fn resolve(
        &mut self,
        id: RequestId,
        outcome: Result<DetectFaceResponse, AnalysisError>,
    ) -> Resolution {
        let Some(request) = self
            .request
            .as_mut()
            .filter(|request| request.id == id && request.status == RequestStatus::Pending)
        else {
            debug!(request = id.value(), "dropping stale analysis outcome");
            return Resolution::Stale;
        };

        let (status, state) = match outcome {
            Ok(response) => match response.embedded_error() {
                Some(message) => {
                    info!(
                        request = id.value(),
                        kind = "application",
                        error = message,
                        "service reported an error"
                    );
                    (RequestStatus::Failed, failure(ErrorKind::Application, message))
                }
                None => {
                    let result = map_analysis_result(&response);
                    info!(
                        request = id.value(),
                        gender = %result.gender,
                        skin_tone = %result.skin_tone,
                        items = result.clothing.len(),
                        "analysis succeeded"
                    );
                    (RequestStatus::Succeeded, UiState::Results(result))
                }
            },
            Err(AnalysisError::Application(message)) => {
                info!(
                    request = id.value(),
                    kind = "application",
                    error = %message,
                    "service reported an error"
                );
                (RequestStatus::Failed, failure(ErrorKind::Application, message))
            }
            Err(AnalysisError::Transport(detail)) => {
                warn!(
                    request = id.value(),
                    kind = "transport",
                    detail = %detail,
                    "analysis transport failure"
                );
                (
                    RequestStatus::Failed,
                    failure(ErrorKind::Transport, GENERIC_FAILURE_MESSAGE),
                )
            }
        };

        request.status = status;
        self.state = state;
        Resolution::Applied(status)
    }

    /// Submits `image` and awaits the service.
    ///
    /// # Errors
    /// Returns [`AdmissionError::Busy`] while another request is pending.
    /// Service failures are not errors here; they land in the view state.
    pub async fn submit<S>(
        &mut self,
        service: &S,
        image: StillImage,
    ) -> Result<RequestId, AdmissionError>
    where
        S: RecommendationService + ?Sized,
    {
        let id = self.begin(image.clone())?;
        let outcome = service.detect_face(&image).await;
        self.resolve(id, outcome);
        Ok(id)
    }

    /// Re-submits the image of the last failed analysis.
    ///
    /// # Errors
    /// Returns [`AdmissionError::NothingToRetry`] unless the last request
    /// failed and the view still shows its error.
    pub async fn retry<S>(&mut self, service: &S) -> Result<RequestId, AdmissionError>
    where
        S: RecommendationService + ?Sized,
    {
        let image = self
            .request
            .as_ref()
            .filter(|request| request.status == RequestStatus::Failed)
            .filter(|_| {
                matches!(
                    self.state.error_kind(),
                    Some(ErrorKind::Application | ErrorKind::Transport)
                )
            })
            .map(|request| request.image.clone())
            .ok_or(AdmissionError::NothingToRetry)?;

        self.submit(service, image).await
    }

    /// Returns to `Idle`, discarding the last request and its result.
    ///
    /// Only acts from `Results` or `Error`; returns whether it did.
    pub fn clear(&mut self) -> bool {
        if !matches!(self.state, UiState::Results(_) | UiState::Error { .. }) {
            return false;
        }

        self.request = None;
        self.state = UiState::Idle;
        debug!("results cleared");
        true
    }
}

fn failure(kind: ErrorKind, message: impl Into<String>) -> UiState {
    UiState::Error {
        kind,
        message: message.into(),
    }
}

/// Submission refused by admission control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// A request is already pending.
    #[error("analysis request {} is still pending", .0.value())]
    Busy(RequestId),
    /// There is no failed analysis to retry.
    #[error("nothing to retry")]
    NothingToRetry,
}
