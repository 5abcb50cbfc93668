#![warn(missing_docs)]
//! # fashion-lens-ui
//!
//! ## Purpose
//! Defines the single reconciled view state read by presentation.
//!
//! ## Responsibilities
//! - Represent idle, awaiting-input, loading, error, and result states.
//! - Derive which input affordances are enabled from the current state.
//! - Carry transient session notices that do not change the view state.
//!
//! ## Data flow
//! Orchestrator transitions mutate [`UiState`]; presentation reads it together
//! with [`InputAffordances`] and the optional [`Notice`].
//!
//! ## Ownership and lifetimes
//! `UiState` owns its result and message values so snapshots can be cloned
//! out to renderers freely.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors.

use fashion_lens_analysis_contract::AnalysisResult;
use fashion_lens_core::SourceKind;

/// Origin of an error shown in the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Message reported by the remote service.
    Application,
    /// Network, HTTP, or deadline failure.
    Transport,
    /// Camera could not be opened.
    Capture,
}

/// Reconciled view state. Exactly one variant holds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UiState {
    /// Nothing selected, nothing shown.
    #[default]
    Idle,
    /// An input source is open and waiting for an image.
    AwaitingInput(SourceKind),
    /// One analysis request is in flight.
    Loading,
    /// The last operation failed.
    Error {
        /// Failure origin.
        kind: ErrorKind,
        /// Human-readable message.
        message: String,
    },
    /// Analysis succeeded.
    Results(AnalysisResult),
}

impl UiState {
    /// Returns `true` while a request is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Error message, when in the error state.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Error origin, when in the error state.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Analysis result, when in the results state.
    pub fn results(&self) -> Option<&AnalysisResult> {
        match self {
            Self::Results(result) => Some(result),
            _ => None,
        }
    }

    /// Short status line for compact renderers.
    pub fn status_line(&self) -> String {
        match self {
            Self::Idle => "Ready".to_string(),
            Self::AwaitingInput(SourceKind::Upload) => "Choose an image to upload".to_string(),
            Self::AwaitingInput(SourceKind::Camera) => "Camera ready".to_string(),
            Self::Loading => "Analyzing image...".to_string(),
            Self::Error { message, .. } => message.clone(),
            Self::Results(result) => format!(
                "{} recommendation(s) for {} / {}",
                result.clothing.len(),
                result.gender,
                result.skin_tone
            ),
        }
    }

    /// Derives the enabled input affordances for this state.
    pub fn affordances(&self) -> InputAffordances {
        if self.is_loading() {
            return InputAffordances::locked();
        }

        InputAffordances {
            upload: true,
            start_camera: true,
            capture: true,
            download: true,
            clear: matches!(self, Self::Results(_) | Self::Error { .. }),
        }
    }
}

/// Input controls presentation may enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputAffordances {
    /// Pick a file.
    pub upload: bool,
    /// Start the camera.
    pub start_camera: bool,
    /// Capture, retake, or submit a camera still.
    pub capture: bool,
    /// Download the most recent styles export.
    pub download: bool,
    /// Clear results or error.
    pub clear: bool,
}

impl InputAffordances {
    /// Everything disabled.
    pub fn locked() -> Self {
        Self {
            upload: false,
            start_camera: false,
            capture: false,
            download: false,
            clear: false,
        }
    }
}

/// Severity of a session notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// User action was rejected.
    Warning,
}

/// Transient message raised by an input session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Human-readable message.
    pub message: String,
}

impl Notice {
    /// Creates a warning notice.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    /// Creates an informational notice.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }
}
