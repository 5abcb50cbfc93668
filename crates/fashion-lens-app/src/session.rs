//! Image source sessions: the mutually exclusive upload and camera inputs.
//!
//! [`ImageSourceSession`] tracks which [`InputMode`] is live and owns the
//! selected [`StillImage`]. Switching modes tears the previous variant down;
//! leaving camera mode always stops the stream.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fashion_lens_capture::{CaptureError, MediaCaptureController, StreamConstraints, StreamHandle};
use fashion_lens_core::{
    CandidateInfo, CoreError, MAX_UPLOAD_BYTES, SourceKind, StillImage, ValidationError,
    validate_candidate_with_limit,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Which input variant is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// File upload.
    Upload,
    /// Live camera.
    Camera,
}

impl InputMode {
    /// Source kind reported to the view.
    pub fn source_kind(self) -> SourceKind {
        match self {
            Self::Upload => SourceKind::Upload,
            Self::Camera => SourceKind::Camera,
        }
    }
}

/// Raw file handed over by the host (file picker, drag and drop, CLI path).
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Declared name, size, and MIME type.
    ///
    /// # Errors
    /// Returns an I/O error when the file cannot be inspected.
    async fn describe(&self) -> io::Result<CandidateInfo>;

    /// Reads the complete content.
    ///
    /// # Errors
    /// Returns an I/O error when the file cannot be read.
    async fn read_all(&self) -> io::Result<Vec<u8>>;
}

/// File on the local filesystem; MIME type guessed from the extension.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
}

impl LocalFile {
    /// Wraps `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Wrapped path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FileSource for LocalFile {
    async fn describe(&self) -> io::Result<CandidateInfo> {
        let metadata = tokio::fs::metadata(&self.path).await?;
        let mime_type = mime_guess::from_path(&self.path).first_or_octet_stream();
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(CandidateInfo::new(file_name, metadata.len(), mime_type.essence_str()))
    }

    async fn read_all(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// In-memory file, as delivered by a browser-style picker.
#[derive(Debug, Clone)]
pub struct InMemoryFile {
    info: CandidateInfo,
    bytes: Vec<u8>,
}

impl InMemoryFile {
    /// Creates a file whose declared size equals its content length.
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let info = CandidateInfo::new(file_name, bytes.len() as u64, mime_type);
        Self { info, bytes }
    }

    /// Overrides the declared size, e.g. for a picker that reports metadata
    /// only.
    pub fn with_declared_size(mut self, size_bytes: u64) -> Self {
        self.info.size_bytes = size_bytes;
        self
    }
}

#[async_trait]
impl FileSource for InMemoryFile {
    async fn describe(&self) -> io::Result<CandidateInfo> {
        Ok(self.info.clone())
    }

    async fn read_all(&self) -> io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// Upload variant: validates then materializes files.
#[derive(Debug, Clone)]
pub struct UploadSession {
    max_bytes: u64,
}

impl UploadSession {
    /// Creates a session with the given size ceiling.
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Validates and fully reads `source` into a still.
    ///
    /// Nothing is read when validation fails.
    ///
    /// # Errors
    /// Returns [`UploadError::Validation`] for gate failures,
    /// [`UploadError::Incomplete`] when fewer or more bytes arrive than were
    /// declared, and [`UploadError::Io`] / [`UploadError::Decode`] otherwise.
    pub async fn accept(&self, source: &dyn FileSource) -> Result<StillImage, UploadError> {
        let info = source.describe().await?;
        validate_candidate_with_limit(&info, self.max_bytes).inspect_err(|error| {
            info!(file = %info.file_name, error = %error, "upload rejected by input gate");
        })?;

        let bytes = source.read_all().await?;
        if bytes.len() as u64 != info.size_bytes {
            return Err(UploadError::Incomplete {
                expected: info.size_bytes,
                actual: bytes.len() as u64,
            });
        }

        let still = StillImage::new(bytes, info.mime_type.as_str())?;
        info!(
            file = %info.file_name,
            bytes = still.len(),
            fingerprint = %still.fingerprint(),
            "upload materialized"
        );
        Ok(still)
    }
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new(MAX_UPLOAD_BYTES)
    }
}

/// Camera variant lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraPhase {
    /// No stream.
    Closed,
    /// Waiting on the platform.
    Opening,
    /// Stream live, nothing captured.
    Live(StreamHandle),
    /// Stream live with one captured still awaiting submit or retake.
    Captured {
        /// Live stream.
        handle: StreamHandle,
        /// Captured still.
        image: StillImage,
    },
}

/// Camera variant: drives the capture controller through its phases.
#[derive(Debug, Clone)]
pub struct CameraSession {
    phase: CameraPhase,
    constraints: StreamConstraints,
}

impl CameraSession {
    /// Creates a closed session.
    pub fn new(constraints: StreamConstraints) -> Self {
        Self {
            phase: CameraPhase::Closed,
            constraints,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> &CameraPhase {
        &self.phase
    }

    /// Captured still, if any.
    pub fn captured(&self) -> Option<&StillImage> {
        match &self.phase {
            CameraPhase::Captured { image, .. } => Some(image),
            _ => None,
        }
    }

    fn handle(&self) -> Option<StreamHandle> {
        match &self.phase {
            CameraPhase::Live(handle) | CameraPhase::Captured { handle, .. } => Some(*handle),
            CameraPhase::Closed | CameraPhase::Opening => None,
        }
    }

    /// Opens the camera. An already open stream is released first.
    ///
    /// # Errors
    /// Propagates [`CaptureError`]; the session is `Closed` afterwards.
    pub async fn open(
        &mut self,
        capture: &mut MediaCaptureController,
        cancel: &CancellationToken,
    ) -> Result<StreamHandle, CaptureError> {
        self.close(capture);
        self.phase = CameraPhase::Opening;

        match capture.request_stream(&self.constraints, cancel).await {
            Ok(handle) => {
                self.phase = CameraPhase::Live(handle);
                Ok(handle)
            }
            Err(error) => {
                self.phase = CameraPhase::Closed;
                Err(error)
            }
        }
    }

    /// Captures one still from the live stream.
    ///
    /// # Errors
    /// Returns [`CaptureError::StreamInactive`] unless the session is `Live`,
    /// and propagates controller errors; the session stays `Live`.
    pub fn capture(
        &mut self,
        capture: &mut MediaCaptureController,
    ) -> Result<&StillImage, CaptureError> {
        let CameraPhase::Live(handle) = self.phase else {
            return Err(CaptureError::StreamInactive);
        };

        let image = capture.capture_still_frame(handle)?;
        self.phase = CameraPhase::Captured { handle, image };
        self.captured().ok_or(CaptureError::StreamInactive)
    }

    /// Discards the captured still and returns to `Live`.
    ///
    /// Returns `false` when there was nothing to discard.
    pub fn retake(&mut self) -> bool {
        match &self.phase {
            CameraPhase::Captured { handle, .. } => {
                self.phase = CameraPhase::Live(*handle);
                true
            }
            _ => false,
        }
    }

    /// Hands over the captured still and closes the session.
    pub fn take_capture(&mut self, capture: &mut MediaCaptureController) -> Option<StillImage> {
        let image = self.captured().cloned()?;
        self.close(capture);
        Some(image)
    }

    /// Stops the stream (if any) and returns to `Closed`.
    pub fn close(&mut self, capture: &mut MediaCaptureController) {
        if let Some(handle) = self.handle() {
            capture.stop_stream(handle);
        }
        if self.phase != CameraPhase::Closed {
            debug!("camera session closed");
        }
        self.phase = CameraPhase::Closed;
    }
}

/// Live input variant.
#[derive(Debug, Clone)]
pub enum ActiveSource {
    /// Upload is live.
    Upload(UploadSession),
    /// Camera is live.
    Camera(CameraSession),
}

/// Selector over the two input variants plus the selected still.
#[derive(Debug, Clone)]
pub struct ImageSourceSession {
    active: ActiveSource,
    selected: Option<StillImage>,
    max_upload_bytes: u64,
    constraints: StreamConstraints,
}

impl ImageSourceSession {
    /// Starts in upload mode with nothing selected.
    pub fn new(max_upload_bytes: u64, constraints: StreamConstraints) -> Self {
        Self {
            active: ActiveSource::Upload(UploadSession::new(max_upload_bytes)),
            selected: None,
            max_upload_bytes,
            constraints,
        }
    }

    /// Live mode.
    pub fn mode(&self) -> InputMode {
        match self.active {
            ActiveSource::Upload(_) => InputMode::Upload,
            ActiveSource::Camera(_) => InputMode::Camera,
        }
    }

    /// Selected still (upload preview or submitted capture).
    pub fn selected(&self) -> Option<&StillImage> {
        self.selected.as_ref()
    }

    /// Camera session, when camera mode is live.
    pub fn camera(&self) -> Option<&CameraSession> {
        match &self.active {
            ActiveSource::Camera(camera) => Some(camera),
            ActiveSource::Upload(_) => None,
        }
    }

    /// Camera session, mutably.
    pub fn camera_mut(&mut self) -> Option<&mut CameraSession> {
        match &mut self.active {
            ActiveSource::Camera(camera) => Some(camera),
            ActiveSource::Upload(_) => None,
        }
    }

    /// Switches modes, tearing down the previous variant. The selected still
    /// survives the switch.
    pub fn switch_to(&mut self, mode: InputMode, capture: &mut MediaCaptureController) {
        if self.mode() == mode {
            return;
        }

        if let ActiveSource::Camera(camera) = &mut self.active {
            camera.close(capture);
        }

        self.active = match mode {
            InputMode::Upload => ActiveSource::Upload(UploadSession::new(self.max_upload_bytes)),
            InputMode::Camera => ActiveSource::Camera(CameraSession::new(self.constraints)),
        };
        info!(mode = ?mode, "input mode switched");
    }

    /// Accepts a file in upload mode; the selection is replaced only on
    /// success.
    ///
    /// # Errors
    /// Returns [`UploadError::WrongMode`] outside upload mode and propagates
    /// [`UploadSession::accept`] failures.
    pub async fn select_file(
        &mut self,
        source: &dyn FileSource,
    ) -> Result<&StillImage, UploadError> {
        let ActiveSource::Upload(upload) = &self.active else {
            return Err(UploadError::WrongMode);
        };

        let still = upload.accept(source).await?;
        Ok(self.selected.insert(still))
    }

    /// Moves the captured still into the selection and closes the camera.
    pub fn promote_capture(&mut self, capture: &mut MediaCaptureController) -> Option<&StillImage> {
        let image = self.camera_mut()?.take_capture(capture)?;
        Some(self.selected.insert(image))
    }

    /// Drops the selection.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Stops any stream held by the camera variant.
    pub fn teardown(&mut self, capture: &mut MediaCaptureController) {
        if let Some(camera) = self.camera_mut() {
            camera.close(capture);
        }
    }
}

/// Upload failures. None of them touch the current selection.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Candidate rejected by the input gate.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Reading the file failed.
    #[error("file read failure: {0}")]
    Io(#[from] io::Error),
    /// Content length differs from the declared size.
    #[error("incomplete read: expected {expected} bytes, got {actual}")]
    Incomplete {
        /// Declared size.
        expected: u64,
        /// Bytes actually read.
        actual: u64,
    },
    /// Content could not become a still.
    #[error("invalid image content: {0}")]
    Decode(#[from] CoreError),
    /// Upload attempted while camera mode is live.
    #[error("upload is not the active input mode")]
    WrongMode,
}

impl UploadError {
    /// Message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(error) => error.user_message().to_string(),
            Self::WrongMode => "Switch to upload mode to choose a file.".to_string(),
            Self::Io(_) | Self::Incomplete { .. } | Self::Decode(_) => {
                "The selected file could not be read. Please try another image.".to_string()
            }
        }
    }
}
