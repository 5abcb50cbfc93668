#![warn(missing_docs)]
//! # fashion-lens-capture
//!
//! ## Purpose
//! Owns the live camera stream and turns its current frame into a
//! [`StillImage`].
//!
//! ## Responsibilities
//! - Define backend-agnostic camera platform and render surface traits.
//! - Enforce the single-stream discipline in [`MediaCaptureController`].
//! - Rasterize frames into JPEG stills at native resolution.
//! - Expose a deterministic synthetic platform for CI and unit tests.
//!
//! ## Data flow
//! Session asks the controller for a stream -> platform acquires it ->
//! controller attaches it to the injected [`RenderSurface`] -> capture reads
//! the current [`CameraFrame`] -> JPEG [`StillImage`].
//!
//! ## Ownership and lifetimes
//! The controller is the only owner of the platform stream. Callers hold a
//! copyable [`StreamHandle`] token; stale tokens are harmless.
//!
//! ## Error model
//! Platform failures, surface failures, and warm-up races are reported as
//! [`CaptureError`] values; none of them leaves a stream running.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use fashion_lens_core::{CAMERA_STILL_MIME, StillImage};
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default JPEG quality for camera stills (0.95 on a 0..1 scale).
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Which camera the platform should prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Front-facing camera.
    User,
    /// Rear camera.
    Environment,
}

/// Acquisition hints forwarded to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    /// Preferred camera.
    pub facing: FacingMode,
    /// Ideal frame width in pixels.
    pub ideal_width: u32,
    /// Ideal frame height in pixels.
    pub ideal_height: u32,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::User,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

/// Token identifying one acquired stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(u64);

impl StreamHandle {
    /// Numeric id, unique per controller.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Lifecycle flag of the controller's capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// No stream was ever requested.
    Inactive,
    /// Waiting on the platform.
    Requesting,
    /// A stream is attached and live.
    Active,
    /// The last stream was released or acquisition failed.
    Stopped,
}

/// Current frame of a live stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFrame {
    /// Frame width; zero while the stream warms up.
    pub width: u32,
    /// Frame height; zero while the stream warms up.
    pub height: u32,
    /// RGBA pixels (`width * height * 4` bytes).
    pub rgba: Vec<u8>,
}

impl CameraFrame {
    /// Frame with zero dimensions, reported before the first real frame.
    pub fn warming_up() -> Self {
        Self {
            width: 0,
            height: 0,
            rgba: Vec::new(),
        }
    }
}

/// Failure reported by a camera platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// User or OS refused access.
    #[error("not allowed: {0}")]
    NotAllowed(String),
    /// No matching device.
    #[error("not found: {0}")]
    NotFound(String),
    /// Any other acquisition or read failure.
    #[error("{0}")]
    Other(String),
}

/// Render surface failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("render surface failure: {0}")]
pub struct SurfaceError(pub String);

/// Camera access provided by the host platform.
#[async_trait]
pub trait CameraPlatform: Send + Sync {
    /// Acquires a new stream honoring `constraints` where possible.
    ///
    /// # Errors
    /// Returns a [`PlatformError`] describing why access failed.
    async fn acquire(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, PlatformError>;
}

/// One acquired hardware stream.
pub trait CameraStream: Send {
    /// Device label for diagnostics.
    fn label(&self) -> &str;

    /// Number of tracks still running.
    fn live_tracks(&self) -> usize;

    /// Reads the current frame.
    ///
    /// # Errors
    /// Returns [`PlatformError::Other`] when the device stopped delivering.
    fn current_frame(&mut self) -> Result<CameraFrame, PlatformError>;

    /// Stops every track. Must tolerate repeated calls.
    fn stop_tracks(&mut self);
}

/// Surface that displays the live stream.
pub trait RenderSurface: Send {
    /// Binds a stream to the surface.
    ///
    /// # Errors
    /// Returns [`SurfaceError`] when the surface is not available.
    fn attach(&mut self, handle: StreamHandle, label: &str) -> Result<(), SurfaceError>;

    /// Unbinds the stream. Unknown handles are ignored.
    fn detach(&mut self, handle: StreamHandle);
}

/// Surface for headless runs: records the bound handle and renders nothing.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    attached: Option<StreamHandle>,
}

impl HeadlessSurface {
    /// Creates an unbound surface.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderSurface for HeadlessSurface {
    fn attach(&mut self, handle: StreamHandle, label: &str) -> Result<(), SurfaceError> {
        debug!(stream = handle.id(), label, "headless surface bound");
        self.attached = Some(handle);
        Ok(())
    }

    fn detach(&mut self, handle: StreamHandle) {
        if self.attached == Some(handle) {
            self.attached = None;
        }
    }
}

struct ActiveStream {
    handle: StreamHandle,
    stream: Box<dyn CameraStream>,
}

/// Exclusive owner of the camera stream.
///
/// At most one stream is held at a time. Dropping the controller stops any
/// stream it still holds.
pub struct MediaCaptureController {
    platform: Arc<dyn CameraPlatform>,
    surface: Box<dyn RenderSurface>,
    active: Option<ActiveStream>,
    state: CaptureState,
    last_error: Option<CaptureError>,
    next_handle: u64,
    jpeg_quality: u8,
}

impl MediaCaptureController {
    /// Creates an idle controller bound to `platform` and `surface`.
    pub fn new(platform: Arc<dyn CameraPlatform>, surface: Box<dyn RenderSurface>) -> Self {
        Self {
            platform,
            surface,
            active: None,
            state: CaptureState::Inactive,
            last_error: None,
            next_handle: 1,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Overrides JPEG quality, clamped to `1..=100`.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Current lifecycle flag.
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Error from the most recent failed acquisition, if any.
    pub fn last_error(&self) -> Option<&CaptureError> {
        self.last_error.as_ref()
    }

    /// Handle of the live stream, if any.
    pub fn active_handle(&self) -> Option<StreamHandle> {
        self.active.as_ref().map(|active| active.handle)
    }

    /// Acquires a stream and attaches it to the render surface.
    ///
    /// A stream that is already live is stopped first. When `cancel` fires
    /// while the platform is still acquiring, the new stream is stopped as
    /// soon as it arrives and [`CaptureError::Cancelled`] is returned.
    ///
    /// # Errors
    /// Returns [`CaptureError::PermissionDenied`], [`CaptureError::DeviceNotFound`]
    /// or [`CaptureError::DeviceError`] for platform and surface failures.
    pub async fn request_stream(
        &mut self,
        constraints: &StreamConstraints,
        cancel: &CancellationToken,
    ) -> Result<StreamHandle, CaptureError> {
        if let Some(previous) = self.active_handle() {
            info!(stream = previous.id(), "stopping live stream before reacquiring");
            self.stop_stream(previous);
        }

        self.state = CaptureState::Requesting;
        self.last_error = None;
        info!(
            facing = ?constraints.facing,
            ideal_width = constraints.ideal_width,
            ideal_height = constraints.ideal_height,
            "requesting camera stream"
        );

        let acquired = self.platform.acquire(constraints).await;
        let mut stream = match acquired {
            Ok(stream) => stream,
            Err(error) => return Err(self.fail(CaptureError::from(error))),
        };

        if cancel.is_cancelled() {
            warn!(label = stream.label(), "camera opening abandoned; releasing acquired stream");
            stream.stop_tracks();
            self.state = CaptureState::Stopped;
            return Err(CaptureError::Cancelled);
        }

        let handle = StreamHandle(self.next_handle);
        self.next_handle += 1;

        if let Err(error) = self.surface.attach(handle, stream.label()) {
            stream.stop_tracks();
            return Err(self.fail(CaptureError::DeviceError(error.to_string())));
        }

        info!(
            stream = handle.id(),
            label = stream.label(),
            tracks = stream.live_tracks(),
            "camera stream started"
        );
        self.active = Some(ActiveStream { handle, stream });
        self.state = CaptureState::Active;
        Ok(handle)
    }

    /// Releases the stream behind `handle`.
    ///
    /// Stale handles and repeated calls are no-ops.
    pub fn stop_stream(&mut self, handle: StreamHandle) {
        match self.active.take() {
            Some(mut active) if active.handle == handle => {
                active.stream.stop_tracks();
                self.surface.detach(handle);
                self.state = CaptureState::Stopped;
                info!(stream = handle.id(), "camera stream stopped");
            }
            other => {
                self.active = other;
                debug!(stream = handle.id(), "stop ignored for inactive stream");
            }
        }
    }

    /// Rasterizes the current frame of the live stream into a JPEG still.
    ///
    /// # Errors
    /// Returns [`CaptureError::StreamInactive`] when `handle` is not live,
    /// [`CaptureError::FrameNotReady`] while the stream reports zero
    /// dimensions, and [`CaptureError::DeviceError`] for read or encode
    /// failures.
    pub fn capture_still_frame(
        &mut self,
        handle: StreamHandle,
    ) -> Result<StillImage, CaptureError> {
        let active = self
            .active
            .as_mut()
            .filter(|active| active.handle == handle)
            .ok_or(CaptureError::StreamInactive)?;

        let frame = active.stream.current_frame()?;
        if frame.width == 0 || frame.height == 0 {
            debug!(stream = handle.id(), "capture attempted before first frame");
            return Err(CaptureError::FrameNotReady);
        }

        let still = encode_jpeg(&frame, self.jpeg_quality)?;
        info!(
            stream = handle.id(),
            width = frame.width,
            height = frame.height,
            bytes = still.len(),
            "still frame captured"
        );
        Ok(still)
    }

    fn fail(&mut self, error: CaptureError) -> CaptureError {
        warn!(error = %error, "camera acquisition failed");
        self.state = CaptureState::Stopped;
        self.last_error = Some(error.clone());
        error
    }
}

impl Drop for MediaCaptureController {
    fn drop(&mut self) {
        if let Some(handle) = self.active_handle() {
            self.stop_stream(handle);
        }
    }
}

/// Encodes an RGBA frame as JPEG at `quality`.
///
/// # Errors
/// Returns [`CaptureError::DeviceError`] when the buffer does not match the
/// declared geometry or the encoder fails.
pub fn encode_jpeg(frame: &CameraFrame, quality: u8) -> Result<StillImage, CaptureError> {
    let expected = (frame.width as usize)
        .checked_mul(frame.height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| CaptureError::DeviceError("frame dimensions overflow".to_string()))?;
    if frame.rgba.len() != expected {
        return Err(CaptureError::DeviceError(format!(
            "frame buffer holds {} bytes, expected {expected}",
            frame.rgba.len()
        )));
    }

    // JPEG has no alpha channel.
    let rgb: Vec<u8> = frame
        .rgba
        .chunks_exact(4)
        .flat_map(|pixel| [pixel[0], pixel[1], pixel[2]])
        .collect();

    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, quality)
        .encode(&rgb, frame.width, frame.height, ExtendedColorType::Rgb8)
        .map_err(|error| CaptureError::DeviceError(format!("jpeg encode failed: {error}")))?;

    StillImage::new(encoded, CAMERA_STILL_MIME)
        .map_err(|error| CaptureError::DeviceError(error.to_string()))
}

/// Scripted result of the next synthetic acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntheticOutcome {
    /// Grant access.
    Grant,
    /// Refuse access.
    Deny,
    /// Report no device.
    NoDevice,
    /// Fail with the given detail.
    Fail(String),
}

/// Deterministic camera platform for tests, CI, and headless demos.
#[derive(Debug)]
pub struct SyntheticCameraPlatform {
    outcome: Mutex<SyntheticOutcome>,
    width: u32,
    height: u32,
    warmup_frames: u32,
    live_streams: Arc<AtomicUsize>,
    acquisitions: AtomicUsize,
}

impl SyntheticCameraPlatform {
    /// Creates a granting 8x6 platform whose first frame is immediately ready.
    pub fn new() -> Self {
        Self::with_geometry(8, 6)
    }

    /// Creates a granting platform with custom frame geometry.
    pub fn with_geometry(width: u32, height: u32) -> Self {
        Self {
            outcome: Mutex::new(SyntheticOutcome::Grant),
            width,
            height,
            warmup_frames: 0,
            live_streams: Arc::new(AtomicUsize::new(0)),
            acquisitions: AtomicUsize::new(0),
        }
    }

    /// Number of zero-dimension frames each new stream reports first.
    pub fn with_warmup_frames(mut self, frames: u32) -> Self {
        self.warmup_frames = frames;
        self
    }

    /// Sets the outcome of subsequent acquisitions.
    pub fn set_outcome(&self, outcome: SyntheticOutcome) {
        if let Ok(mut current) = self.outcome.lock() {
            *current = outcome;
        }
    }

    /// Streams acquired and not yet stopped.
    pub fn live_streams(&self) -> usize {
        self.live_streams.load(Ordering::SeqCst)
    }

    /// Successful acquisitions so far.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

impl Default for SyntheticCameraPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CameraPlatform for SyntheticCameraPlatform {
    async fn acquire(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, PlatformError> {
        let outcome = self
            .outcome
            .lock()
            .map_err(|_| PlatformError::Other("synthetic outcome lock poisoned".to_string()))?
            .clone();

        match outcome {
            SyntheticOutcome::Grant => {}
            SyntheticOutcome::Deny => {
                return Err(PlatformError::NotAllowed("permission denied".to_string()));
            }
            SyntheticOutcome::NoDevice => {
                return Err(PlatformError::NotFound("requested device not found".to_string()));
            }
            SyntheticOutcome::Fail(detail) => return Err(PlatformError::Other(detail)),
        }

        let sequence = self.acquisitions.fetch_add(1, Ordering::SeqCst) + 1;
        self.live_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticStream {
            label: format!("synthetic-{:?}-{sequence}", constraints.facing).to_lowercase(),
            width: self.width,
            height: self.height,
            warmup_remaining: self.warmup_frames,
            frame_counter: 0,
            live_streams: Arc::clone(&self.live_streams),
            stopped: false,
        }))
    }
}

struct SyntheticStream {
    label: String,
    width: u32,
    height: u32,
    warmup_remaining: u32,
    frame_counter: u64,
    live_streams: Arc<AtomicUsize>,
    stopped: bool,
}

impl CameraStream for SyntheticStream {
    fn label(&self) -> &str {
        &self.label
    }

    fn live_tracks(&self) -> usize {
        usize::from(!self.stopped)
    }

    fn current_frame(&mut self) -> Result<CameraFrame, PlatformError> {
        if self.stopped {
            return Err(PlatformError::Other("stream already stopped".to_string()));
        }
        if self.warmup_remaining > 0 {
            self.warmup_remaining -= 1;
            return Ok(CameraFrame::warming_up());
        }

        self.frame_counter += 1;
        let shade = (self.frame_counter % 255) as u8;
        let mut rgba = Vec::with_capacity((self.width * self.height * 4) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                rgba.extend_from_slice(&[(x * 16) as u8, (y * 16) as u8, shade, 255]);
            }
        }

        Ok(CameraFrame {
            width: self.width,
            height: self.height,
            rgba,
        })
    }

    fn stop_tracks(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.live_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Capture layer error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// User or platform refused camera access.
    #[error("camera permission denied")]
    PermissionDenied,
    /// No camera device is available.
    #[error("no camera device found")]
    DeviceNotFound,
    /// Any other acquisition, read, or encode failure.
    #[error("camera device error: {0}")]
    DeviceError(String),
    /// The stream has not delivered a frame with real dimensions yet.
    #[error("camera frame not ready")]
    FrameNotReady,
    /// The handle does not refer to the live stream.
    #[error("camera stream is not active")]
    StreamInactive,
    /// Opening was abandoned before acquisition completed.
    #[error("camera opening cancelled")]
    Cancelled,
}

impl CaptureError {
    /// Message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied => {
                "Camera access denied. Please allow camera access in your system settings."
                    .to_string()
            }
            Self::DeviceNotFound => "No camera device found. Please connect a camera.".to_string(),
            Self::DeviceError(detail) => format!("Error accessing camera: {detail}"),
            Self::FrameNotReady => "Please wait for video to load".to_string(),
            Self::StreamInactive => "Camera is not running. Please start the camera.".to_string(),
            Self::Cancelled => "Camera start was cancelled.".to_string(),
        }
    }
}

impl From<PlatformError> for CaptureError {
    fn from(error: PlatformError) -> Self {
        match error {
            PlatformError::NotAllowed(_) => Self::PermissionDenied,
            PlatformError::NotFound(_) => Self::DeviceNotFound,
            PlatformError::Other(detail) => Self::DeviceError(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for stream ownership and frame encoding.

    use super::*;

    fn controller(platform: &Arc<SyntheticCameraPlatform>) -> MediaCaptureController {
        let platform: Arc<dyn CameraPlatform> = platform.clone();
        MediaCaptureController::new(platform, Box::new(HeadlessSurface::new()))
    }

    #[tokio::test]
    async fn reacquiring_stops_previous_stream() {
        let platform = Arc::new(SyntheticCameraPlatform::new());
        let mut capture = controller(&platform);
        let token = CancellationToken::new();

        let first = capture
            .request_stream(&StreamConstraints::default(), &token)
            .await
            .expect("first stream");
        let second = capture
            .request_stream(&StreamConstraints::default(), &token)
            .await
            .expect("second stream");

        assert_ne!(first, second);
        assert_eq!(platform.live_streams(), 1);
        assert_eq!(capture.active_handle(), Some(second));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let platform = Arc::new(SyntheticCameraPlatform::new());
        let mut capture = controller(&platform);
        let handle = capture
            .request_stream(&StreamConstraints::default(), &CancellationToken::new())
            .await
            .expect("stream");

        capture.stop_stream(handle);
        capture.stop_stream(handle);
        assert_eq!(platform.live_streams(), 0);
        assert_eq!(capture.state(), CaptureState::Stopped);
    }

    #[tokio::test]
    async fn warming_stream_reports_frame_not_ready() {
        let platform = Arc::new(SyntheticCameraPlatform::new().with_warmup_frames(1));
        let mut capture = controller(&platform);
        let handle = capture
            .request_stream(&StreamConstraints::default(), &CancellationToken::new())
            .await
            .expect("stream");

        assert_eq!(capture.capture_still_frame(handle), Err(CaptureError::FrameNotReady));
        let still = capture.capture_still_frame(handle).expect("second frame is ready");
        assert_eq!(still.mime_type(), "image/jpeg");
        assert_eq!(&still.bytes()[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn rejects_mismatched_frame_buffer() {
        let frame = CameraFrame {
            width: 2,
            height: 2,
            rgba: vec![0; 3],
        };
        assert!(matches!(
            encode_jpeg(&frame, DEFAULT_JPEG_QUALITY),
            Err(CaptureError::DeviceError(_))
        ));
    }

    #[tokio::test]
    async fn dropping_controller_releases_stream() {
        let platform = Arc::new(SyntheticCameraPlatform::new());
        {
            let mut capture = controller(&platform);
            capture
                .request_stream(&StreamConstraints::default(), &CancellationToken::new())
                .await
                .expect("stream");
            assert_eq!(platform.live_streams(), 1);
        }
        assert_eq!(platform.live_streams(), 0);
    }
}
