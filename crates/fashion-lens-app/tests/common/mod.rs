//! Shared fixtures for app integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fashion_lens_analysis_contract::{DetectFaceResponse, parse_detect_response};
use fashion_lens_app::FashionLens;
use fashion_lens_app::session::ImageSourceSession;
use fashion_lens_capture::{
    CameraPlatform, CameraStream, HeadlessSurface, MediaCaptureController, PlatformError,
    StreamConstraints, SyntheticCameraPlatform,
};
use fashion_lens_client::{AnalysisError, RecommendationService};
use fashion_lens_core::{MAX_UPLOAD_BYTES, StillImage};
use tokio_util::sync::CancellationToken;

/// Service double that replays scripted outcomes in order.
///
/// Clones share one script, so a test keeps a handle after moving a clone
/// into the controller.
#[derive(Clone, Default)]
pub struct ScriptedService {
    script: Arc<Script>,
}

#[derive(Default)]
struct Script {
    outcomes: Mutex<VecDeque<Result<DetectFaceResponse, AnalysisError>>>,
    submitted: Mutex<Vec<StillImage>>,
    download: Mutex<Option<Result<Vec<u8>, AnalysisError>>>,
}

#[allow(dead_code)]
impl ScriptedService {
    /// Queues a raw JSON body as the next 200 response.
    pub fn respond_json(&self, raw: &str) {
        let response = parse_detect_response(raw).expect("fixture body should parse");
        self.push(Ok(response));
    }

    /// Queues a transport or application failure.
    pub fn fail(&self, error: AnalysisError) {
        self.push(Err(error));
    }

    /// Sets the outcome of every styles download.
    pub fn set_download(&self, outcome: Result<Vec<u8>, AnalysisError>) {
        *self.script.download.lock().expect("download lock") = Some(outcome);
    }

    /// Images received so far, in order.
    pub fn submitted(&self) -> Vec<StillImage> {
        self.script.submitted.lock().expect("submitted lock").clone()
    }

    fn push(&self, outcome: Result<DetectFaceResponse, AnalysisError>) {
        self.script.outcomes.lock().expect("outcomes lock").push_back(outcome);
    }
}

#[async_trait]
impl RecommendationService for ScriptedService {
    async fn detect_face(&self, image: &StillImage) -> Result<DetectFaceResponse, AnalysisError> {
        self.script.submitted.lock().expect("submitted lock").push(image.clone());
        self.script
            .outcomes
            .lock()
            .expect("outcomes lock")
            .pop_front()
            .unwrap_or_else(|| Err(AnalysisError::Transport("no scripted outcome".to_string())))
    }

    async fn download_styles(&self) -> Result<Vec<u8>, AnalysisError> {
        self.script
            .download
            .lock()
            .expect("download lock")
            .clone()
            .unwrap_or_else(|| Err(AnalysisError::Transport("no scripted download".to_string())))
    }
}

/// Platform that holds every acquisition until `gate` is cancelled.
#[allow(dead_code)]
pub struct GatedPlatform {
    /// Released to let pending acquisitions complete.
    pub gate: CancellationToken,
    /// Platform that produces the streams.
    pub inner: Arc<SyntheticCameraPlatform>,
}

#[async_trait]
impl CameraPlatform for GatedPlatform {
    async fn acquire(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, PlatformError> {
        self.gate.cancelled().await;
        self.inner.acquire(constraints).await
    }
}

/// Controller under test with handles to its doubles.
#[allow(dead_code)]
pub struct Harness {
    /// Controller.
    pub lens: FashionLens<ScriptedService>,
    /// Scripted service shared with the controller.
    pub service: ScriptedService,
    /// Camera platform shared with the controller.
    pub platform: Arc<SyntheticCameraPlatform>,
}

/// Builds a controller over a synthetic camera and a scripted service.
#[allow(dead_code)]
pub fn harness() -> Harness {
    harness_with_platform(Arc::new(SyntheticCameraPlatform::new()))
}

/// Builds a controller over `platform` and a scripted service.
#[allow(dead_code)]
pub fn harness_with_platform(platform: Arc<SyntheticCameraPlatform>) -> Harness {
    let service = ScriptedService::default();
    let camera: Arc<dyn CameraPlatform> = platform.clone();
    let lens = build(service.clone(), camera);
    Harness {
        lens,
        service,
        platform,
    }
}

/// Builds a controller over any camera platform.
#[allow(dead_code)]
pub fn build(
    service: ScriptedService,
    platform: Arc<dyn CameraPlatform>,
) -> FashionLens<ScriptedService> {
    let capture = MediaCaptureController::new(platform, Box::new(HeadlessSurface::new()));
    let sources = ImageSourceSession::new(MAX_UPLOAD_BYTES, StreamConstraints::default());
    FashionLens::new(service, capture, sources)
}

/// Small PNG-tagged still.
#[allow(dead_code)]
pub fn png_still(len: usize) -> StillImage {
    let mut bytes = vec![0x89, b'P', b'N', b'G'];
    bytes.resize(len.max(4), 7);
    StillImage::new(bytes, "image/png").expect("fixture still should be valid")
}

/// Body of a successful analysis with one partially filled item.
#[allow(dead_code)]
pub const SAREE_RESPONSE: &str = r#"{
    "gender": "female",
    "skin_tone": "medium",
    "clothing_styles": [{"item": "Saree", "fabric": "Silk", "color": "Red"}]
}"#;
