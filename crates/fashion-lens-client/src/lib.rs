#![warn(missing_docs)]
//! # fashion-lens-client
//!
//! ## Purpose
//! Talks to the remote recommendation service.
//!
//! ## Responsibilities
//! - Define the [`RecommendationService`] seam consumed by the orchestrator.
//! - Validate the configured service endpoint.
//! - Post stills to `/detect_face` as form-encoded data URIs.
//! - Fetch the latest styles export from `/generate_clothing_styles_json`.
//!
//! ## Data flow
//! [`StillImage`] -> data URI -> `POST /detect_face` -> [`DetectFaceResponse`]
//! handed back unchanged, embedded `error` field included.
//!
//! ## Error model
//! Endpoint problems are [`ClientError`]. Request failures are
//! [`AnalysisError`]: a non-success status whose body carries the service's
//! own `error` message becomes [`AnalysisError::Application`]; everything
//! else, including deadline expiry, is [`AnalysisError::Transport`].
//!
//! ## Privacy notes
//! Request payloads are logged only as summaries (MIME type and size).

use std::time::Duration;

use async_trait::async_trait;
use fashion_lens_analysis_contract::{
    DetectFaceResponse, extract_error_message, parse_detect_response,
};
use fashion_lens_core::{StillImage, summarize_data_uri};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Analysis endpoint path.
pub const DETECT_FACE_PATH: &str = "detect_face";

/// Styles export endpoint path.
pub const STYLES_EXPORT_PATH: &str = "generate_clothing_styles_json";

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Form field carrying the image data URI.
pub const IMAGE_FORM_FIELD: &str = "image";

/// Remote recommendation service.
#[async_trait]
pub trait RecommendationService: Send + Sync {
    /// Submits one still for analysis.
    ///
    /// # Errors
    /// Returns [`AnalysisError`] for transport, status, or decode failures.
    async fn detect_face(&self, image: &StillImage) -> Result<DetectFaceResponse, AnalysisError>;

    /// Downloads the most recently generated styles as raw JSON bytes.
    ///
    /// # Errors
    /// Returns [`AnalysisError`] when the export cannot be retrieved.
    async fn download_styles(&self) -> Result<Vec<u8>, AnalysisError>;
}

/// reqwest-backed service client.
#[derive(Debug, Clone)]
pub struct HttpRecommendationClient {
    base_url: Url,
    http: Client,
}

impl HttpRecommendationClient {
    /// Creates a client for `base_url` with a fixed request deadline.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidEndpoint`] for unparsable or non-HTTP
    /// URLs and [`ClientError::Build`] when the HTTP stack fails to build.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = validate_service_endpoint(base_url)?;
        if !is_secure_endpoint(&base_url) {
            warn!(endpoint = %base_url, "service endpoint is neither https nor loopback");
        }

        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, http })
    }

    /// Configured base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `path` below the base URL, keeping any base path prefix.
    pub fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let prefix = self.base_url.path().trim_end_matches('/');
        url.set_path(&format!("{prefix}/{path}"));
        url
    }
}

#[async_trait]
impl RecommendationService for HttpRecommendationClient {
    async fn detect_face(&self, image: &StillImage) -> Result<DetectFaceResponse, AnalysisError> {
        let url = self.endpoint(DETECT_FACE_PATH);
        let data_uri = image.to_data_uri();
        debug!(
            endpoint = %url,
            image = %summarize_data_uri(&data_uri),
            "posting image for analysis"
        );

        let response = self
            .http
            .post(url)
            .form(&[(IMAGE_FORM_FIELD, data_uri.as_str())])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(match extract_error_message(&body) {
                Some(message) => AnalysisError::Application(message),
                None => AnalysisError::Transport(format!("service responded with {status}")),
            });
        }

        let parsed = parse_detect_response(&body)
            .map_err(|error| AnalysisError::Transport(format!("unreadable response: {error}")))?;
        info!(
            status = status.as_u16(),
            styles = parsed.clothing_styles.as_ref().map_or(0, Vec::len),
            embedded_error = parsed.embedded_error().is_some(),
            "analysis response received"
        );
        Ok(parsed)
    }

    async fn download_styles(&self) -> Result<Vec<u8>, AnalysisError> {
        let url = self.endpoint(STYLES_EXPORT_PATH);
        debug!(endpoint = %url, "downloading styles export");

        let response = self.http.get(url).send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match extract_error_message(&body) {
                Some(message) => AnalysisError::Application(message),
                None => AnalysisError::Transport(format!("service responded with {status}")),
            });
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }
}

/// Validates the service base URL.
///
/// # Errors
/// Returns [`ClientError::InvalidEndpoint`] when the URL does not parse, is
/// not `http`/`https`, or has no host.
pub fn validate_service_endpoint(endpoint: &str) -> Result<Url, ClientError> {
    let parsed = Url::parse(endpoint)
        .map_err(|error| ClientError::InvalidEndpoint(format!("invalid service url: {error}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ClientError::InvalidEndpoint(format!(
            "unsupported scheme {:?}",
            parsed.scheme()
        )));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ClientError::InvalidEndpoint(
            "service url has no host".to_string(),
        ));
    }

    Ok(parsed)
}

/// Returns `true` for HTTPS endpoints and for loopback hosts.
pub fn is_secure_endpoint(url: &Url) -> bool {
    if url.scheme() == "https" {
        return true;
    }

    match url.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(address)) => address.is_loopback(),
        Some(url::Host::Ipv6(address)) => address.is_loopback(),
        None => false,
    }
}

fn transport_error(error: reqwest::Error) -> AnalysisError {
    if error.is_timeout() {
        AnalysisError::Transport("request deadline exceeded".to_string())
    } else {
        AnalysisError::Transport(error.to_string())
    }
}

/// Failure of one remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// Message reported by the service itself.
    #[error("service error: {0}")]
    Application(String),
    /// Network, HTTP status, deadline, or decode failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Client construction errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Endpoint violates URL requirements.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// HTTP client could not be built.
    #[error("http client build failure: {0}")]
    Build(#[from] reqwest::Error),
}
