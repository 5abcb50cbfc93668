#![warn(missing_docs)]
//! # fashion-lens-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `fashion-lens` workspace.
//!
//! ## Responsibilities
//! - Represent fully materialized still images ([`StillImage`]).
//! - Encode/decode still images as data URIs for the remote service contract.
//! - Gate file-sourced candidates through [`validate_candidate`].
//!
//! ## Data flow
//! Upload and camera sessions produce [`StillImage`] values. Upload candidates
//! are described by [`CandidateInfo`] and must pass [`validate_candidate`]
//! before their bytes are read.
//!
//! ## Ownership and lifetimes
//! Image bytes live behind `Arc<[u8]>`: a still is immutable once created and
//! clones are cheap, so sessions and the orchestrator can each hold one
//! without copying pixel data.
//!
//! ## Error model
//! Validation failures return [`ValidationError`]; malformed data URIs and
//! empty payloads return [`CoreError`].
//!
//! ## Privacy notes
//! Image bytes are never rendered into `Debug` output or log helpers; use
//! [`StillImage::fingerprint`] or [`summarize_data_uri`] instead.
//!
//! ## Example
//! ```rust
//! use fashion_lens_core::{CandidateInfo, StillImage, validate_candidate};
//!
//! let info = CandidateInfo::new("face.png", 2_048, "image/png");
//! validate_candidate(&info).expect("small png is accepted");
//!
//! let still = StillImage::new(vec![1, 2, 3], "image/png").unwrap();
//! assert!(still.to_data_uri().starts_with("data:image/png;base64,"));
//! ```

use std::fmt;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Upload size ceiling (5 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// MIME type used for camera stills.
pub const CAMERA_STILL_MIME: &str = "image/jpeg";

/// Origin of a still image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// File picked by the user.
    Upload,
    /// Frame captured from a live camera stream.
    Camera,
}

/// One fully decoded, encoded raster image.
#[derive(Clone, PartialEq, Eq)]
pub struct StillImage {
    bytes: Arc<[u8]>,
    mime_type: String,
}

impl StillImage {
    /// Creates a still image from its encoded bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyImage`] for an empty payload and
    /// [`CoreError::InvalidMimeType`] for a blank MIME type.
    pub fn new(
        bytes: impl Into<Arc<[u8]>>,
        mime_type: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(CoreError::EmptyImage);
        }

        let mime_type = mime_type.into().trim().to_ascii_lowercase();
        if mime_type.is_empty() {
            return Err(CoreError::InvalidMimeType(mime_type));
        }

        Ok(Self { bytes, mime_type })
    }

    /// Decodes a bare base64 payload (no `data:` prefix).
    ///
    /// # Errors
    /// Returns [`CoreError::Base64`] when the payload is not valid base64.
    pub fn from_base64(encoded: &str, mime_type: impl Into<String>) -> Result<Self, CoreError> {
        let bytes = general_purpose::STANDARD.decode(encoded.trim())?;
        Self::new(bytes, mime_type)
    }

    /// Parses a `data:<mime>;base64,<payload>` URI.
    ///
    /// # Errors
    /// Returns [`CoreError::MalformedDataUri`] when the prefix or the base64
    /// marker is missing.
    pub fn from_data_uri(uri: &str) -> Result<Self, CoreError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| CoreError::MalformedDataUri("missing data: prefix".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| CoreError::MalformedDataUri("missing payload separator".to_string()))?;
        let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
            CoreError::MalformedDataUri("only base64 payloads are supported".to_string())
        })?;

        Self::from_base64(payload, mime_type)
    }

    /// Encoded image bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lower-cased MIME type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`; empty stills cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Renders the image as a base64 data URI.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// Returns the first 16 hex chars of the SHA-256 digest of the payload.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.bytes);
        let mut encoded = hex::encode(digest);
        encoded.truncate(16);
        encoded
    }
}

impl fmt::Debug for StillImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StillImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Description of a file-sourced candidate before its content is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateInfo {
    /// File name as reported by the input source.
    pub file_name: String,
    /// Declared size in bytes.
    pub size_bytes: u64,
    /// Declared MIME type.
    pub mime_type: String,
}

impl CandidateInfo {
    /// Creates a candidate description.
    pub fn new(
        file_name: impl Into<String>,
        size_bytes: u64,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            size_bytes,
            mime_type: mime_type.into(),
        }
    }
}

/// Validates a file candidate against the fixed 5 MiB ceiling.
///
/// # Errors
/// See [`validate_candidate_with_limit`].
pub fn validate_candidate(candidate: &CandidateInfo) -> Result<(), ValidationError> {
    validate_candidate_with_limit(candidate, MAX_UPLOAD_BYTES)
}

/// Validates a file candidate against a caller-provided size ceiling.
///
/// The size check runs first, so an oversized non-image reports
/// [`ValidationError::TooLarge`].
///
/// # Errors
/// Returns [`ValidationError::TooLarge`] when `size_bytes > max_bytes` and
/// [`ValidationError::NotAnImage`] when the MIME type is not `image/*`.
pub fn validate_candidate_with_limit(
    candidate: &CandidateInfo,
    max_bytes: u64,
) -> Result<(), ValidationError> {
    if candidate.size_bytes > max_bytes {
        return Err(ValidationError::TooLarge {
            size_bytes: candidate.size_bytes,
            max_bytes,
        });
    }

    if !is_image_mime(&candidate.mime_type) {
        return Err(ValidationError::NotAnImage(candidate.mime_type.clone()));
    }

    Ok(())
}

/// Returns `true` when `mime_type` declares an image type.
pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type
        .trim()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

/// Summarizes a data URI for logs: MIME type and decoded-size estimate only.
pub fn summarize_data_uri(uri: &str) -> String {
    let Some(rest) = uri.strip_prefix("data:") else {
        return format!("<non-data-uri {} chars>", uri.len());
    };

    match rest.split_once(',') {
        Some((header, payload)) => {
            let mime = header.strip_suffix(";base64").unwrap_or(header);
            let approx_bytes = payload.len() / 4 * 3;
            format!("data:{mime};base64,<~{approx_bytes} bytes>")
        }
        None => "data:<malformed>".to_string(),
    }
}

/// Candidate rejected by the input gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Candidate exceeds the size ceiling.
    #[error("file size {size_bytes} exceeds limit of {max_bytes} bytes")]
    TooLarge {
        /// Declared candidate size.
        size_bytes: u64,
        /// Ceiling in force.
        max_bytes: u64,
    },
    /// Candidate does not declare an image MIME type.
    #[error("not an image: {0:?}")]
    NotAnImage(String),
}

impl ValidationError {
    /// Message shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::TooLarge { .. } => "File size exceeds 5MB. Please upload a smaller image.",
            Self::NotAnImage(_) => "Please upload a valid image file.",
        }
    }
}

/// Error type for core model and codec failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Still images cannot be empty.
    #[error("image payload is empty")]
    EmptyImage,
    /// MIME type is blank.
    #[error("invalid mime type: {0:?}")]
    InvalidMimeType(String),
    /// Data URI does not follow `data:<mime>;base64,<payload>`.
    #[error("malformed data uri: {0}")]
    MalformedDataUri(String),
    /// Base64 payload failed to decode.
    #[error("base64 decode failure: {0}")]
    Base64(#[from] base64::DecodeError),
}
