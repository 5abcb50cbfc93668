#![warn(missing_docs)]
//! # fashion-lens-analysis-contract
//!
//! ## Purpose
//! Defines the `/detect_face` response schema and its mapping into the
//! display-safe [`AnalysisResult`].
//!
//! ## Responsibilities
//! - Parse raw response payloads, tolerating absent optional fields.
//! - Detect the embedded application-level `error` field.
//! - Replace missing values with the `"Unknown"` / `"N/A"` placeholders.
//!
//! ## Data flow
//! Raw JSON -> [`parse_detect_response`] -> [`DetectFaceResponse`] ->
//! [`map_analysis_result`] -> [`AnalysisResult`] held by the UI state.
//!
//! ## Ownership and lifetimes
//! Parsed values are owned structs; nothing borrows from network buffers.
//!
//! ## Error model
//! Invalid JSON and non-object payloads return [`AnalysisContractError`].
//! Missing or malformed optional fields never fail; they degrade to
//! placeholders.

use fashion_lens_core::StillImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Placeholder for missing gender or skin tone.
pub const UNKNOWN: &str = "Unknown";

/// Placeholder for missing clothing item fields.
pub const NOT_AVAILABLE: &str = "N/A";

/// MIME type of the detected-face crop returned by the service.
pub const DETECTED_FACE_MIME: &str = "image/jpeg";

/// Raw `/detect_face` response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectFaceResponse {
    /// Inferred gender label.
    #[serde(default)]
    pub gender: Option<String>,
    /// Inferred skin tone label.
    #[serde(default)]
    pub skin_tone: Option<String>,
    /// Base64 face crop without a data-URI prefix.
    #[serde(default)]
    pub detected_face_image: Option<String>,
    /// Recommended items, in service order.
    #[serde(default)]
    pub clothing_styles: Option<Vec<RawClothingStyle>>,
    /// Application-level failure reported despite HTTP success.
    #[serde(default)]
    pub error: Option<String>,
}

impl DetectFaceResponse {
    /// Returns the embedded error message when it is present and non-blank.
    pub fn embedded_error(&self) -> Option<&str> {
        non_blank(self.error.as_deref())
    }
}

/// One raw clothing recommendation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawClothingStyle {
    /// Item name.
    #[serde(default)]
    pub item: Option<String>,
    /// Fabric.
    #[serde(default)]
    pub fabric: Option<String>,
    /// Color.
    #[serde(default)]
    pub color: Option<String>,
    /// Style or traditional aspect.
    #[serde(default)]
    pub traditional_aspect: Option<String>,
    /// Illustration URL.
    #[serde(default, rename = "img-url")]
    pub img_url: Option<String>,
}

/// Display-safe analysis result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    /// Decoded face crop, when the service returned a valid one.
    pub detected_face: Option<StillImage>,
    /// Gender label or [`UNKNOWN`].
    pub gender: String,
    /// Skin tone label or [`UNKNOWN`].
    pub skin_tone: String,
    /// Recommended items in service order.
    pub clothing: Vec<ClothingItem>,
}

impl AnalysisResult {
    /// Returns `true` when at least one item was recommended.
    pub fn has_recommendations(&self) -> bool {
        !self.clothing.is_empty()
    }
}

/// Display-safe clothing recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClothingItem {
    /// Item name or [`NOT_AVAILABLE`].
    pub item: String,
    /// Fabric or [`NOT_AVAILABLE`].
    pub fabric: String,
    /// Color or [`NOT_AVAILABLE`].
    pub color: String,
    /// Traditional aspect or [`NOT_AVAILABLE`].
    pub traditional_aspect: String,
    /// Illustration URL, if any.
    pub image_url: Option<String>,
}

/// Parses a raw `/detect_face` body.
///
/// # Errors
/// Returns [`AnalysisContractError::Decode`] for invalid JSON and
/// [`AnalysisContractError::InvalidContract`] when the body is not an object.
pub fn parse_detect_response(raw: &str) -> Result<DetectFaceResponse, AnalysisContractError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if !value.is_object() {
        return Err(AnalysisContractError::InvalidContract(
            "response body is not a JSON object".to_string(),
        ));
    }

    Ok(serde_json::from_value(value)?)
}

/// Extracts a non-blank `error` string from an arbitrary JSON body.
///
/// Used for non-success HTTP responses, whose body may still carry the
/// service's own message.
pub fn extract_error_message(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    non_blank(value.get("error")?.as_str()).map(str::to_string)
}

/// Maps a raw response into the display-safe result, applying placeholders.
pub fn map_analysis_result(response: &DetectFaceResponse) -> AnalysisResult {
    let detected_face = non_blank(response.detected_face_image.as_deref()).and_then(|encoded| {
        StillImage::from_base64(encoded, DETECTED_FACE_MIME)
            .inspect_err(|error| debug!(error = %error, "ignoring undecodable face crop"))
            .ok()
    });

    let clothing = response
        .clothing_styles
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(map_clothing_item)
        .collect();

    AnalysisResult {
        detected_face,
        gender: or_placeholder(response.gender.as_deref(), UNKNOWN),
        skin_tone: or_placeholder(response.skin_tone.as_deref(), UNKNOWN),
        clothing,
    }
}

fn map_clothing_item(style: &RawClothingStyle) -> ClothingItem {
    ClothingItem {
        item: or_placeholder(style.item.as_deref(), NOT_AVAILABLE),
        fabric: or_placeholder(style.fabric.as_deref(), NOT_AVAILABLE),
        color: or_placeholder(style.color.as_deref(), NOT_AVAILABLE),
        traditional_aspect: or_placeholder(style.traditional_aspect.as_deref(), NOT_AVAILABLE),
        image_url: non_blank(style.img_url.as_deref()).map(str::to_string),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn or_placeholder(value: Option<&str>, placeholder: &str) -> String {
    non_blank(value).unwrap_or(placeholder).to_string()
}

/// Analysis contract errors.
#[derive(Debug, Error)]
pub enum AnalysisContractError {
    /// JSON decode failure.
    #[error("analysis decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// Payload is structurally not a response object.
    #[error("analysis contract violation: {0}")]
    InvalidContract(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for response parsing and placeholder mapping.

    use super::*;

    #[test]
    fn missing_fields_degrade_to_placeholders() {
        let response = parse_detect_response(
            r#"{"clothing_styles":[{"item":"Saree","fabric":"Silk","color":"Red"}]}"#,
        )
        .expect("response should parse");

        let result = map_analysis_result(&response);
        assert_eq!(result.gender, UNKNOWN);
        assert_eq!(result.skin_tone, UNKNOWN);
        assert_eq!(result.clothing[0].traditional_aspect, NOT_AVAILABLE);
        assert_eq!(result.clothing[0].image_url, None);
        assert!(result.detected_face.is_none());
    }

    #[test]
    fn blank_error_is_not_an_embedded_error() {
        let response = parse_detect_response(r#"{"error":"  ","gender":"male"}"#).unwrap();
        assert_eq!(response.embedded_error(), None);
    }

    #[test]
    fn null_styles_map_to_empty_list() {
        let response =
            parse_detect_response(r#"{"gender":"male","clothing_styles":null}"#).unwrap();
        assert!(!map_analysis_result(&response).has_recommendations());
    }

    #[test]
    fn rejects_non_object_bodies() {
        assert!(matches!(
            parse_detect_response("[1,2]"),
            Err(AnalysisContractError::InvalidContract(_))
        ));
        assert!(matches!(
            parse_detect_response("<html>"),
            Err(AnalysisContractError::Decode(_))
        ));
    }

    #[test]
    fn undecodable_face_crop_is_dropped() {
        let response = DetectFaceResponse {
            detected_face_image: Some("%%%".to_string()),
            ..Default::default()
        };
        assert!(map_analysis_result(&response).detected_face.is_none());
    }
}
