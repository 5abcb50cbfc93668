//! Validates `/detect_face` fixtures against the frozen JSON schema and
//! checks that the parser accepts exactly what the schema accepts.

use fashion_lens_analysis_contract::{NOT_AVAILABLE, map_analysis_result, parse_detect_response};
use jsonschema::JSONSchema;
use serde_json::Value;

const SCHEMA: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../contracts/detect-face-response.schema.json"
);

fn fixture_path(name: &str) -> String {
    format!(
        "{}/../../contracts/fixtures/detect-face-response.{name}.json",
        env!("CARGO_MANIFEST_DIR")
    )
}

fn read(path: &str) -> String {
    std::fs::read_to_string(path).expect("json file should be readable")
}

fn validator() -> JSONSchema {
    let schema: Value = serde_json::from_str(&read(SCHEMA)).expect("schema should be valid json");
    JSONSchema::compile(&schema).expect("schema should compile")
}

fn fixture(name: &str) -> (String, Value) {
    let raw = read(&fixture_path(name));
    let value = serde_json::from_str(&raw).expect("fixture should be valid json");
    (raw, value)
}

#[test]
fn contract_validation_success_fixture_matches_schema() {
    let (raw, value) = fixture("valid");
    assert!(validator().is_valid(&value), "success fixture should validate");

    let result = map_analysis_result(&parse_detect_response(&raw).expect("parser accepts fixture"));
    assert_eq!(result.gender, "female");
    assert!(result.detected_face.is_some());
    assert_eq!(result.clothing.len(), 2);
    assert_eq!(
        result.clothing[0].image_url.as_deref(),
        Some("https://images.example.test/saree.png")
    );
    assert_eq!(result.clothing[1].fabric, NOT_AVAILABLE);
}

#[test]
fn contract_validation_error_fixture_matches_schema() {
    let (raw, value) = fixture("error");
    assert!(validator().is_valid(&value), "error fixture should validate");

    let response = parse_detect_response(&raw).expect("parser accepts fixture");
    assert_eq!(response.embedded_error(), Some("No face detected"));
}

#[test]
fn contract_validation_invalid_fixture_is_rejected_by_both() {
    let (raw, value) = fixture("invalid");
    assert!(!validator().is_valid(&value), "schema should reject string clothing_styles");
    assert!(parse_detect_response(&raw).is_err());
}
