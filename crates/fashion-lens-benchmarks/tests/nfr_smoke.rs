//! Benchmark smoke test for the capture -> encode -> contract loop.

use std::time::Instant;

use fashion_lens_analysis_contract::{map_analysis_result, parse_detect_response};
use fashion_lens_capture::{CameraFrame, DEFAULT_JPEG_QUALITY, encode_jpeg};
use fashion_lens_core::{CandidateInfo, StillImage, validate_candidate};

#[test]
fn benchmark_pipeline_smoke_prints_latency() {
    let (width, height) = (640_u32, 480_u32);
    let frame = CameraFrame {
        width,
        height,
        rgba: (0..width * height)
            .flat_map(|pixel| [(pixel % 251) as u8, (pixel % 241) as u8, 90, 255])
            .collect(),
    };

    let start = Instant::now();
    let mut uri_bytes = 0usize;

    for _ in 0..3 {
        let still = encode_jpeg(&frame, DEFAULT_JPEG_QUALITY).expect("frame should encode");
        let candidate = CandidateInfo::new("frame.jpg", still.len() as u64, still.mime_type());
        validate_candidate(&candidate).expect("VGA still fits the upload ceiling");

        let uri = still.to_data_uri();
        uri_bytes += uri.len();
        let round_trip = StillImage::from_data_uri(&uri).expect("data uri should decode");
        assert_eq!(round_trip.fingerprint(), still.fingerprint());

        let payload = uri.split_once(',').map(|(_, payload)| payload).unwrap_or_default();
        let body = format!(
            concat!(
                r#"{{"gender":"female","skin_tone":"medium","#,
                r#""detected_face_image":"{}","clothing_styles":[{{"item":"Saree"}}]}}"#,
            ),
            payload
        );
        let result = map_analysis_result(&parse_detect_response(&body).expect("body should parse"));
        assert!(result.detected_face.is_some());
    }

    let elapsed_ms = start.elapsed().as_millis();
    println!("benchmark_pipeline_elapsed_ms={elapsed_ms}");
    println!("benchmark_data_uri_total_len={uri_bytes}");

    // Guardrail only; real latency budgets depend on the host.
    assert!(
        elapsed_ms < 10_000,
        "pipeline smoke benchmark should stay bounded"
    );
}
