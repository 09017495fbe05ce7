use cadbridge_viewer::service::{mapping_file_name, mapping_json, parse_classification, parse_convert, Artifact};
use serde_json::json;

#[test]
fn mapping_file_is_named_after_the_job() {
    assert_eq!(
        mapping_file_name("5b0c1d2e-0000-4000-8000-000000000000"),
        "5b0c1d2e-0000-4000-8000-000000000000_manual_mapping.json"
    );
}

#[test]
fn mapping_is_pretty_printed_with_two_spaces() {
    let mapping = json!({ "regions": [{ "region_id": 0, "surface_type": "Planar (XY)" }], "summary": null });
    let text = mapping_json(&mapping).unwrap();
    let expected = "{\n  \"regions\": [\n    {\n      \"region_id\": 0,\n      \"surface_type\": \"Planar (XY)\"\n    }\n  ],\n  \"summary\": null\n}";
    assert_eq!(text, expected);
}

#[test]
fn saved_mapping_is_what_the_service_sent() {
    let body = r#"{"success":true,"mapping":{"summary":{"total_regions":0,"planar_surfaces":0,"freeform_surfaces":0,"ai_description":null,"ai_enabled":false},"regions":[],"extra":{"kept":true}}}"#;
    let c = parse_classification(200, body).unwrap();
    assert!(c.mapping.regions.is_empty());
    let saved: serde_json::Value = serde_json::from_str(&mapping_json(&c.raw).unwrap()).unwrap();
    assert_eq!(saved["extra"]["kept"], json!(true));
    let text = mapping_json(&c.raw).unwrap();
    assert!(text.find("\"summary\"") < text.find("\"regions\""));
}

#[test]
fn convert_lists_downloadable_artifacts() {
    let r = parse_convert(
        200,
        r#"{"success":true,"step_file":"j_output.step","mapping_file":"j_mapping.json","report_file":"j_report.json","statistics":{"faces":6}}"#,
    )
    .unwrap();
    assert_eq!(r.file(Artifact::Step), Some("j_output.step"));
    assert_eq!(r.file(Artifact::Mapping), Some("j_mapping.json"));
    assert_eq!(r.file(Artifact::Report), Some("j_report.json"));
}
