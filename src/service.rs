//! Client for the conversion service: upload, analysis, region detection,
//! classification, STEP conversion and file downloads.
//!
//! Every JSON reply is an envelope with `success` and `error` fields. Parsing
//! is split from transport so the envelope rules hold the same on every
//! target; only the browser build actually talks to the service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ServiceConfig;
use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadResponse {
    pub job_id: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
    pub dimensions: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Analysis {
    pub num_triangles: u64,
    pub num_vertices: u64,
    pub volume: f64,
    pub surface_area: f64,
    #[serde(default)]
    pub center_of_gravity: Option<[f64; 3]>,
    pub bounding_box: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Region {
    pub region_id: u32,
    #[serde(default)]
    pub num_triangles: Option<u64>,
    #[serde(default)]
    pub normal: Option<[f64; 3]>,
    #[serde(default)]
    pub area: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassifiedRegion {
    pub region_id: u32,
    #[serde(default)]
    pub surface_type: Option<String>,
    /// `0..=1`
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub num_triangles: Option<u64>,
    #[serde(default)]
    pub area: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MappingSummary {
    pub total_regions: u32,
    pub planar_surfaces: u32,
    pub freeform_surfaces: u32,
    pub ai_description: Option<String>,
    pub ai_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Mapping {
    pub regions: Vec<ClassifiedRegion>,
    pub summary: Option<MappingSummary>,
}

/// A classification result. `raw` is the mapping exactly as the service sent
/// it, which is what gets saved.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub mapping: Mapping,
    pub raw: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConvertResponse {
    pub step_file: Option<String>,
    pub mapping_file: Option<String>,
    pub report_file: Option<String>,
    pub statistics: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Step,
    Mapping,
    Report,
}

impl ConvertResponse {
    pub fn file(&self, artifact: Artifact) -> Option<&str> {
        match artifact {
            Artifact::Step => self.step_file.as_deref(),
            Artifact::Mapping => self.mapping_file.as_deref(),
            Artifact::Report => self.report_file.as_deref(),
        }
    }
}

// ── Envelope parsing ─────────────────────────────────────────

/// Checks the HTTP status and the `success` flag, returning the decoded body.
fn open_envelope(status: u16, text: &str, fallback: &str) -> Result<Value, ServiceError> {
    let body: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) if !(200..300).contains(&status) => {
            return Err(ServiceError::Status { status, message: fallback.to_string() });
        }
        Err(e) => return Err(e.into()),
    };
    let failed = !(200..300).contains(&status) || body.get("success").and_then(Value::as_bool) == Some(false);
    if failed {
        let message = body.get("error").and_then(Value::as_str).unwrap_or(fallback).to_string();
        return Err(ServiceError::Status { status, message });
    }
    Ok(body)
}

/// The payload under `key`, or the whole body when the service sent it bare.
fn payload(body: Value, key: &str) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    }
}

pub fn parse_upload(status: u16, text: &str) -> Result<UploadResponse, ServiceError> {
    let body = open_envelope(status, text, "Upload failed")?;
    Ok(serde_json::from_value(body)?)
}

pub fn parse_analysis(status: u16, text: &str) -> Result<Analysis, ServiceError> {
    let body = open_envelope(status, text, "Analysis data missing")?;
    match body.get("analysis") {
        Some(a) if !a.is_null() => Ok(serde_json::from_value(a.clone())?),
        _ => Err(ServiceError::Json("Analysis data missing".to_string())),
    }
}

pub fn parse_regions(status: u16, text: &str) -> Result<Vec<Region>, ServiceError> {
    let body = open_envelope(status, text, "Detection failed")?;
    Ok(serde_json::from_value(payload(body, "regions"))?)
}

pub fn parse_classification(status: u16, text: &str) -> Result<Classification, ServiceError> {
    let body = open_envelope(status, text, "Classification failed")?;
    let raw = payload(body, "mapping");
    let mapping = serde_json::from_value(raw.clone())?;
    Ok(Classification { mapping, raw })
}

pub fn parse_convert(status: u16, text: &str) -> Result<ConvertResponse, ServiceError> {
    let body = open_envelope(status, text, "Conversion failed")?;
    Ok(serde_json::from_value(body)?)
}

// ── Mapping export ───────────────────────────────────────────

pub fn mapping_file_name(job_id: &str) -> String {
    format!("{job_id}_manual_mapping.json")
}

/// Pretty JSON with two-space indentation, keys in the order received.
pub fn mapping_json(mapping: &Value) -> Result<String, ServiceError> {
    Ok(serde_json::to_string_pretty(mapping)?)
}

// ── Client ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ServiceClient {
    base_url: String,
    units: String,
    tolerance: f64,
}

impl ServiceClient {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            units: config.units.clone(),
            tolerance: config.tolerance,
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn download_url(&self, filename: &str) -> String {
        self.endpoint(&format!("download/{filename}"))
    }

    pub fn raw_mesh_url(&self, job_id: &str) -> String {
        self.endpoint(&format!("get-stl/{job_id}"))
    }

    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadResponse, ServiceError> {
        let (status, text) =
            transport::post_form(&self.endpoint("upload"), file_name, bytes, &self.units, self.tolerance).await?;
        parse_upload(status, &text)
    }

    pub async fn fetch_analysis(&self, job_id: &str) -> Result<Analysis, ServiceError> {
        let (status, text) = transport::get_text(&self.endpoint(&format!("analyze/{job_id}"))).await?;
        parse_analysis(status, &text)
    }

    pub async fn fetch_regions(&self, job_id: &str) -> Result<Vec<Region>, ServiceError> {
        let (status, text) = transport::get_text(&self.endpoint(&format!("detect/{job_id}"))).await?;
        parse_regions(status, &text)
    }

    pub async fn fetch_classification(&self, job_id: &str) -> Result<Classification, ServiceError> {
        let (status, text) = transport::get_text(&self.endpoint(&format!("classify/{job_id}"))).await?;
        parse_classification(status, &text)
    }

    pub async fn convert(&self, job_id: &str) -> Result<ConvertResponse, ServiceError> {
        let (status, text) = transport::get_text(&self.endpoint(&format!("convert/{job_id}"))).await?;
        parse_convert(status, &text)
    }

    /// The uploaded STL as stored by the service.
    pub async fn fetch_raw_mesh_bytes(&self, job_id: &str) -> Result<Vec<u8>, ServiceError> {
        transport::get_bytes(&self.raw_mesh_url(job_id)).await
    }
}

#[cfg(target_arch = "wasm32")]
mod transport {
    use gloo_net::http::Request;
    use wasm_bindgen::JsValue;
    use web_sys::{Blob, FormData};

    use crate::error::ServiceError;

    fn http_err(e: impl ToString) -> ServiceError {
        ServiceError::Http(e.to_string())
    }

    fn js_err(e: JsValue) -> ServiceError {
        ServiceError::Http(format!("{e:?}"))
    }

    pub async fn get_text(url: &str) -> Result<(u16, String), ServiceError> {
        let resp = Request::get(url).send().await.map_err(http_err)?;
        let status = resp.status();
        let text = resp.text().await.map_err(http_err)?;
        Ok((status, text))
    }

    pub async fn get_bytes(url: &str) -> Result<Vec<u8>, ServiceError> {
        let resp = Request::get(url).send().await.map_err(http_err)?;
        if !resp.ok() {
            return Err(ServiceError::Status { status: resp.status(), message: resp.status_text() });
        }
        resp.binary().await.map_err(http_err)
    }

    pub async fn post_form(
        url: &str,
        file_name: &str,
        bytes: Vec<u8>,
        units: &str,
        tolerance: f64,
    ) -> Result<(u16, String), ServiceError> {
        let array = js_sys::Uint8Array::from(bytes.as_slice());
        let blob = Blob::new_with_u8_array_sequence(&js_sys::Array::of1(&array)).map_err(js_err)?;
        let form = FormData::new().map_err(js_err)?;
        form.append_with_blob_and_filename("file", &blob, file_name).map_err(js_err)?;
        form.append_with_str("units", units).map_err(js_err)?;
        form.append_with_str("tolerance", &tolerance.to_string()).map_err(js_err)?;

        let resp = Request::post(url).body(form).map_err(http_err)?.send().await.map_err(http_err)?;
        let status = resp.status();
        let text = resp.text().await.map_err(http_err)?;
        Ok((status, text))
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod transport {
    use crate::error::ServiceError;

    pub async fn get_text(_url: &str) -> Result<(u16, String), ServiceError> {
        Err(ServiceError::Unsupported)
    }

    pub async fn get_bytes(_url: &str) -> Result<Vec<u8>, ServiceError> {
        Err(ServiceError::Unsupported)
    }

    pub async fn post_form(
        _url: &str,
        _file_name: &str,
        _bytes: Vec<u8>,
        _units: &str,
        _tolerance: f64,
    ) -> Result<(u16, String), ServiceError> {
        Err(ServiceError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_reads_job_id() {
        let r = parse_upload(200, r#"{"success":true,"job_id":"abc","filename":"part.stl"}"#).unwrap();
        assert_eq!(r, UploadResponse { job_id: "abc".into(), filename: "part.stl".into() });
    }

    #[test]
    fn error_envelope_carries_message() {
        let err = parse_upload(400, r#"{"success":false,"error":"Invalid STL file"}"#).unwrap_err();
        assert_eq!(err, ServiceError::Status { status: 400, message: "Invalid STL file".into() });
    }

    #[test]
    fn non_json_failure_uses_fallback_message() {
        let err = parse_convert(502, "<html>bad gateway</html>").unwrap_err();
        assert_eq!(err, ServiceError::Status { status: 502, message: "Conversion failed".into() });
    }

    #[test]
    fn analysis_requires_payload() {
        assert!(matches!(parse_analysis(200, r#"{"success":true}"#), Err(ServiceError::Json(_))));
        let a = parse_analysis(
            200,
            r#"{"success":true,"analysis":{"num_triangles":12,"num_vertices":36,"volume":8.0,
                "surface_area":24.0,"bounding_box":{"min":[-1,-1,-1],"max":[1,1,1],"dimensions":[2,2,2]}}}"#,
        )
        .unwrap();
        assert_eq!(a.num_triangles, 12);
        assert_eq!(a.bounding_box.dimensions, [2.0, 2.0, 2.0]);
    }

    #[test]
    fn regions_accept_bare_array() {
        let r = parse_regions(200, r#"[{"region_id":0,"num_triangles":2}]"#).unwrap();
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].num_triangles, Some(2));
    }

    #[test]
    fn mapping_export_keeps_key_order() {
        let c = parse_classification(
            200,
            r#"{"success":true,"mapping":{"regions":[{"region_id":3,"surface_type":"Freeform","confidence":0.6}],
                "summary":{"total_regions":1,"planar_surfaces":0,"freeform_surfaces":1}}}"#,
        )
        .unwrap();
        assert_eq!(c.mapping.regions[0].surface_type.as_deref(), Some("Freeform"));
        let json = mapping_json(&c.raw).unwrap();
        assert!(json.starts_with("{\n  \"regions\": ["));
        assert!(json.find("\"regions\"") < json.find("\"summary\""));
        assert_eq!(mapping_file_name("abc"), "abc_manual_mapping.json");
    }

    #[test]
    fn endpoints_join_base_url() {
        let client = ServiceClient::new(&ServiceConfig { base_url: "http://host:5000/".into(), ..Default::default() });
        assert_eq!(client.endpoint("upload"), "http://host:5000/upload");
        assert_eq!(client.download_url("x.step"), "http://host:5000/download/x.step");
        let relative = ServiceClient::new(&ServiceConfig::default());
        assert_eq!(relative.raw_mesh_url("j1"), "/get-stl/j1");
    }
}
