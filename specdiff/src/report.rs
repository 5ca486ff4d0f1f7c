// Copyright 2026 Oxide Computer Company

//! Encoding of diff reports as HTTP responses

use crate::compare::DiffReport;
use crate::error::PipelineError;
use dropshot::Body;
use http::Response;
use http::StatusCode;

/// Media type of an encoded [`DiffReport`].
pub const CONTENT_TYPE_YAML: &str = "application/yaml";

/// Writes `report` to `writer` as YAML.
pub fn encode_report<W: std::io::Write>(
    report: &DiffReport,
    writer: W,
) -> Result<(), serde_yaml::Error> {
    serde_yaml::to_writer(writer, report)
}

/// Builds the 201 response carrying `report`.
///
/// The whole report is encoded before the response is built, so a failure
/// here never leaves a partial body behind a success status.
pub fn report_response(
    report: &DiffReport,
) -> Result<Response<Body>, PipelineError> {
    let mut buffer = Vec::new();
    encode_report(report, &mut buffer).map_err(PipelineError::Encode)?;
    Response::builder()
        .status(StatusCode::CREATED)
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE_YAML)
        .body(Body::from(buffer))
        .map_err(PipelineError::Response)
}
