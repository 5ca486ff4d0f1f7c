// Copyright 2026 Oxide Computer Company

//! HTTP entrypoints for the specdiff API

use crate::server::ServerContext;
use dropshot::endpoint;
use dropshot::ApiDescription;
use dropshot::ApiDescriptionRegisterError;
use dropshot::Body;
use dropshot::HttpError;
use dropshot::RawRequest;
use dropshot::RequestContext;
use http::Response;
use std::sync::Arc;

type SpecDiffApiDescription = ApiDescription<Arc<ServerContext>>;

/// Returns a description of the specdiff API.
pub fn api() -> Result<SpecDiffApiDescription, ApiDescriptionRegisterError> {
    let mut api = SpecDiffApiDescription::new();
    api.register(diff_create)?;
    api.register(breaking_changes_create)?;
    Ok(api)
}

/// Compare two API description documents
///
/// The body is a form (`multipart/form-data` or
/// `application/x-www-form-urlencoded`) with the fields `base` and
/// `revision`.  On success, the response is a YAML diff report.
#[endpoint {
    method = POST,
    path = "/diff",
}]
async fn diff_create(
    rqctx: RequestContext<Arc<ServerContext>>,
    raw_request: RawRequest,
) -> Result<Response<Body>, HttpError> {
    let apictx = rqctx.context();
    let response = apictx
        .pipeline
        .run(raw_request.into_inner(), &apictx.diff_config, &rqctx.log)
        .await?;
    Ok(response)
}

/// Report only the breaking changes between two API description documents
///
/// Accepts the same form as `/diff`.
#[endpoint {
    method = POST,
    path = "/breaking-changes",
}]
async fn breaking_changes_create(
    rqctx: RequestContext<Arc<ServerContext>>,
    raw_request: RawRequest,
) -> Result<Response<Body>, HttpError> {
    let apictx = rqctx.context();
    let response = apictx
        .pipeline
        .run(raw_request.into_inner(), &apictx.breaking_config, &rqctx.log)
        .await?;
    Ok(response)
}
