// Copyright 2026 Oxide Computer Company

//! Tests for requests that fail, and for the cleanup that follows them.

use crate::common;
use crate::common::PETS_BASE;
use crate::common::PETS_REVISION;
use http::StatusCode;
use openapiv3::OpenAPI;
use specdiff::upload::DocumentRole;
use specdiff::CompareError;
use specdiff::ComparisonConfig;
use specdiff::ComparisonEngine;
use specdiff::DiffReport;
use specdiff::OpenApiLoader;
use specdiff::ServerContext;
use std::sync::Arc;

/// An engine that rejects every pair of documents.
struct FailingEngine;

impl ComparisonEngine for FailingEngine {
    fn compare(
        &self,
        _config: &ComparisonConfig,
        _base: &OpenAPI,
        _revision: &OpenAPI,
    ) -> Result<DiffReport, CompareError> {
        Err(CompareError::DuplicatePath {
            role: DocumentRole::Revision,
            path: String::from("/pets"),
        })
    }
}

#[tokio::test]
async fn test_missing_field() {
    let scratch = common::scratch_dir();
    let testctx = common::test_setup("missing_field", &scratch);

    let request = common::multipart_request(
        &testctx,
        "/diff",
        &[("base", PETS_BASE)],
    );
    let error = testctx
        .client_testctx
        .make_request_with_request(request, StatusCode::BAD_REQUEST)
        .await
        .expect_err("expected failure");
    assert_eq!(error.error_code.as_deref(), Some("MissingField"));
    assert_eq!(error.message, "missing required form field \"revision\"");

    common::assert_no_workspaces(&scratch);
    testctx.teardown().await;
}

#[tokio::test]
async fn test_malformed_form() {
    let scratch = common::scratch_dir();
    let testctx = common::test_setup("malformed_form", &scratch);

    let request = http::Request::builder()
        .method(http::Method::POST)
        .uri(testctx.client_testctx.url("/diff"))
        .header(http::header::CONTENT_TYPE, "multipart/form-data")
        .body(PETS_BASE.into())
        .unwrap();
    let error = testctx
        .client_testctx
        .make_request_with_request(request, StatusCode::BAD_REQUEST)
        .await
        .expect_err("expected failure");
    assert_eq!(error.error_code.as_deref(), Some("MalformedForm"));

    common::assert_no_workspaces(&scratch);
    testctx.teardown().await;
}

#[tokio::test]
async fn test_invalid_document() {
    let scratch = common::scratch_dir();
    let testctx = common::test_setup("invalid_document", &scratch);

    let request = common::multipart_request(
        &testctx,
        "/diff",
        &[("base", "paths: [unclosed"), ("revision", PETS_REVISION)],
    );
    let error = testctx
        .client_testctx
        .make_request_with_request(request, StatusCode::BAD_REQUEST)
        .await
        .expect_err("expected failure");
    assert_eq!(error.error_code.as_deref(), Some("InvalidDocument"));
    assert_eq!(error.message, "base document could not be loaded");

    common::assert_no_workspaces(&scratch);
    testctx.teardown().await;
}

#[tokio::test]
async fn test_unsupported_version() {
    let scratch = common::scratch_dir();
    let testctx = common::test_setup("unsupported_version", &scratch);

    let revision = PETS_REVISION.replace("openapi: 3.0.3", "swagger: \"2.0\"");
    let request = common::multipart_request(
        &testctx,
        "/breaking-changes",
        &[("base", PETS_BASE), ("revision", &revision)],
    );
    let error = testctx
        .client_testctx
        .make_request_with_request(request, StatusCode::BAD_REQUEST)
        .await
        .expect_err("expected failure");
    assert_eq!(error.error_code.as_deref(), Some("InvalidDocument"));
    assert_eq!(error.message, "revision document could not be loaded");

    common::assert_no_workspaces(&scratch);
    testctx.teardown().await;
}

#[tokio::test]
async fn test_missing_scratch_dir() {
    let scratch = common::scratch_dir();
    let mut config = common::test_config(&scratch);
    config.workspace.scratch_dir =
        config.workspace.scratch_dir.map(|dir| dir.join("missing"));
    let context = ServerContext::new(&config).unwrap();
    let testctx =
        common::test_setup_with_context("missing_scratch_dir", context);

    let request = common::multipart_request(
        &testctx,
        "/diff",
        &[("base", PETS_BASE), ("revision", PETS_REVISION)],
    );
    let error = testctx
        .client_testctx
        .make_request_with_request(
            request,
            StatusCode::INTERNAL_SERVER_ERROR,
        )
        .await
        .expect_err("expected failure");
    assert_eq!(error.message, "Internal Server Error");

    common::assert_no_workspaces(&scratch);
    testctx.teardown().await;
}

#[tokio::test]
async fn test_comparison_failure() {
    let scratch = common::scratch_dir();
    let context = ServerContext::with_collaborators(
        &common::test_config(&scratch),
        Arc::new(OpenApiLoader::new()),
        Arc::new(FailingEngine),
    )
    .unwrap();
    let testctx =
        common::test_setup_with_context("comparison_failure", context);

    let request = common::multipart_request(
        &testctx,
        "/diff",
        &[("base", PETS_BASE), ("revision", PETS_REVISION)],
    );
    let error = testctx
        .client_testctx
        .make_request_with_request(request, StatusCode::BAD_REQUEST)
        .await
        .expect_err("expected failure");
    assert_eq!(error.error_code.as_deref(), Some("ComparisonFailed"));
    assert!(!error.message.contains("/pets"));

    common::assert_no_workspaces(&scratch);
    testctx.teardown().await;
}
