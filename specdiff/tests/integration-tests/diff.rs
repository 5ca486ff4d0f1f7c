// Copyright 2026 Oxide Computer Company

//! Tests for successful comparisons through `/diff`.

use crate::common;
use crate::common::PETS_BASE;
use crate::common::PETS_REVISION;
use dropshot::test_util::read_string;
use http::StatusCode;
use specdiff::compare::report::ChangeKind;
use specdiff::compare::report::ChangeLevel;
use specdiff::compare::report::ChangeSubject;
use specdiff::report::CONTENT_TYPE_YAML;

#[tokio::test]
async fn test_diff_reports_added_property() {
    let scratch = common::scratch_dir();
    let testctx = common::test_setup("diff_reports_added_property", &scratch);

    let request = common::multipart_request(
        &testctx,
        "/diff",
        &[("base", PETS_BASE), ("revision", PETS_REVISION)],
    );
    let mut response = testctx
        .client_testctx
        .make_request_with_request(request, StatusCode::CREATED)
        .await
        .expect("expected success");
    assert_eq!(
        response.headers().get(http::header::CONTENT_TYPE).unwrap(),
        CONTENT_TYPE_YAML
    );

    let report = common::parse_report(&read_string(&mut response).await);
    assert_eq!(report.changes.len(), 1);
    let change = &report.changes[0];
    assert_eq!(change.path, "/pets");
    assert_eq!(change.method.as_deref(), Some("GET"));
    assert_eq!(
        change.location.as_deref(),
        Some("response 200 application/json")
    );
    assert_eq!(change.subject, ChangeSubject::Property);
    assert_eq!(change.name.as_deref(), Some("age"));
    assert_eq!(change.kind, ChangeKind::Added);
    assert_eq!(change.level, ChangeLevel::NonBreaking);

    let info = report.info.expect("expected info changes");
    let version = info.version.expect("expected a version change");
    assert_eq!(version.from.as_deref(), Some("1.0.0"));
    assert_eq!(version.to.as_deref(), Some("1.1.0"));
    assert!(info.title.is_none());

    assert_eq!(report.summary.breaking, 0);
    assert_eq!(report.summary.non_breaking, 1);

    common::assert_no_workspaces(&scratch);
    testctx.teardown().await;
}

#[tokio::test]
async fn test_diff_is_repeatable() {
    let scratch = common::scratch_dir();
    let testctx = common::test_setup("diff_is_repeatable", &scratch);

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let request = common::multipart_request(
            &testctx,
            "/diff",
            &[("base", PETS_BASE), ("revision", PETS_REVISION)],
        );
        let mut response = testctx
            .client_testctx
            .make_request_with_request(request, StatusCode::CREATED)
            .await
            .expect("expected success");
        bodies.push(read_string(&mut response).await);
    }
    assert_eq!(bodies[0], bodies[1]);

    common::assert_no_workspaces(&scratch);
    testctx.teardown().await;
}

#[tokio::test]
async fn test_diff_identical_documents() {
    let scratch = common::scratch_dir();
    let testctx = common::test_setup("diff_identical_documents", &scratch);

    let request = common::multipart_request(
        &testctx,
        "/diff",
        &[("base", PETS_BASE), ("revision", PETS_BASE)],
    );
    let mut response = testctx
        .client_testctx
        .make_request_with_request(request, StatusCode::CREATED)
        .await
        .expect("expected success");
    let report = common::parse_report(&read_string(&mut response).await);
    assert!(report.is_empty());

    testctx.teardown().await;
}

#[tokio::test]
async fn test_diff_urlencoded() {
    let scratch = common::scratch_dir();
    let testctx = common::test_setup("diff_urlencoded", &scratch);

    let request = common::urlencoded_request(
        &testctx,
        "/diff",
        &[("base", PETS_BASE), ("revision", PETS_REVISION)],
    );
    let mut response = testctx
        .client_testctx
        .make_request_with_request(request, StatusCode::CREATED)
        .await
        .expect("expected success");
    let report = common::parse_report(&read_string(&mut response).await);
    assert_eq!(report.changes.len(), 1);
    assert_eq!(report.changes[0].name.as_deref(), Some("age"));

    common::assert_no_workspaces(&scratch);
    testctx.teardown().await;
}

#[tokio::test]
async fn test_diff_split_parts() {
    let scratch = common::scratch_dir();
    let testctx = common::test_setup("diff_split_parts", &scratch);

    // A field sent as several parts is staged as the concatenation of the
    // parts, in order.
    let (head, tail) = PETS_REVISION.split_at(PETS_REVISION.len() / 2);
    let request = common::multipart_request(
        &testctx,
        "/diff",
        &[
            ("revision", head),
            ("base", PETS_BASE),
            ("comment", "ignored"),
            ("revision", tail),
        ],
    );
    let mut response = testctx
        .client_testctx
        .make_request_with_request(request, StatusCode::CREATED)
        .await
        .expect("expected success");
    let report = common::parse_report(&read_string(&mut response).await);
    assert_eq!(report.changes.len(), 1);

    common::assert_no_workspaces(&scratch);
    testctx.teardown().await;
}

#[tokio::test]
async fn test_diff_external_reference() {
    let scratch = common::scratch_dir();
    let testctx = common::test_setup("diff_external_reference", &scratch);

    // Shared definitions live outside the workspace and are referenced by
    // absolute path.
    let shared = common::scratch_dir();
    let common_path = shared.path().join("common.yaml");
    std::fs::write(
        &common_path,
        "Pet:\n  type: object\n  properties:\n    name:\n      type: string\n",
    )
    .unwrap();
    let base = PETS_BASE.replace(
        "              schema:\n\
         \x20               type: object\n\
         \x20               properties:\n\
         \x20                 name:\n\
         \x20                   type: string\n",
        &format!(
            "              schema:\n                $ref: \"{}#/Pet\"\n",
            common_path.display()
        ),
    );
    assert_ne!(base, PETS_BASE);

    let request = common::multipart_request(
        &testctx,
        "/diff",
        &[("base", &base), ("revision", PETS_REVISION)],
    );
    let mut response = testctx
        .client_testctx
        .make_request_with_request(request, StatusCode::CREATED)
        .await
        .expect("expected success");
    let report = common::parse_report(&read_string(&mut response).await);
    assert_eq!(report.changes.len(), 1);
    assert_eq!(report.changes[0].name.as_deref(), Some("age"));

    common::assert_no_workspaces(&scratch);
    testctx.teardown().await;
}
