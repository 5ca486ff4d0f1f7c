// Copyright 2026 Oxide Computer Company

//! Tests for `/breaking-changes`.

use crate::common;
use crate::common::PETS_BASE;
use crate::common::PETS_REVISION;
use dropshot::test_util::read_string;
use http::StatusCode;
use specdiff::compare::report::ChangeKind;
use specdiff::compare::report::ChangeLevel;
use specdiff::compare::report::ChangeSubject;

#[tokio::test]
async fn test_breaking_changes_only() {
    let scratch = common::scratch_dir();
    let testctx = common::test_setup("breaking_changes_only", &scratch);

    // Besides adding "age", the revision drops DELETE /pets.
    let start = PETS_REVISION.find("    delete:").unwrap();
    let revision = &PETS_REVISION[..start];

    let request = common::multipart_request(
        &testctx,
        "/diff",
        &[("base", PETS_BASE), ("revision", revision)],
    );
    let mut response = testctx
        .client_testctx
        .make_request_with_request(request, StatusCode::CREATED)
        .await
        .expect("expected success");
    let full = common::parse_report(&read_string(&mut response).await);
    assert_eq!(full.summary.breaking, 1);
    assert_eq!(full.summary.non_breaking, 1);

    let request = common::multipart_request(
        &testctx,
        "/breaking-changes",
        &[("base", PETS_BASE), ("revision", revision)],
    );
    let mut response = testctx
        .client_testctx
        .make_request_with_request(request, StatusCode::CREATED)
        .await
        .expect("expected success");
    let report = common::parse_report(&read_string(&mut response).await);
    assert!(report.info.is_none());
    assert_eq!(report.changes.len(), 1);
    let change = &report.changes[0];
    assert_eq!(change.path, "/pets");
    assert_eq!(change.method.as_deref(), Some("DELETE"));
    assert_eq!(change.subject, ChangeSubject::Operation);
    assert_eq!(change.kind, ChangeKind::Deleted);
    assert_eq!(change.level, ChangeLevel::Breaking);
    assert_eq!(report.summary.breaking, 1);
    assert_eq!(report.summary.non_breaking, 0);

    // The breaking-only report is the breaking subset of the full one.
    let breaking: Vec<_> = full.breaking_changes().cloned().collect();
    assert_eq!(report.changes, breaking);

    common::assert_no_workspaces(&scratch);
    testctx.teardown().await;
}

#[tokio::test]
async fn test_breaking_changes_none() {
    let scratch = common::scratch_dir();
    let testctx = common::test_setup("breaking_changes_none", &scratch);

    let request = common::multipart_request(
        &testctx,
        "/breaking-changes",
        &[("base", PETS_BASE), ("revision", PETS_REVISION)],
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
