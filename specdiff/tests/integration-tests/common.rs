// Copyright 2026 Oxide Computer Company

//! Common facilities for automated testing.

use camino::Utf8Path;
use dropshot::test_util::LogContext;
use dropshot::test_util::TestContext;
use dropshot::Body;
use dropshot::ConfigDropshot;
use dropshot::ConfigLogging;
use dropshot::ConfigLoggingIfExists;
use dropshot::ConfigLoggingLevel;
use http::Method;
use http::Request;
use specdiff::http_entrypoints::api;
use specdiff::server::dropshot_config;
use specdiff::ConfigSpecDiff;
use specdiff::DiffReport;
use specdiff::ServerContext;
use std::sync::Arc;
use tempfile::TempDir;

pub const PETS_BASE: &str = r#"openapi: 3.0.3
info:
  title: Pets
  version: 1.0.0
paths:
  /pets:
    get:
      summary: List pets
      responses:
        "200":
          description: The pets
          content:
            application/json:
              schema:
                type: object
                properties:
                  name:
                    type: string
    delete:
      summary: Remove all pets
      responses:
        "204":
          description: Removed
"#;

pub const PETS_REVISION: &str = r#"openapi: 3.0.3
info:
  title: Pets
  version: 1.1.0
paths:
  /pets:
    get:
      summary: List pets
      responses:
        "200":
          description: The pets
          content:
            application/json:
              schema:
                type: object
                properties:
                  name:
                    type: string
                  age:
                    type: integer
    delete:
      summary: Remove all pets
      responses:
        "204":
          description: Removed
"#;

const BOUNDARY: &str = "specdiff-test-boundary";

pub type SpecDiffTestContext = TestContext<Arc<ServerContext>>;

/// A scratch directory for the workspaces of one test server.
pub fn scratch_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("specdiff-scratch-")
        .tempdir()
        .expect("failed to create scratch directory")
}

/// Server configuration that puts workspaces under `scratch`.
pub fn test_config(scratch: &TempDir) -> ConfigSpecDiff {
    let mut config = ConfigSpecDiff::default();
    config.workspace.scratch_dir = Some(
        Utf8Path::from_path(scratch.path())
            .expect("scratch directory is not UTF-8")
            .to_owned(),
    );
    config
}

pub fn test_setup(test_name: &str, scratch: &TempDir) -> SpecDiffTestContext {
    let context = ServerContext::new(&test_config(scratch))
        .expect("invalid test configuration");
    test_setup_with_context(test_name, context)
}

pub fn test_setup_with_context(
    test_name: &str,
    context: ServerContext,
) -> SpecDiffTestContext {
    // Bind to any available port on 127.0.0.1 so that tests can run
    // concurrently.
    let config_dropshot = dropshot_config(&ConfigDropshot::default());
    let logctx = create_log_context(test_name);
    let log = logctx.log.new(o!());
    let api = api().expect("failed to register endpoints");
    TestContext::new(
        api,
        Arc::new(context),
        &config_dropshot,
        Some(logctx),
        log,
    )
}

pub fn create_log_context(test_name: &str) -> LogContext {
    let log_config = ConfigLogging::File {
        level: ConfigLoggingLevel::Debug,
        path: "UNUSED".into(),
        if_exists: ConfigLoggingIfExists::Fail,
    };
    LogContext::new(test_name, &log_config)
}

/// Builds a `multipart/form-data` POST with one part per `(name, value)`.
pub fn multipart_request(
    testctx: &SpecDiffTestContext,
    path: &str,
    parts: &[(&str, &str)],
) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in parts {
        body.push_str(&format!(
            "--{}\r\n\
            Content-Disposition: form-data; name=\"{}\"; \
            filename=\"{}.yaml\"\r\n\
            Content-Type: application/yaml\r\n\
            \r\n\
            {}\r\n",
            BOUNDARY, name, name, value
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));

    Request::builder()
        .method(Method::POST)
        .uri(testctx.client_testctx.url(path))
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(body.into())
        .expect("attempted to construct invalid request")
}

/// Builds an `application/x-www-form-urlencoded` POST.
pub fn urlencoded_request(
    testctx: &SpecDiffTestContext,
    path: &str,
    pairs: &[(&str, &str)],
) -> Request<Body> {
    let body = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    Request::builder()
        .method(Method::POST)
        .uri(testctx.client_testctx.url(path))
        .header(
            http::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(body.into())
        .expect("attempted to construct invalid request")
}

pub fn parse_report(body: &str) -> DiffReport {
    serde_yaml::from_str(body).expect("response is not a diff report")
}

/// Asserts that no workspace was left behind in `scratch`.
pub fn assert_no_workspaces(scratch: &TempDir) {
    let leftover: Vec<_> = std::fs::read_dir(scratch.path())
        .expect("failed to list scratch directory")
        .map(|entry| entry.expect("failed to read entry").file_name())
        .collect();
    assert!(leftover.is_empty(), "leftover workspaces: {:?}", leftover);
}
