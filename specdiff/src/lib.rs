// Copyright 2026 Oxide Computer Company

//! specdiff is an HTTP service that compares two versions of an OpenAPI
//! document and reports the differences between them.
//!
//! A client uploads the two documents as the `base` and `revision` fields of
//! a form:
//!
//! ```text
//! POST /diff
//! Content-Type: multipart/form-data; boundary=...
//! ```
//!
//! and, on success, receives a `201 Created` response whose body is a YAML
//! [`DiffReport`]: changes to the document's `info` section, then one entry
//! per change to a path, operation, parameter, request body, response or
//! schema, each classified as breaking or non-breaking for existing clients.
//! `POST /breaking-changes` accepts the same form and reports only the
//! breaking changes.
//!
//! ## Processing a request
//!
//! Each request is handled by one run of the [`DiffPipeline`]:
//!
//! 1. The form is recognized ([`upload::UploadForm`]).
//! 2. A fresh [`workspace::Workspace`] is created under the configured
//!    scratch directory, and each document is streamed into its own
//!    [`workspace::StagedFile`] there.
//! 3. Both documents are loaded by a [`SpecLoader`] and compared by a
//!    [`ComparisonEngine`], on tokio's blocking thread pool.
//! 4. The workspace is removed, whatever the outcome.
//! 5. The report is encoded ([`report::report_response`]).
//!
//! Runs share no mutable state, so any number may proceed concurrently.
//!
//! ## Errors
//!
//! Problems with the upload itself (a malformed form, a missing field, a
//! document that does not load, documents that cannot be compared) produce a
//! 400 response.  Failures of the server's own resources (the scratch
//! directory, the filesystem, encoding) produce a 500, and a run that
//! exceeds its time limit produces a 503.  Error bodies are Dropshot's usual
//! JSON error bodies and carry only a coarse message; the details are
//! logged.  See [`error`].
//!
//! ## Configuration
//!
//! See [`ConfigSpecDiff`].

#[macro_use]
extern crate slog;

pub mod compare;
pub mod config;
pub mod error;
pub mod http_entrypoints;
pub mod loader;
pub mod pipeline;
pub mod report;
pub mod server;
pub mod upload;
pub mod workspace;

pub use compare::CompareError;
pub use compare::ComparisonConfig;
pub use compare::ComparisonEngine;
pub use compare::DiffReport;
pub use compare::OpenApiComparator;
pub use config::ConfigSpecDiff;
pub use config::LoadConfigError;
pub use error::PipelineError;
pub use error::PipelineFailure;
pub use loader::LoadError;
pub use loader::OpenApiLoader;
pub use loader::SpecLoader;
pub use pipeline::DiffPipeline;
pub use pipeline::Stage;
pub use server::start_server;
pub use server::ServerContext;
pub use server::StartError;
