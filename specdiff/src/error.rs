// Copyright 2026 Oxide Computer Company

//! Error handling for the diff pipeline
//!
//! Every failure of a pipeline run falls into one of a few classes:
//!
//! * **Client input errors** -- the form body could not be parsed, a required
//!   field is missing, a document does not load, or the two documents cannot
//!   be compared.  The problem lies with what was uploaded, so these become
//!   400-level responses.
//! * **Resource errors** -- the workspace or a staged file could not be
//!   created or written, the blocking worker died, or the report could not be
//!   encoded.  These become 500-level responses.
//! * **Time limit** -- the run did not finish within the configured time
//!   limit.  This becomes a 503.
//!
//! Only an error code and a coarse message reach the client.  The complete
//! cause, along with the pipeline stage at which the run failed, is kept in
//! the `HttpError`'s internal message (which dropshot logs) and in the
//! pipeline's own log record.

use crate::compare::CompareError;
use crate::loader::LoadError;
use crate::pipeline::Stage;
use crate::upload::DocumentRole;
use camino::Utf8PathBuf;
use dropshot::HttpError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors produced while running the diff pipeline for one request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed form body: {0}")]
    MalformedForm(String),
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] multer::Error),
    #[error("missing required form field {:?}", .0.field_name())]
    MissingField(DocumentRole),
    #[error("failed to create workspace under {root:?}: {source}")]
    Workspace { root: Utf8PathBuf, source: std::io::Error },
    #[error("failed to stage {role} upload: {source}")]
    Staging { role: DocumentRole, source: std::io::Error },
    #[error("failed to load {role} document: {source}")]
    Load { role: DocumentRole, source: LoadError },
    #[error("failed to compare documents: {0}")]
    Compare(#[source] CompareError),
    #[error("blocking worker failed: {0}")]
    Worker(#[source] tokio::task::JoinError),
    #[error("failed to encode diff report: {0}")]
    Encode(#[source] serde_yaml::Error),
    #[error("failed to build response: {0}")]
    Response(#[source] http::Error),
    #[error("request did not complete within {0:?}")]
    TimedOut(Duration),
}

/// How a [`PipelineError`] is reported to the client.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// The uploaded input is at fault (400).
    ClientInput,
    /// The server could not provide the resources it needed (500).
    Resource,
    /// The run exceeded its time limit (503).
    Unavailable,
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::MalformedForm(_)
            | PipelineError::Multipart(_)
            | PipelineError::MissingField(_)
            | PipelineError::Load { .. }
            | PipelineError::Compare(_) => ErrorClass::ClientInput,
            PipelineError::Workspace { .. }
            | PipelineError::Staging { .. }
            | PipelineError::Worker(_)
            | PipelineError::Encode(_)
            | PipelineError::Response(_) => ErrorClass::Resource,
            PipelineError::TimedOut(_) => ErrorClass::Unavailable,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.class() == ErrorClass::ClientInput
    }

    /// Machine-readable code sent back with client input errors.
    fn error_code(&self) -> &'static str {
        match self {
            PipelineError::MalformedForm(_) | PipelineError::Multipart(_) => {
                "MalformedForm"
            }
            PipelineError::MissingField(_) => "MissingField",
            PipelineError::Load { .. } => "InvalidDocument",
            PipelineError::Compare(_) => "ComparisonFailed",
            PipelineError::TimedOut(_) => "TimedOut",
            PipelineError::Workspace { .. }
            | PipelineError::Staging { .. }
            | PipelineError::Worker(_)
            | PipelineError::Encode(_)
            | PipelineError::Response(_) => "Internal",
        }
    }

    /// Coarse message sent back with client input errors.  Deliberately
    /// free of paths and parser output.
    fn external_message(&self) -> String {
        match self {
            PipelineError::MalformedForm(_) | PipelineError::Multipart(_) => {
                String::from("request body is not a valid form")
            }
            PipelineError::MissingField(role) => {
                format!("missing required form field \"{}\"", role.field_name())
            }
            PipelineError::Load { role, .. } => {
                format!("{} document could not be loaded", role)
            }
            PipelineError::Compare(_) => {
                String::from("documents could not be compared")
            }
            _ => String::from("request could not be completed"),
        }
    }
}

/// A [`PipelineError`] together with the last stage the run reached.
#[derive(Debug)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: PipelineError,
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed after stage \"{}\": {}", self.stage, self.error)
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<PipelineFailure> for HttpError {
    fn from(failure: PipelineFailure) -> HttpError {
        let internal_message = failure.to_string();
        let error = &failure.error;
        let mut http_error = match error.class() {
            ErrorClass::ClientInput => HttpError::for_bad_request(
                Some(error.error_code().to_string()),
                error.external_message(),
            ),
            ErrorClass::Resource => {
                HttpError::for_internal_error(internal_message.clone())
            }
            ErrorClass::Unavailable => HttpError::for_unavail(
                Some(error.error_code().to_string()),
                internal_message.clone(),
            ),
        };
        http_error.internal_message = internal_message;
        http_error
    }
}
