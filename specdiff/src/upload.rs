// Copyright 2026 Oxide Computer Company

//! Extraction of the uploaded documents from a request body
//!
//! A diff request carries two form fields, `base` and `revision`, either as
//! `multipart/form-data` (preferred) or `application/x-www-form-urlencoded`.
//! Multipart bodies are never buffered: each part is streamed chunk by chunk
//! into its staged file, so memory use is bounded regardless of upload size.
//! Url-encoded bodies are read whole, up to the same size limit.

use crate::config::ConfigUpload;
use crate::error::PipelineError;
use crate::workspace::StagedFile;
use crate::workspace::Workspace;
use dropshot::Body;
use dropshot::CONTENT_TYPE_MULTIPART_FORM_DATA;
use http::Request;
use http_body_util::BodyExt;
use http_body_util::Limited;
use slog::Logger;
use std::fmt;

/// Identifies which of the two uploaded documents something refers to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DocumentRole {
    Base,
    Revision,
}

impl DocumentRole {
    /// Name of the form field carrying this document.
    pub fn field_name(&self) -> &'static str {
        match self {
            DocumentRole::Base => "base",
            DocumentRole::Revision => "revision",
        }
    }

    pub fn from_field_name(name: &str) -> Option<DocumentRole> {
        match name {
            "base" => Some(DocumentRole::Base),
            "revision" => Some(DocumentRole::Revision),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// A request body that has been recognized as a form, but not yet consumed.
pub enum UploadForm {
    /// Streaming multipart parser over the request body
    Multipart(multer::Multipart<'static>),
    /// Url-encoded values for the `base` and `revision` fields, in the order
    /// they appeared
    UrlEncoded(Vec<(DocumentRole, String)>),
}

impl fmt::Debug for UploadForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadForm::Multipart(_) => f.write_str("UploadForm::Multipart"),
            UploadForm::UrlEncoded(values) => f
                .debug_tuple("UploadForm::UrlEncoded")
                .field(&values.len())
                .finish(),
        }
    }
}

impl UploadForm {
    /// Inspects the request's content type and prepares to read the form.
    ///
    /// Anything that is not `multipart/form-data` is treated as url-encoded,
    /// including a request with no content type at all.
    pub async fn from_request(
        request: Request<Body>,
        limits: &ConfigUpload,
    ) -> Result<UploadForm, PipelineError> {
        let (parts, body) = request.into_parts();
        let content_type = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .map(|value| {
                value.to_str().map_err(|e| {
                    PipelineError::MalformedForm(format!(
                        "invalid content type: {}",
                        e
                    ))
                })
            })
            .transpose()?;

        if let Some(content_type) = content_type {
            if media_type(content_type) == CONTENT_TYPE_MULTIPART_FORM_DATA {
                let boundary = multer::parse_boundary(content_type)?;
                let constraints = multer::Constraints::new().size_limit(
                    multer::SizeLimit::new().whole_stream(limits.max_bytes),
                );
                return Ok(UploadForm::Multipart(
                    multer::Multipart::with_constraints(
                        body.into_data_stream(),
                        boundary,
                        constraints,
                    ),
                ));
            }
        }

        let cap = usize::try_from(limits.max_bytes).unwrap_or(usize::MAX);
        let bytes = Limited::new(body, cap)
            .collect()
            .await
            .map_err(|e| {
                PipelineError::MalformedForm(format!(
                    "failed to read url-encoded body: {}",
                    e
                ))
            })?
            .to_bytes();
        if std::str::from_utf8(&bytes).is_err() {
            return Err(PipelineError::MalformedForm(String::from(
                "url-encoded body is not valid UTF-8",
            )));
        }
        let values = form_urlencoded::parse(&bytes)
            .filter_map(|(name, value)| {
                DocumentRole::from_field_name(&name)
                    .map(|role| (role, value.into_owned()))
            })
            .collect();
        Ok(UploadForm::UrlEncoded(values))
    }
}

/// Returns the lowercased media type of a `Content-Type` header value,
/// without parameters.
// RFC 7231 §3.1.1.1: media types are case insensitive and may be followed by
// whitespace and/or parameters.
fn media_type(content_type: &str) -> String {
    let end = content_type.find(';').unwrap_or(content_type.len());
    content_type[..end].trim().to_lowercase()
}

/// Copies the uploaded documents into two new files inside `workspace`.
///
/// On failure, any staged file already opened has been closed by the time
/// this returns.  Removing the workspace is the caller's job.
pub async fn stage(
    form: UploadForm,
    workspace: &Workspace,
    log: &Logger,
) -> Result<(StagedFile, StagedFile), PipelineError> {
    let mut base = workspace
        .create_file(DocumentRole::Base)
        .await
        .map_err(|source| PipelineError::Staging {
            role: DocumentRole::Base,
            source,
        })?;
    let mut revision = match workspace.create_file(DocumentRole::Revision).await
    {
        Ok(file) => file,
        Err(source) => {
            base.close(log).await;
            return Err(PipelineError::Staging {
                role: DocumentRole::Revision,
                source,
            });
        }
    };

    match fill(form, &mut base, &mut revision, log).await {
        Ok(()) => {
            debug!(log, "staged uploads";
                "base_bytes" => base.nbytes(),
                "revision_bytes" => revision.nbytes(),
            );
            Ok((base, revision))
        }
        Err(error) => {
            revision.close(log).await;
            base.close(log).await;
            Err(error)
        }
    }
}

async fn fill(
    form: UploadForm,
    base: &mut StagedFile,
    revision: &mut StagedFile,
    log: &Logger,
) -> Result<(), PipelineError> {
    match form {
        UploadForm::Multipart(multipart) => {
            copy_multipart(multipart, base, revision, log).await?
        }
        UploadForm::UrlEncoded(values) => {
            for (role, value) in values {
                let target = match role {
                    DocumentRole::Base => &mut *base,
                    DocumentRole::Revision => &mut *revision,
                };
                target.begin_part();
                target.append(value.as_bytes()).await.map_err(|source| {
                    PipelineError::Staging { role, source }
                })?;
            }
        }
    }

    for staged in [base, revision] {
        let role = staged.role();
        staged
            .flush()
            .await
            .map_err(|source| PipelineError::Staging { role, source })?;
        if staged.nparts() == 0 {
            return Err(PipelineError::MissingField(role));
        }
    }

    Ok(())
}

async fn copy_multipart(
    mut multipart: multer::Multipart<'static>,
    base: &mut StagedFile,
    revision: &mut StagedFile,
    log: &Logger,
) -> Result<(), PipelineError> {
    while let Some(mut field) = multipart.next_field().await? {
        let role = match field.name().and_then(DocumentRole::from_field_name) {
            Some(role) => role,
            None => {
                debug!(log, "skipping unrecognized form field";
                    "field" => field.name().unwrap_or("").to_string(),
                );
                continue;
            }
        };
        let target = match role {
            DocumentRole::Base => &mut *base,
            DocumentRole::Revision => &mut *revision,
        };

        target.begin_part();
        while let Some(chunk) = field.chunk().await? {
            target
                .append(&chunk)
                .await
                .map_err(|source| PipelineError::Staging { role, source })?;
        }
    }

    Ok(())
}
