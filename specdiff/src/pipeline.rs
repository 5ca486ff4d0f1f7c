// Copyright 2026 Oxide Computer Company

//! The diff pipeline: one run per request
//!
//! A run moves through the stages of [`Stage`] strictly in order, each at
//! most once:
//!
//! ```text
//! Received -> Parsed -> Staged -> Loaded -> Compared -> Encoded
//! ```
//!
//! and may fail after any stage but the last.  Whatever happens, the staged
//! files are closed (revision, then base) and the workspace is removed
//! before the run returns.  The configured time limit covers reading the
//! form as well as staging, loading and comparing.  If the run is instead
//! cancelled (the client went away), dropping the run's future drops the
//! workspace, which removes the directory as well.

use crate::compare::ComparisonConfig;
use crate::compare::ComparisonEngine;
use crate::compare::DiffReport;
use crate::config::ConfigUpload;
use crate::error::ErrorClass;
use crate::error::PipelineError;
use crate::error::PipelineFailure;
use crate::loader::SpecLoader;
use crate::report::report_response;
use crate::upload;
use crate::upload::DocumentRole;
use crate::upload::UploadForm;
use crate::workspace::StagedFile;
use crate::workspace::Workspace;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use dropshot::Body;
use http::Request;
use http::Response;
use openapiv3::OpenAPI;
use slog::Logger;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

/// Last stage a pipeline run has completed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    /// The request has arrived; nothing has been read yet.
    Received,
    /// The form has been recognized (and, if url-encoded, read).
    Parsed,
    /// Both documents have been copied into the workspace.
    Staged,
    /// Both documents have been loaded.
    Loaded,
    /// The documents have been compared.
    Compared,
    /// The report has been encoded into a response.
    Encoded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Received => "received",
            Stage::Parsed => "parsed",
            Stage::Staged => "staged",
            Stage::Loaded => "loaded",
            Stage::Compared => "compared",
            Stage::Encoded => "encoded",
        })
    }
}

/// Tracks and logs the stage of one run.
struct Progress {
    log: Logger,
    stage: Stage,
}

impl Progress {
    fn new(log: &Logger) -> Progress {
        let progress = Progress { log: log.clone(), stage: Stage::Received };
        debug!(progress.log, "pipeline stage"; "stage" => %progress.stage);
        progress
    }

    fn advance(&mut self, stage: Stage) {
        self.stage = stage;
        debug!(self.log, "pipeline stage"; "stage" => %stage);
    }

    fn fail(&self, error: PipelineError) -> PipelineFailure {
        match error.class() {
            ErrorClass::ClientInput => {
                info!(self.log, "rejected diff request";
                    "stage" => %self.stage,
                    "error" => %error,
                );
            }
            ErrorClass::Resource | ErrorClass::Unavailable => {
                error!(self.log, "diff request failed";
                    "stage" => %self.stage,
                    "error" => %error,
                );
            }
        }
        PipelineFailure { stage: self.stage, error }
    }
}

/// Runs uploaded document pairs through staging, loading, comparison and
/// encoding.
///
/// A `DiffPipeline` holds no per-request state and is shared by all
/// concurrent runs.
pub struct DiffPipeline {
    loader: Arc<dyn SpecLoader>,
    engine: Arc<dyn ComparisonEngine>,
    scratch_dir: Utf8PathBuf,
    upload: ConfigUpload,
}

impl DiffPipeline {
    pub fn new(
        loader: Arc<dyn SpecLoader>,
        engine: Arc<dyn ComparisonEngine>,
        scratch_dir: Utf8PathBuf,
        upload: ConfigUpload,
    ) -> DiffPipeline {
        DiffPipeline { loader, engine, scratch_dir, upload }
    }

    /// Directory under which each run creates its workspace.
    pub fn scratch_dir(&self) -> &Utf8Path {
        &self.scratch_dir
    }

    /// Runs the pipeline for one request, comparing under `config`.
    ///
    /// Everything up to and including comparison shares one deadline.
    /// Loading and comparison run on the blocking pool and cannot be
    /// interrupted: when the deadline passes or the client goes away, the
    /// run returns (or is dropped) at once and the blocking task is
    /// abandoned, finishing in the background with its result discarded.
    pub async fn run(
        &self,
        request: Request<Body>,
        config: &ComparisonConfig,
        log: &Logger,
    ) -> Result<Response<Body>, PipelineFailure> {
        let mut progress = Progress::new(log);
        let timeout = self.upload.timeout();
        let started = Instant::now();

        let form = tokio::time::timeout(
            timeout,
            UploadForm::from_request(request, &self.upload),
        )
        .await
        .unwrap_or(Err(PipelineError::TimedOut(timeout)))
        .map_err(|error| progress.fail(error))?;
        progress.advance(Stage::Parsed);

        let workspace = Workspace::create(&self.scratch_dir).map_err(|source| {
            progress.fail(PipelineError::Workspace {
                root: self.scratch_dir.clone(),
                source,
            })
        })?;
        progress.log = progress.log.new(o!(
            "workspace" => workspace.path().to_string(),
        ));
        debug!(progress.log, "created workspace");

        let result = tokio::time::timeout(
            timeout.saturating_sub(started.elapsed()),
            self.compare_uploads(form, &workspace, config, &mut progress),
        )
        .await
        .unwrap_or(Err(PipelineError::TimedOut(timeout)));
        workspace.remove(&progress.log);

        let report = result.map_err(|error| progress.fail(error))?;
        let response =
            report_response(&report).map_err(|error| progress.fail(error))?;
        progress.advance(Stage::Encoded);
        info!(progress.log, "diff complete";
            "breaking" => report.summary.breaking,
            "non_breaking" => report.summary.non_breaking,
        );
        Ok(response)
    }

    /// Stages, loads and compares the uploaded documents.  The staged files
    /// are closed before this returns, whatever the outcome.
    async fn compare_uploads(
        &self,
        form: UploadForm,
        workspace: &Workspace,
        config: &ComparisonConfig,
        progress: &mut Progress,
    ) -> Result<DiffReport, PipelineError> {
        let (base, revision) =
            upload::stage(form, workspace, &progress.log).await?;
        progress.advance(Stage::Staged);

        let result =
            self.load_and_compare(&base, &revision, config, progress).await;
        revision.close(&progress.log).await;
        base.close(&progress.log).await;

        let report = result?;
        progress.advance(Stage::Compared);
        Ok(report)
    }

    async fn load_and_compare(
        &self,
        base: &StagedFile,
        revision: &StagedFile,
        config: &ComparisonConfig,
        progress: &mut Progress,
    ) -> Result<DiffReport, PipelineError> {
        let loader = Arc::clone(&self.loader);
        let base_path = base.path().to_owned();
        let revision_path = revision.path().to_owned();
        let (base, revision) = tokio::task::spawn_blocking(move || {
            let load = |role, path: &Utf8Path| {
                loader
                    .load(path)
                    .map_err(|source| PipelineError::Load { role, source })
            };
            Ok::<_, PipelineError>((
                load(DocumentRole::Base, &base_path)?,
                load(DocumentRole::Revision, &revision_path)?,
            ))
        })
        .await
        .map_err(PipelineError::Worker)??;
        progress.advance(Stage::Loaded);

        let engine = Arc::clone(&self.engine);
        let config = config.clone();
        tokio::task::spawn_blocking(move || {
            compare(engine.as_ref(), &config, &base, &revision)
        })
        .await
        .map_err(PipelineError::Worker)?
    }
}

fn compare(
    engine: &dyn ComparisonEngine,
    config: &ComparisonConfig,
    base: &OpenAPI,
    revision: &OpenAPI,
) -> Result<DiffReport, PipelineError> {
    engine.compare(config, base, revision).map_err(PipelineError::Compare)
}
