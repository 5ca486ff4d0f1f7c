// Copyright 2026 Oxide Computer Company

//! Setup of the specdiff HTTP server

use crate::compare::ComparisonConfig;
use crate::compare::ComparisonEngine;
use crate::compare::OpenApiComparator;
use crate::config::ConfigSpecDiff;
use crate::config::LoadConfigError;
use crate::http_entrypoints;
use crate::loader::OpenApiLoader;
use crate::loader::SpecLoader;
use crate::pipeline::DiffPipeline;
use dropshot::ApiDescriptionRegisterError;
use dropshot::BuildError;
use dropshot::ConfigDropshot;
use dropshot::HandlerTaskMode;
use dropshot::HttpServer;
use dropshot::ServerBuilder;
use slog::Logger;
use std::sync::Arc;
use thiserror::Error;

/// State shared by every request handler.
pub struct ServerContext {
    pub pipeline: DiffPipeline,
    /// Comparison flags for `/diff`
    pub diff_config: ComparisonConfig,
    /// Comparison flags for `/breaking-changes`
    pub breaking_config: ComparisonConfig,
}

impl ServerContext {
    /// Builds the context with the default loader and comparator.
    pub fn new(
        config: &ConfigSpecDiff,
    ) -> Result<ServerContext, LoadConfigError> {
        ServerContext::with_collaborators(
            config,
            Arc::new(OpenApiLoader::from_config(&config.loader)),
            Arc::new(OpenApiComparator::new()),
        )
    }

    /// Builds the context around the given loader and comparison engine.
    pub fn with_collaborators(
        config: &ConfigSpecDiff,
        loader: Arc<dyn SpecLoader>,
        engine: Arc<dyn ComparisonEngine>,
    ) -> Result<ServerContext, LoadConfigError> {
        config.validate()?;
        let scratch_dir = config.workspace.scratch_dir()?;
        Ok(ServerContext {
            pipeline: DiffPipeline::new(
                loader,
                engine,
                scratch_dir,
                config.upload.clone(),
            ),
            diff_config: config.comparison.clone(),
            breaking_config: config.comparison.with_breaking_only(),
        })
    }
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Config(#[from] LoadConfigError),
    #[error("failed to register endpoints: {0}")]
    Api(#[source] ApiDescriptionRegisterError),
    #[error("failed to start server: {0}")]
    Server(#[source] BuildError),
}

/// Returns the Dropshot configuration the server actually runs with.
///
/// Handlers are always cancelled when their client disconnects, so that an
/// abandoned upload stops being copied and its workspace is removed.
pub fn dropshot_config(config: &ConfigDropshot) -> ConfigDropshot {
    ConfigDropshot {
        default_handler_task_mode: HandlerTaskMode::CancelOnDisconnect,
        ..config.clone()
    }
}

/// Starts a specdiff server with the given configuration.
pub fn start_server(
    config: &ConfigSpecDiff,
    log: &Logger,
) -> Result<HttpServer<Arc<ServerContext>>, StartError> {
    let context = Arc::new(ServerContext::new(config)?);
    start_server_with_context(config, context, log)
}

/// Starts a specdiff server around an existing context.
pub fn start_server_with_context(
    config: &ConfigSpecDiff,
    context: Arc<ServerContext>,
    log: &Logger,
) -> Result<HttpServer<Arc<ServerContext>>, StartError> {
    let api = http_entrypoints::api().map_err(StartError::Api)?;
    info!(log, "starting specdiff server";
        "scratch_dir" => %context.pipeline.scratch_dir(),
    );
    ServerBuilder::new(api, context, log.clone())
        .config(dropshot_config(&config.http_api_server))
        .start()
        .map_err(StartError::Server)
}
