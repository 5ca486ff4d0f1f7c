// Copyright 2026 Oxide Computer Company

//! Per-request temporary workspaces
//!
//! A [`Workspace`] is a directory created under a scratch root with a name
//! that the operating system guarantees to be unique, so concurrent requests
//! never see each other's files.  It holds the two [`StagedFile`]s of one
//! pipeline run.
//!
//! The owner is expected to call [`Workspace::remove`] on every path, which
//! reports failures to the log.  If the workspace is dropped instead (for
//! example, because the request was cancelled when the client went away),
//! the directory is still removed, just without a record of any failure.

use crate::upload::DocumentRole;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use slog::Logger;
use std::io;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

/// Prefix used for every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "specdiff-";

/// A uniquely named directory owned by exactly one pipeline run.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    path: Utf8PathBuf,
}

impl Workspace {
    /// Creates a new workspace directory under `root`.
    pub fn create(root: &Utf8Path) -> io::Result<Workspace> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(root)?;
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf())
            .map_err(|error| error.into_io_error())?;
        Ok(Workspace { dir, path })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Creates the (empty) file that will hold the upload for `role`.
    ///
    /// The file must not already exist.
    pub async fn create_file(
        &self,
        role: DocumentRole,
    ) -> io::Result<StagedFile> {
        let path = self.path.join(role.field_name());
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        Ok(StagedFile { role, path, file, nparts: 0, nbytes: 0 })
    }

    /// Recursively deletes the workspace and everything in it.
    ///
    /// Failures are logged, never returned: by the time a workspace is
    /// removed the request's outcome has been decided, and a cleanup problem
    /// must not replace it.
    pub fn remove(self, log: &Logger) {
        let Workspace { dir, path } = self;
        match dir.close() {
            Ok(()) => {
                debug!(log, "removed workspace"; "workspace" => %path);
            }
            Err(error) => {
                error!(log, "failed to remove workspace";
                    "workspace" => %path,
                    "error" => %error,
                );
            }
        }
    }
}

/// An open file inside a [`Workspace`] holding one uploaded document.
#[derive(Debug)]
pub struct StagedFile {
    role: DocumentRole,
    path: Utf8PathBuf,
    file: tokio::fs::File,
    nparts: usize,
    nbytes: u64,
}

impl StagedFile {
    pub fn role(&self) -> DocumentRole {
        self.role
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Number of form parts copied into this file so far.
    pub fn nparts(&self) -> usize {
        self.nparts
    }

    /// Number of bytes copied into this file so far.
    pub fn nbytes(&self) -> u64 {
        self.nbytes
    }

    /// Records the start of another form part for this file.  Parts are
    /// appended in the order they are started.
    pub(crate) fn begin_part(&mut self) {
        self.nparts += 1;
    }

    pub(crate) async fn append(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data).await?;
        self.nbytes += data.len() as u64;
        Ok(())
    }

    /// Waits for all buffered writes to reach the file, so that the file can
    /// be read back by path.
    pub(crate) async fn flush(&mut self) -> io::Result<()> {
        self.file.flush().await
    }

    /// Closes the file.  Consuming `self` makes a second close impossible.
    /// Failures are only logged.
    pub async fn close(mut self, log: &Logger) {
        if let Err(error) = self.file.flush().await {
            error!(log, "failed to close staged file";
                "field" => self.role.field_name(),
                "path" => %self.path,
                "error" => %error,
            );
        }
    }
}
