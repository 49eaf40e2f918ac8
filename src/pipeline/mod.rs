//! Per-fax processing: `created → processing → processed`.
//!
//! Each step either succeeds or aborts the job where its last successful
//! state transition left it. Nothing is retried here; a job stuck in
//! `processing` needs an operator.

mod working_file;

pub use working_file::WorkingFiles;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::job::{FaxJob, FaxState};
use crate::services::callfile::{CallFileBuilder, CallFileError};
use crate::services::converter::{is_pdf_name, ConvertError, DocumentConverter};
use crate::services::ownership::{Ownership, OwnershipError};
use crate::store::{JobStore, StoreError};

pub struct FaxPipeline<S> {
    store: Arc<S>,
    fax_out_dir: PathBuf,
    converter: DocumentConverter,
    callfiles: CallFileBuilder,
    ownership: Ownership,
}

/// Outputs of a job that reached `processed`.
struct Staged {
    tiff: PathBuf,
    call_file: PathBuf,
}

impl<S: JobStore> FaxPipeline<S> {
    pub fn new(store: Arc<S>, config: &AppConfig) -> Self {
        Self {
            store,
            fax_out_dir: config.fax_out_dir.clone(),
            converter: DocumentConverter::new(config.gs_binary.clone(), config.gs_arguments()),
            callfiles: CallFileBuilder,
            ownership: Ownership::new(config.asterisk_uid, config.asterisk_gid),
        }
    }

    /// Run one job to `processed` and return the call file, still in the
    /// staging directory, for the caller to spool.
    #[tracing::instrument(name = "fax", skip_all, fields(job_id = job.id))]
    pub async fn process(&self, job: &FaxJob) -> Result<PathBuf, PipelineError> {
        tracing::info!(filename = %job.filename, to = %job.to, "Processing fax");

        self.transition(job.id, FaxState::Created, FaxState::Processing)
            .await?;

        let mut files = WorkingFiles::new();
        let outcome = self.stage(job, &mut files).await;

        if let Ok(staged) = &outcome {
            // Asterisk reads the TIFF when it dials, so it outlives this job.
            files.keep(&staged.tiff);
            files.keep(&staged.call_file);
        }
        files.discard().await;

        let call_file = outcome?.call_file;

        tracing::info!(call_file = %call_file.display(), "Fax processed");

        Ok(call_file)
    }

    /// Steps after the job was claimed. Every file created here is tracked in
    /// `files`; the caller decides what survives.
    async fn stage(&self, job: &FaxJob, files: &mut WorkingFiles) -> Result<Staged, PipelineError> {
        let pdf = self.write_pdf(job, files).await?;

        let tiff = files.track(self.converter.convert(&pdf).await?);

        let trunks = self
            .store
            .lookup_fax_trunk(job.outgoing_number_id)
            .await
            .map_err(PipelineError::TrunkLookup)?;

        let call_file = files.track(
            self.callfiles
                .build(job.outgoing_number_id, &trunks, job.id, &tiff, &job.to)
                .await?,
        );

        self.ownership.apply(&call_file).await?;

        self.transition(job.id, FaxState::Processing, FaxState::Processed)
            .await?;

        Ok(Staged { tiff, call_file })
    }

    async fn transition(&self, job_id: i64, from: FaxState, to: FaxState) -> Result<(), PipelineError> {
        tracing::debug!(%from, %to, "Updating fax state");

        self.store
            .update_job_state(job_id, from, to)
            .await
            .map_err(|e| PipelineError::StateUpdate { from, to, source: e })
    }

    async fn write_pdf(&self, job: &FaxJob, files: &mut WorkingFiles) -> Result<PathBuf, PipelineError> {
        if !is_pdf_name(&job.filename) {
            return Err(PipelineError::UnsupportedDocumentType(job.filename.clone()));
        }

        // Names come from the database; keep them inside the staging directory.
        if Path::new(&job.filename).file_name() != Some(OsStr::new(&job.filename)) {
            return Err(PipelineError::InvalidFilename(job.filename.clone()));
        }

        let path = files.track(self.fax_out_dir.join(job.working_name()));

        tracing::info!(path = %path.display(), bytes = job.fax_data.len(), "Writing PDF");

        tokio::fs::write(&path, &job.fax_data)
            .await
            .map_err(|e| PipelineError::DocumentWrite {
                path: path.clone(),
                source: e,
            })?;

        Ok(path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Could not move fax from {from} to {to}: {source}")]
    StateUpdate {
        from: FaxState,
        to: FaxState,
        #[source]
        source: StoreError,
    },

    #[error("Only handling .pdf files, got {0:?}")]
    UnsupportedDocumentType(String),

    #[error("Filename must not contain a path: {0:?}")]
    InvalidFilename(String),

    #[error("Could not write PDF file {path}: {source}")]
    DocumentWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Conversion(#[from] ConvertError),

    #[error("Could not look up outgoing fax number: {0}")]
    TrunkLookup(#[source] StoreError),

    #[error(transparent)]
    CallFile(#[from] CallFileError),

    #[error(transparent)]
    Permission(#[from] OwnershipError),
}

impl PipelineError {
    /// The state the job was left in, given it was loaded as `created`.
    pub fn job_state(&self) -> FaxState {
        match self {
            PipelineError::StateUpdate { from, .. } => *from,
            _ => FaxState::Processing,
        }
    }
}
