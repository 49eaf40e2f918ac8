use futures::future::join_all;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::time::sleep;

use crate::config::AppConfig;
use crate::pipeline::FaxPipeline;
use crate::services::converter::TIFF_EXTENSION;
use crate::services::spool::SpoolDispatcher;
use crate::store::{JobStore, StoreError};

/// Outcome of one poll-process-spool cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub processed: usize,
    pub failed: usize,
    /// Call files now in the Asterisk spool.
    pub spooled: Vec<PathBuf>,
    pub spool_failed: usize,
    /// Expired TIFFs removed from staging.
    pub pruned: usize,
}

/// Drives the pipeline for this server's jobs on a fixed interval.
pub struct Poller<S> {
    store: Arc<S>,
    pipeline: FaxPipeline<S>,
    dispatcher: SpoolDispatcher,
    server_name: String,
    directories: Vec<PathBuf>,
    fax_out_dir: PathBuf,
    tiff_retention: Duration,
    poll_interval: Duration,
}

impl<S: JobStore> Poller<S> {
    pub fn new(store: Arc<S>, config: &AppConfig) -> Self {
        Self {
            pipeline: FaxPipeline::new(Arc::clone(&store), config),
            store,
            dispatcher: SpoolDispatcher::new(config.spool_outgoing_dir.clone()),
            server_name: config.server_name.clone(),
            directories: vec![
                config.fax_in_dir.clone(),
                config.fax_out_dir.clone(),
                config.spool_outgoing_dir.clone(),
            ],
            fax_out_dir: config.fax_out_dir.clone(),
            tiff_retention: config.tiff_retention(),
            poll_interval: config.poll_interval(),
        }
    }

    /// Poll until a fatal error. Job failures never end the loop.
    pub async fn run(&self) -> Result<Infallible, PollError> {
        loop {
            let report = self.run_once().await?;

            if report.processed + report.failed > 0 {
                tracing::info!(
                    processed = report.processed,
                    failed = report.failed,
                    spooled = report.spooled.len(),
                    spool_failed = report.spool_failed,
                    "Fax batch complete"
                );
            }

            sleep(self.poll_interval).await;
        }
    }

    pub async fn run_once(&self) -> Result<CycleReport, PollError> {
        self.ensure_directories().await?;
        let mut report = self.run_cycle().await?;
        report.pruned = self.prune_expired_tiffs().await;
        Ok(report)
    }

    pub async fn ensure_directories(&self) -> Result<(), PollError> {
        for dir in &self.directories {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| PollError::DirectoryCreation {
                    path: dir.clone(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Process every eligible job, then spool the call files that were produced.
    ///
    /// Jobs run concurrently and independently; spooling starts only once
    /// every job in the batch has finished.
    pub async fn run_cycle(&self) -> Result<CycleReport, PollError> {
        tracing::debug!(server_name = %self.server_name, "Checking pending faxes");

        let jobs = match self.store.list_eligible_jobs(&self.server_name).await {
            Ok(jobs) => jobs,
            Err(e) if e.is_connectivity() => return Err(PollError::StoreConnectivity(e)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to check pending faxes, skipping cycle");
                return Ok(CycleReport::default());
            }
        };

        let mut report = CycleReport::default();
        if jobs.is_empty() {
            return Ok(report);
        }

        tracing::info!(count = jobs.len(), "Found pending faxes");

        let outcomes = join_all(jobs.iter().map(|job| async move {
            let start = Instant::now();
            let outcome = self.pipeline.process(job).await;
            metrics::histogram!("fax_job_processing_seconds").record(start.elapsed().as_secs_f64());
            (job.id, outcome)
        }))
        .await;

        let mut ready = Vec::new();
        for (job_id, outcome) in outcomes {
            match outcome {
                Ok(call_file) => {
                    report.processed += 1;
                    metrics::counter!("fax_jobs_processed_total").increment(1);
                    ready.push((job_id, call_file));
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("fax_jobs_failed_total").increment(1);
                    tracing::error!(
                        job_id,
                        state = %e.job_state(),
                        error = %e,
                        "Fax processing failed"
                    );
                }
            }
        }

        for (job_id, call_file) in ready {
            match self.dispatcher.relocate(&call_file).await {
                Ok(spooled) => {
                    metrics::counter!("fax_callfiles_spooled_total").increment(1);
                    tracing::info!(job_id, path = %spooled.display(), "Fax handed to Asterisk");
                    report.spooled.push(spooled);
                }
                Err(e) => {
                    // The job is already `processed`; nothing will pick it up again.
                    report.spool_failed += 1;
                    metrics::counter!("fax_callfiles_spool_failed_total").increment(1);
                    tracing::error!(
                        job_id,
                        call_file = %call_file.display(),
                        spool_dir = %self.dispatcher.spool_dir().display(),
                        error = %e,
                        "Processed fax could not be spooled, manual cleanup required"
                    );
                }
            }
        }

        Ok(report)
    }
}

impl<S> Poller<S> {
    /// Remove TIFFs in staging older than the retention period.
    ///
    /// Asterisk reads a TIFF at dial time, so it cannot go with the job. Once
    /// the retention period has passed every dial attempt is over. Failures
    /// are logged and never fatal.
    pub async fn prune_expired_tiffs(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.fax_out_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %self.fax_out_dir.display(), error = %e, "Could not scan staging directory");
                return 0;
            }
        };

        let now = SystemTime::now();
        let mut pruned = 0;

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(dir = %self.fax_out_dir.display(), error = %e, "Could not scan staging directory");
                    break;
                }
            };

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TIFF_EXTENSION) {
                continue;
            }

            let expired = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => now
                    .duration_since(modified)
                    .is_ok_and(|age| age > self.tiff_retention),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Could not read TIFF age");
                    false
                }
            };
            if !expired {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    pruned += 1;
                    tracing::debug!(path = %path.display(), "Removed expired TIFF");
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove expired TIFF"),
            }
        }

        if pruned > 0 {
            metrics::counter!("fax_tiffs_pruned_total").increment(pruned as u64);
            tracing::info!(count = pruned, "Pruned expired TIFFs");
        }

        pruned
    }
}

/// Errors that stop the daemon.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Could not create directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Lost connection to the job store: {0}")]
    StoreConnectivity(#[source] StoreError),
}
