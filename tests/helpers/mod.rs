//! Test helpers: an in-memory job store and a config pointing at scratch directories
#![allow(dead_code)]

use std::collections::HashMap;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use fax_spooler::config::AppConfig;
use fax_spooler::models::job::{FaxJob, FaxState};
use fax_spooler::models::trunk::TrunkNumber;
use fax_spooler::store::{JobStore, StoreError};

struct StoredJob {
    job: FaxJob,
    server_name: String,
    state: FaxState,
}

/// [`JobStore`] that keeps jobs in memory and records every state change.
///
/// Updates are conditional on the current state, like the MySQL store.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<i64, StoredJob>>,
    trunks: Mutex<HashMap<i64, Vec<TrunkNumber>>>,
    transitions: Mutex<Vec<(i64, FaxState)>>,
    fail_transitions_to: Mutex<Option<FaxState>>,
    listing_error: Mutex<Option<fn() -> StoreError>>,
    offline: AtomicBool,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_job(&self, server_name: &str, job: FaxJob) {
        self.insert_job_in_state(server_name, job, FaxState::Created);
    }

    pub fn insert_job_in_state(&self, server_name: &str, job: FaxJob, state: FaxState) {
        self.jobs.lock().unwrap().insert(
            job.id,
            StoredJob {
                job,
                server_name: server_name.to_string(),
                state,
            },
        );
    }

    pub fn add_trunk(&self, outgoing_number_id: i64, trunk: TrunkNumber) {
        self.trunks
            .lock()
            .unwrap()
            .entry(outgoing_number_id)
            .or_default()
            .push(trunk);
    }

    pub fn state_of(&self, job_id: i64) -> Option<FaxState> {
        self.jobs.lock().unwrap().get(&job_id).map(|j| j.state)
    }

    /// Every successful transition of `job_id`, in order.
    pub fn history_of(&self, job_id: i64) -> Vec<FaxState> {
        self.transitions
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == job_id)
            .map(|(_, state)| *state)
            .collect()
    }

    /// Make every transition into `state` fail.
    pub fn fail_transitions_to(&self, state: FaxState) {
        *self.fail_transitions_to.lock().unwrap() = Some(state);
    }

    pub fn fail_listing_with(&self, error: fn() -> StoreError) {
        *self.listing_error.lock().unwrap() = Some(error);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionRefused,
            ))));
        }
        Ok(())
    }
}

impl JobStore for InMemoryJobStore {
    async fn list_eligible_jobs(&self, server_name: &str) -> Result<Vec<FaxJob>, StoreError> {
        self.check_online()?;
        if let Some(error) = *self.listing_error.lock().unwrap() {
            return Err(error());
        }

        let mut jobs: Vec<FaxJob> = self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|j| j.server_name == server_name && j.state == FaxState::Created)
            .map(|j| j.job.clone())
            .collect();
        jobs.sort_by_key(|j| j.id);
        Ok(jobs)
    }

    async fn update_job_state(
        &self,
        job_id: i64,
        from: FaxState,
        to: FaxState,
    ) -> Result<(), StoreError> {
        self.check_online()?;
        if !from.can_transition_to(to) {
            return Err(StoreError::InvalidTransition { job_id, from, to });
        }
        if *self.fail_transitions_to.lock().unwrap() == Some(to) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get_mut(&job_id) {
            Some(stored) if stored.state == from => {
                stored.state = to;
                self.transitions.lock().unwrap().push((job_id, to));
                Ok(())
            }
            _ => Err(StoreError::StateConflict {
                job_id,
                expected: from,
            }),
        }
    }

    async fn lookup_fax_trunk(&self, outgoing_number_id: i64) -> Result<Vec<TrunkNumber>, StoreError> {
        self.check_online()?;
        Ok(self
            .trunks
            .lock()
            .unwrap()
            .get(&outgoing_number_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }
}

/// Writes `gs_body` as a script and builds a config whose directories live under `root`.
///
/// The script runs through `/bin/sh` in place of Ghostscript; the call file
/// owner is whoever owns `root`, so ownership changes succeed without root.
pub fn test_config(root: &Path, gs_body: &str) -> AppConfig {
    let script = root.join("fake-gs.sh");
    std::fs::write(&script, format!("{gs_body}\n")).expect("write fake gs");

    let meta = std::fs::metadata(root).expect("stat scratch dir");

    AppConfig {
        database_url: "mysql://unused".to_string(),
        server_name: crate::fixtures::SERVER_NAME.to_string(),
        spool_outgoing_dir: root.join("spool/outgoing"),
        fax_in_dir: root.join("fax/incoming"),
        fax_out_dir: root.join("fax/outgoing"),
        gs_binary: "/bin/sh".to_string(),
        gs_args: script.display().to_string(),
        asterisk_uid: meta.uid(),
        asterisk_gid: meta.gid(),
        poll_interval_secs: 1,
        heartbeat_interval_secs: 1,
        tiff_retention_secs: 24 * 3600,
        db_max_connections: 1,
        metrics_addr: None,
    }
}

/// Files directly inside `dir`, sorted by name.
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    };
    files.sort();
    files
}
