//! Access to the outgoing fax queue.
//!
//! The pipeline only talks to [`JobStore`]; production runs on
//! [`MySqlJobStore`]. Correctness across several daemon instances rests
//! entirely on `update_job_state` being a conditional, transactional update.

use sqlx::MySqlPool;
use std::future::Future;

use crate::db::queries;
use crate::models::job::{FaxJob, FaxState};
use crate::models::trunk::TrunkNumber;

pub trait JobStore: Send + Sync {
    /// Jobs in state `created` scoped to `server_name`. Order is unspecified.
    fn list_eligible_jobs(
        &self,
        server_name: &str,
    ) -> impl Future<Output = Result<Vec<FaxJob>, StoreError>> + Send;

    /// Atomically move `job_id` from `from` to `to`.
    fn update_job_state(
        &self,
        job_id: i64,
        from: FaxState,
        to: FaxState,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Every fax-capable trunk matching `outgoing_number_id`.
    fn lookup_fax_trunk(
        &self,
        outgoing_number_id: i64,
    ) -> impl Future<Output = Result<Vec<TrunkNumber>, StoreError>> + Send;

    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// [`JobStore`] backed by the Asterisk realtime MySQL database.
#[derive(Clone)]
pub struct MySqlJobStore {
    pool: MySqlPool,
}

impl MySqlJobStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

impl JobStore for MySqlJobStore {
    async fn list_eligible_jobs(&self, server_name: &str) -> Result<Vec<FaxJob>, StoreError> {
        Ok(queries::list_created_jobs(&self.pool, server_name).await?)
    }

    async fn update_job_state(
        &self,
        job_id: i64,
        from: FaxState,
        to: FaxState,
    ) -> Result<(), StoreError> {
        if !from.can_transition_to(to) {
            return Err(StoreError::InvalidTransition { job_id, from, to });
        }

        match queries::update_job_state(&self.pool, job_id, from, to).await? {
            0 => Err(StoreError::StateConflict { job_id, expected: from }),
            _ => Ok(()),
        }
    }

    async fn lookup_fax_trunk(&self, outgoing_number_id: i64) -> Result<Vec<TrunkNumber>, StoreError> {
        Ok(queries::find_fax_trunks(&self.pool, outgoing_number_id).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(queries::ping(&self.pool).await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Fax {job_id} is no longer in state {expected}")]
    StateConflict { job_id: i64, expected: FaxState },

    #[error("Fax {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: i64,
        from: FaxState,
        to: FaxState,
    },
}

impl StoreError {
    /// Whether the store itself is unreachable, as opposed to a single query failing.
    pub fn is_connectivity(&self) -> bool {
        match self {
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            StoreError::StateConflict { .. } | StoreError::InvalidTransition { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_classification() {
        assert!(StoreError::Database(sqlx::Error::PoolTimedOut).is_connectivity());
        assert!(StoreError::Database(sqlx::Error::PoolClosed).is_connectivity());
        assert!(StoreError::Database(sqlx::Error::Io(std::io::Error::from(
            std::io::ErrorKind::ConnectionRefused
        )))
        .is_connectivity());

        assert!(!StoreError::Database(sqlx::Error::RowNotFound).is_connectivity());
        assert!(!StoreError::StateConflict {
            job_id: 1,
            expected: FaxState::Created
        }
        .is_connectivity());
    }
}
