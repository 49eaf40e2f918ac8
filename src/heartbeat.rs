use std::convert::Infallible;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use crate::poller::PollError;
use crate::store::JobStore;

/// Ping the store every `period`. Any failed ping is fatal so the supervisor
/// can restart the daemon against a fresh connection.
pub async fn run<S: JobStore>(store: &S, period: Duration) -> Result<Infallible, PollError> {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if let Err(e) = store.ping().await {
            tracing::error!(error = %e, "Heartbeat failed, shutting down");
            return Err(PollError::StoreConnectivity(e));
        }

        tracing::trace!("Heartbeat ok");
    }
}
