use fax_spooler::{
    config::AppConfig,
    db, heartbeat,
    poller::Poller,
    store::MySqlJobStore,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting fax spooler");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    if let Some(addr) = &config.metrics_addr {
        if let Err(e) = install_metrics(addr) {
            tracing::error!(error = %e, addr = %addr, "Failed to start metrics exporter");
            return ExitCode::FAILURE;
        }
    }

    tracing::info!("Connecting to MySQL");
    let pool = match db::init_pool(&config.database_url, config.db_max_connections).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            return ExitCode::FAILURE;
        }
    };

    let store = Arc::new(MySqlJobStore::new(pool));
    let poller = Poller::new(Arc::clone(&store), &config);

    tracing::info!(
        server_name = %config.server_name,
        poll_interval_secs = config.poll_interval_secs,
        spool_dir = %config.spool_outgoing_dir.display(),
        "Fax spooler ready, starting poll loop"
    );

    let fatal = tokio::select! {
        result = poller.run() => result,
        result = heartbeat::run(store.as_ref(), config.heartbeat_interval()) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
            return ExitCode::SUCCESS;
        }
    };

    match fatal {
        Ok(never) => match never {},
        Err(e) => {
            tracing::error!(error = %e, "Fax spooler stopped");
            ExitCode::FAILURE
        }
    }
}

fn install_metrics(addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = addr.parse()?;
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    metrics::describe_histogram!(
        "fax_job_processing_seconds",
        "Time to turn one queued fax into a call file"
    );
    metrics::describe_counter!("fax_jobs_processed_total", "Faxes moved to processed");
    metrics::describe_counter!("fax_jobs_failed_total", "Faxes that failed processing");
    metrics::describe_counter!("fax_tiffs_pruned_total", "Expired TIFFs removed from staging");
    metrics::describe_counter!(
        "fax_callfiles_spooled_total",
        "Call files handed to Asterisk"
    );
    metrics::describe_counter!(
        "fax_callfiles_spool_failed_total",
        "Processed faxes whose call file could not be spooled"
    );

    tracing::info!(%addr, "Prometheus metrics listening");
    Ok(())
}
