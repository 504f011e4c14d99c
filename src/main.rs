//! devfeed-collector binary.
//! Loads config, builds the adapter registry and runs the collection
//! scheduler next to a small `/metrics` + `/health` server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use devfeed_collector::ingest::providers::build_registry;
use devfeed_collector::ingest::writer::HttpIngestSink;
use devfeed_collector::metrics::Metrics;
use devfeed_collector::{
    load_config_default, run_all_once, spawn_scheduler, FileRunHistory, ListenerMux,
    Orchestrator, RunHistory, SchedulerCfg,
};

const DEFAULT_METRICS_ADDR: &str = "127.0.0.1:9091";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("devfeed_collector=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = load_config_default().context("loading collector config")?;
    let registry = build_registry(&cfg)?;
    tracing::info!(jobs = registry.len(), sink = %cfg.sink.base_url, "collector configured");

    let sink = HttpIngestSink::new(&cfg.sink.base_url, cfg.sink.timeout_secs)
        .context("building ingest sink client")?;
    let orch = Arc::new(
        Orchestrator::new(registry, Arc::new(sink), ListenerMux::from_env())
            .with_default_status(cfg.sink.default_status),
    );
    let history: Arc<dyn RunHistory> =
        Arc::new(FileRunHistory::new(cfg.schedule.history_path.clone()));

    let metrics = Metrics::init(cfg.schedule.interval_secs).context("installing metrics recorder")?;
    let addr: SocketAddr = std::env::var("METRICS_ADDR")
        .unwrap_or_else(|_| DEFAULT_METRICS_ADDR.to_string())
        .parse()
        .context("parsing METRICS_ADDR")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding metrics server on {addr}"))?;
    let router = metrics.router();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::warn!("metrics server stopped: {e}");
        }
    });
    tracing::info!(%addr, "metrics server listening");

    if std::env::var("COLLECTOR_RUN_ONCE").is_ok_and(|v| v == "1") {
        let outcomes = run_all_once(&orch, history.as_ref()).await;
        for o in &outcomes {
            match o.report() {
                Some(r) => tracing::info!(
                    job = %r.job_name,
                    run_id = r.run_id,
                    accepted = r.write.accepted,
                    skipped = r.write.skipped,
                    failed = r.write.failed,
                    "job completed"
                ),
                None => tracing::warn!(
                    job = %o.run().job_name,
                    run_id = o.run().run_id,
                    "job failed"
                ),
            }
        }
        return Ok(());
    }

    let handle = spawn_scheduler(
        SchedulerCfg {
            interval_secs: cfg.schedule.interval_secs,
        },
        orch,
        history,
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    tracing::info!("shutting down");
    handle.abort();
    Ok(())
}
