// src/ingest/scheduler.rs
//! Periodic trigger. Runs every registered job serially on each tick,
//! feeding each one its previous parameters from the run history.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use metrics::counter;
use tokio::task::JoinHandle;

use crate::ingest::history::RunHistory;
use crate::ingest::orchestrator::{JobOutcome, Orchestrator};
use crate::ingest::run_tracker::{JobParameters, BASE_DATE_KEY};

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub interval_secs: u64,
}

/// Launch one job: read the prior parameters, run, persist the new ones.
/// Failed runs are recorded too so the next run id keeps increasing. A
/// history write failure is logged; the outcome of the run is still returned.
pub async fn run_one(
    orch: &Orchestrator,
    history: &dyn RunHistory,
    job_name: &str,
) -> Result<JobOutcome> {
    let prior = history
        .last_parameters(job_name)
        .await
        .with_context(|| format!("reading run history of `{job_name}`"))?;
    let supplied = JobParameters::new().with(
        BASE_DATE_KEY,
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    );

    let outcome = orch.run_job(job_name, prior.as_ref(), &supplied).await?;

    if let Err(e) = history.record(job_name, &outcome.run().to_parameters()).await {
        tracing::error!(
            target: "scheduler",
            job = %job_name,
            run_id = outcome.run().run_id,
            "run history not recorded: {e:#}"
        );
    }
    Ok(outcome)
}

/// Every registered job once, in name order. A job whose history cannot be
/// read is logged and skipped; the rest still run.
pub async fn run_all_once(orch: &Orchestrator, history: &dyn RunHistory) -> Vec<JobOutcome> {
    let mut out = Vec::new();
    for job_name in orch.registry().job_names() {
        match run_one(orch, history, &job_name).await {
            Ok(outcome) => out.push(outcome),
            Err(e) => tracing::warn!(target: "scheduler", job = %job_name, "job not run: {e:#}"),
        }
    }
    out
}

pub fn spawn_scheduler(
    cfg: SchedulerCfg,
    orch: Arc<Orchestrator>,
    history: Arc<dyn RunHistory>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs.max(1)));
        loop {
            ticker.tick().await;
            let outcomes = run_all_once(&orch, history.as_ref()).await;

            counter!("collector_runs_total").increment(1);
            let completed = outcomes.iter().filter(|o| o.is_completed()).count();
            tracing::info!(
                target: "scheduler",
                jobs = outcomes.len(),
                completed,
                failed = outcomes.len() - completed,
                "collector tick"
            );
        }
    })
}
