//! Parallel job execution with per-job outcome reporting.
//!
//! Jobs are independent: one failing or panicking never aborts the
//! others. Launches are staggered slightly so startup output from
//! concurrent jobs interleaves readably.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::task::JoinSet;

/// Delay between job launches.
const STAGGER: Duration = Duration::from_millis(100);

/// A unit of work the toolkit can run concurrently.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Short name used in outcome reporting.
    fn name(&self) -> &'static str;

    /// Run to completion, returning a human-readable result summary.
    async fn run(&self) -> anyhow::Result<String>;
}

/// What happened to one job.
pub struct JobOutcome {
    pub name: &'static str,
    pub elapsed: Duration,
    pub result: anyhow::Result<String>,
}

impl JobOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run every job concurrently and collect all outcomes.
pub async fn run_all(jobs: Vec<Box<dyn Job>>) -> Vec<JobOutcome> {
    let mut join_set = JoinSet::new();
    for job in jobs {
        join_set.spawn(async move {
            let started = Instant::now();
            let result = job.run().await;
            JobOutcome {
                name: job.name(),
                elapsed: started.elapsed(),
                result,
            }
        });
        tokio::time::sleep(STAGGER).await;
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => outcomes.push(JobOutcome {
                name: "<panicked>",
                elapsed: Duration::ZERO,
                result: Err(anyhow::anyhow!("job panicked: {e}")),
            }),
        }
    }
    outcomes
}
