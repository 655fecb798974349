use anyhow::anyhow;
use async_trait::async_trait;
use forum_tasks::{BackgroundTask, Criticality, TaskContext, TaskError, TaskSchedule};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counts its runs and finishes immediately.
pub struct CountingTask {
    name: &'static str,
    criticality: Criticality,
    schedule: TaskSchedule,
    pub runs: Arc<AtomicUsize>,
}

impl CountingTask {
    pub fn new(name: &'static str, criticality: Criticality, schedule: TaskSchedule) -> Self {
        Self {
            name,
            criticality,
            schedule,
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl BackgroundTask for CountingTask {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Counts how often it runs"
    }

    fn schedule(&self) -> TaskSchedule {
        self.schedule
    }

    fn criticality(&self) -> Criticality {
        self.criticality
    }

    async fn run_once(&self, _ctx: &TaskContext) -> Result<(), TaskError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Takes `work` per run and tracks how many runs overlap.
pub struct SlowTask {
    work: Duration,
    run_period: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: Arc<AtomicUsize>,
    pub runs: Arc<AtomicUsize>,
}

impl SlowTask {
    pub const NAME: &'static str = "slow_task";

    pub fn new(work: Duration, run_period: Duration) -> Self {
        Self {
            work,
            run_period,
            in_flight: AtomicUsize::new(0),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl BackgroundTask for SlowTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Takes a while to finish each run"
    }

    fn schedule(&self) -> TaskSchedule {
        TaskSchedule::intermittent(Duration::ZERO, self.run_period)
    }

    async fn run_once(&self, _ctx: &TaskContext) -> Result<(), TaskError> {
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        tokio::time::sleep(self.work).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Fails every run.
pub struct AlwaysFailingTask {
    run_period: Duration,
    pub attempts: Arc<AtomicUsize>,
}

impl AlwaysFailingTask {
    pub const NAME: &'static str = "always_failing";

    pub fn new(run_period: Duration) -> Self {
        Self {
            run_period,
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl BackgroundTask for AlwaysFailingTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Fails every time it runs"
    }

    fn schedule(&self) -> TaskSchedule {
        TaskSchedule::intermittent(Duration::ZERO, self.run_period)
    }

    async fn run_once(&self, _ctx: &TaskContext) -> Result<(), TaskError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        Err(anyhow!("attempt {} failed", attempt).into())
    }
}
