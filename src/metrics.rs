use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all task engine metrics
const PREFIX: &str = "forum_tasks";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref TASK_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_task_runs_total"), "Total number of background task runs"),
        &["task", "status"]
    ).expect("Failed to create task_runs_total metric");

    pub static ref TASK_RUN_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_task_run_duration_seconds"),
            "Background task run duration in seconds"
        )
        .buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0]),
        &["task"]
    ).expect("Failed to create task_run_duration_seconds metric");

    pub static ref TASK_RUNNING: GaugeVec = GaugeVec::new(
        Opts::new(
            format!("{PREFIX}_task_running"),
            "Whether a background task is currently running"
        ),
        &["task"]
    ).expect("Failed to create task_running metric");
}

/// Register all metrics with the registry
pub fn init_metrics() {
    let _ = REGISTRY.register(Box::new(TASK_RUNS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(TASK_RUN_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(TASK_RUNNING.clone()));
}

/// Record a finished task run
pub fn record_task_run(task: &str, status: &str, duration: Duration) {
    TASK_RUNS_TOTAL.with_label_values(&[task, status]).inc();
    TASK_RUN_DURATION_SECONDS
        .with_label_values(&[task])
        .observe(duration.as_secs_f64());
}

/// Flag a task as running or idle
pub fn set_task_running(task: &str, running: bool) {
    TASK_RUNNING
        .with_label_values(&[task])
        .set(if running { 1.0 } else { 0.0 });
}

/// Render all registered metrics in the Prometheus text format
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => String::from_utf8(buffer).unwrap_or_default(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            String::new()
        }
    }
}
