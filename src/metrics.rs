use std::time::{Duration, Instant};
use tracing::{info, warn};

pub struct Timer {
    start: Instant,
    operation: String,
    threshold_warn: Duration,
    threshold_error: Duration,
}

impl Timer {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            operation: operation.into(),
            threshold_warn: Duration::from_millis(100),
            threshold_error: Duration::from_millis(500),
        }
    }
    pub fn with_thresholds(mut self, warn_ms: u64, error_ms: u64) -> Self {
        self.threshold_warn = Duration::from_millis(warn_ms);
        self.threshold_error = Duration::from_millis(error_ms);
        self
    }
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
    pub fn log_elapsed(&self, additional_context: Option<&str>) {
        let elapsed = self.elapsed();
        let elapsed_ms = elapsed.as_millis();
        let context = if let Some(ctx) = additional_context {
            format!("{} ({})", self.operation, ctx)
        } else {
            self.operation.clone()
        };
        if elapsed > self.threshold_error {
            warn!(operation = %context, duration_ms = %elapsed_ms, "Operation exceeded error threshold");
        } else if elapsed > self.threshold_warn {
            warn!(operation = %context, duration_ms = %elapsed_ms, "Operation exceeded warning threshold");
        } else {
            info!(operation = %context, duration_ms = %elapsed_ms, "Operation completed");
        }
    }
}

pub fn create_db_span(operation: &str, collection: &str) -> tracing::Span {
    tracing::span!(
        tracing::Level::DEBUG,
        "database",
        operation = operation,
        collection = collection,
        db_type = "mongodb"
    )
}

pub async fn time_db_operation<F, T, E>(operation: &str, collection: &str, f: F) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let timer = Timer::new(format!("db::{}", operation)).with_thresholds(50, 200);
    let span = create_db_span(operation, collection);
    let _guard = span.enter();
    let result = f.await;
    timer.log_elapsed(Some(collection));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_result_through() {
        let ok: Result<u32, std::io::Error> =
            time_db_operation("find", "migration_versions", async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);
    }

    #[test]
    fn timer_measures_something() {
        let timer = Timer::new("noop").with_thresholds(1_000, 2_000);
        assert!(timer.elapsed() < Duration::from_secs(1));
    }
}
