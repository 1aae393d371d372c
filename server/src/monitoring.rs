use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Sink for batch operation counters.
pub trait PerformanceMonitor: Send + Sync {
    fn register(&self, subsystem: &str, operation: &str, count: u64, unit: &str, elapsed: Duration);
}

/// Running totals for one `(subsystem, operation)` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationTotals {
    pub invocations: u64,
    pub count: u64,
    pub elapsed: Duration,
}

/// Logs every sample through `tracing` and keeps cumulative totals.
#[derive(Debug, Default)]
pub struct LoggingMonitor {
    totals: Mutex<HashMap<(String, String), OperationTotals>>,
}

impl LoggingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn totals(&self, subsystem: &str, operation: &str) -> OperationTotals {
        self.totals
            .lock()
            .map(|t| {
                t.get(&(subsystem.to_string(), operation.to_string()))
                    .copied()
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }
}

impl PerformanceMonitor for LoggingMonitor {
    fn register(&self, subsystem: &str, operation: &str, count: u64, unit: &str, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 { count as f64 / secs } else { 0.0 };
        tracing::info!(
            subsystem,
            operation,
            count,
            unit,
            elapsed_ms = elapsed.as_millis() as u64,
            rate_per_sec = rate,
            "Performance sample"
        );

        match self.totals.lock() {
            Ok(mut totals) => {
                let entry = totals
                    .entry((subsystem.to_string(), operation.to_string()))
                    .or_default();
                entry.invocations += 1;
                entry.count += count;
                entry.elapsed += elapsed;
            }
            Err(_) => tracing::warn!("Performance totals lock poisoned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_accumulate_per_operation() {
        let monitor = LoggingMonitor::new();
        monitor.register("pgn_import", "import", 106, "game", Duration::from_millis(900));
        monitor.register("pgn_import", "import", 101, "game", Duration::from_millis(100));
        monitor.register("robot_recovery", "sweep", 2, "game", Duration::ZERO);

        let import = monitor.totals("pgn_import", "import");
        assert_eq!(import.invocations, 2);
        assert_eq!(import.count, 207);
        assert_eq!(import.elapsed, Duration::from_secs(1));
        assert_eq!(monitor.totals("robot_recovery", "sweep").count, 2);
        assert_eq!(monitor.totals("nothing", "here"), OperationTotals::default());
    }
}
