use std::time::Instant;

use super::{MetricData, MetricsCollector};

/// Records elapsed wall time, in milliseconds, exactly once
///
/// The measurement is taken when the timer is dropped or explicitly
/// [`stop`](MetricsTimer::stop)ped, whichever comes first. With a session id
/// the value also lands in that session's aggregate.
///
/// ```rust
/// use waav_agent::metrics::MetricsCollector;
///
/// let collector = MetricsCollector::new(10);
/// {
///     let _timer = collector.timer("stt_latency", Some("demo_1"));
///     // ... work ...
/// }
/// assert!(collector.session_metrics("demo_1").unwrap().stt_latency.is_some());
/// ```
pub struct MetricsTimer<'a> {
    collector: &'a MetricsCollector,
    name: String,
    session_id: Option<String>,
    started: Instant,
    recorded: bool,
}

impl<'a> MetricsTimer<'a> {
    pub(super) fn new(
        collector: &'a MetricsCollector,
        name: impl Into<String>,
        session_id: Option<&str>,
    ) -> Self {
        Self {
            collector,
            name: name.into(),
            session_id: session_id.map(str::to_string),
            started: Instant::now(),
            recorded: false,
        }
    }

    /// Milliseconds since the timer started
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// Record now and return the recorded duration
    pub fn stop(mut self) -> f64 {
        self.finish()
    }

    fn finish(&mut self) -> f64 {
        let duration = self.elapsed_ms();
        if self.recorded {
            return duration;
        }
        self.recorded = true;

        match &self.session_id {
            Some(session_id) => {
                self.collector
                    .record_session(session_id, &self.name, duration, "ms")
            }
            None => self
                .collector
                .record(MetricData::new(self.name.clone(), duration)),
        }
        duration
    }
}

impl Drop for MetricsTimer<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_once_on_drop() {
        let collector = MetricsCollector::new(10);
        {
            let _timer = collector.timer("tts_latency", None);
        }
        assert_eq!(collector.query(Some("tts_latency"), None, None).len(), 1);
        assert!(collector.active_sessions().is_empty());
    }

    #[test]
    fn test_stop_does_not_double_record() {
        let collector = MetricsCollector::new(10);
        let timer = collector.timer("llm_latency", Some("s1"));
        std::thread::sleep(std::time::Duration::from_millis(2));
        let ms = timer.stop();

        assert!(ms >= 1.0);
        let recorded = collector.query(Some("llm_latency"), Some("s1"), None);
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].unit, "ms");
        assert_eq!(
            collector.session_metrics("s1").unwrap().llm_latency,
            Some(recorded[0].value)
        );
    }

    #[test]
    fn test_records_on_unwind() {
        let collector = MetricsCollector::new(10);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _timer = collector.timer("total_latency", None);
            panic!("pipeline failed");
        }));
        assert!(result.is_err());
        assert_eq!(collector.len(), 1);
    }
}
