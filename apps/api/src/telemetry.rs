//! Fire-and-forget operational metrics.
//!
//! `AppState` holds an `Arc<dyn TelemetrySink>`. The default sink writes each
//! metric as a structured event on the `telemetry` tracing target, so any
//! subscriber layer can forward them.

use serde::Serialize;
use tracing::info;

pub const PIPELINE_NAMESPACE: &str = "EdTech/ETL";
pub const SEARCH_NAMESPACE: &str = "EdTech/Search";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetricUnit {
    Count,
    Seconds,
}

impl MetricUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricUnit::Count => "Count",
            MetricUnit::Seconds => "Seconds",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: &'static str,
    pub value: f64,
    pub unit: MetricUnit,
}

impl Metric {
    pub fn count(name: &'static str, value: usize) -> Self {
        Self {
            name,
            value: value as f64,
            unit: MetricUnit::Count,
        }
    }

    pub fn seconds(name: &'static str, value: f64) -> Self {
        Self {
            name,
            value,
            unit: MetricUnit::Seconds,
        }
    }
}

/// Emission must never fail the caller.
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, namespace: &str, metrics: &[Metric]);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn emit(&self, namespace: &str, metrics: &[Metric]) {
        for metric in metrics {
            info!(
                target: "telemetry",
                namespace,
                metric = metric.name,
                value = metric.value,
                unit = metric.unit.as_str(),
                "metric"
            );
        }
    }
}

/// Keeps every emitted metric in memory for assertions.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: parking_lot::Mutex<Vec<(String, Metric)>>,
}

#[cfg(test)]
impl RecordingTelemetry {
    pub fn events(&self) -> Vec<(String, Metric)> {
        self.events.lock().clone()
    }

    /// Sum of values recorded under `name`.
    pub fn total(&self, name: &str) -> f64 {
        self.events
            .lock()
            .iter()
            .filter(|(_, m)| m.name == name)
            .map(|(_, m)| m.value)
            .sum()
    }
}

#[cfg(test)]
impl TelemetrySink for RecordingTelemetry {
    fn emit(&self, namespace: &str, metrics: &[Metric]) {
        self.events
            .lock()
            .extend(metrics.iter().map(|m| (namespace.to_string(), m.clone())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_namespace_and_order() {
        let sink = RecordingTelemetry::default();
        sink.emit(
            SEARCH_NAMESPACE,
            &[Metric::count("SearchRequests", 1), Metric::count("SearchResults", 3)],
        );
        sink.emit(SEARCH_NAMESPACE, &[Metric::count("SearchRequests", 1)]);

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].0, "EdTech/Search");
        assert_eq!(events[1].1.name, "SearchResults");
        assert_eq!(sink.total("SearchRequests"), 2.0);
    }

    #[test]
    fn test_tracing_sink_accepts_any_batch() {
        TracingTelemetry.emit(PIPELINE_NAMESPACE, &[]);
        TracingTelemetry.emit(PIPELINE_NAMESPACE, &[Metric::seconds("PipelineExecutionTime", 1.5)]);
    }
}
