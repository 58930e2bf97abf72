//! Run report for the `run` command.

use std::time::Duration;

use dispatcher::{DispatchError, MetricsSnapshot};
use observability::TimingsSummary;
use serde::Serialize;

/// Outcome and statistics of one dispatch
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// `"ok"` or `"error"`
    pub outcome: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,

    /// Wall time of `process()`
    pub duration_ms: f64,

    pub parts_handled: u64,
    pub parts_drained: u64,
    pub fields_handled: u64,
    pub fields_ignored: u64,
    pub bytes_drained: u64,
    pub handler_failures: u64,
    pub peak_pending: usize,

    /// Pairs captured by `collect` field routes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldReport>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub handlers: Vec<HandlerReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: &'static str,
    pub status: u16,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldReport {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HandlerReport {
    pub name: String,
    pub calls: u64,
    pub failures: u64,
    pub mean_ms: f64,
    pub max_ms: f64,
}

impl RunReport {
    /// Build a report from a finished dispatch
    pub fn new(
        result: &Result<(), DispatchError>,
        duration: Duration,
        metrics: MetricsSnapshot,
        fields: Vec<(String, String)>,
        timings: &TimingsSummary,
    ) -> Self {
        let error = result.as_ref().err().map(|e| ErrorReport {
            code: e.code(),
            status: e.status_code(),
            message: e.to_string(),
        });

        Self {
            outcome: if error.is_none() { "ok" } else { "error" },
            error,
            duration_ms: duration.as_secs_f64() * 1000.0,
            parts_handled: metrics.parts_handled,
            parts_drained: metrics.parts_drained,
            fields_handled: metrics.fields_handled,
            fields_ignored: metrics.fields_ignored,
            bytes_drained: metrics.bytes_drained,
            handler_failures: metrics.handler_failures,
            peak_pending: metrics.peak_pending,
            fields: fields
                .into_iter()
                .map(|(key, value)| FieldReport { key, value })
                .collect(),
            handlers: timings
                .handlers
                .iter()
                .map(|h| HandlerReport {
                    name: h.name.clone(),
                    calls: h.duration_ms.count,
                    failures: h.failures,
                    mean_ms: h.duration_ms.mean,
                    max_ms: h.duration_ms.max,
                })
                .collect(),
        }
    }

    /// Whether the dispatch succeeded
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Dispatch Report                          ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Outcome: {}", self.outcome);
        if let Some(ref error) = self.error {
            println!(
                "   ├─ Error: {} ({}, status {})",
                error.message, error.code, error.status
            );
        }
        println!("   ├─ Duration: {:.2}ms", self.duration_ms);
        println!("   ├─ Parts handled: {}", self.parts_handled);
        println!(
            "   ├─ Parts drained: {} ({} bytes)",
            self.parts_drained, self.bytes_drained
        );
        println!(
            "   ├─ Fields handled / ignored: {} / {}",
            self.fields_handled, self.fields_ignored
        );
        println!("   └─ Peak concurrent handlers: {}", self.peak_pending);

        if !self.handlers.is_empty() {
            println!("\n⏱  Handlers");
            for (i, handler) in self.handlers.iter().enumerate() {
                let prefix = if i == self.handlers.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {}: {} calls, {} failed, mean {:.2}ms, max {:.2}ms",
                    prefix,
                    handler.name,
                    handler.calls,
                    handler.failures,
                    handler.mean_ms,
                    handler.max_ms
                );
            }
        }

        if !self.fields.is_empty() {
            println!("\n📝 Collected Fields");
            for (i, field) in self.fields.iter().enumerate() {
                let prefix = if i == self.fields.len() - 1 { "└─" } else { "├─" };
                println!("   {} {} = {}", prefix, field.key, field.value);
            }
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use observability::HandlerTimings;

    #[test]
    fn test_report_from_success() {
        let mut timings = HandlerTimings::new();
        timings.record("avatar", 3.0, true);
        let metrics = MetricsSnapshot {
            parts_handled: 1,
            ..Default::default()
        };

        let report = RunReport::new(
            &Ok(()),
            Duration::from_millis(5),
            metrics,
            vec![("title".to_string(), "hi".to_string())],
            &timings.summary(),
        );

        assert!(report.is_ok());
        assert_eq!(report.outcome, "ok");
        assert_eq!(report.handlers[0].calls, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["fields"][0]["key"], "title");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_report_from_failure() {
        let result = Err(DispatchError::handler("avatar", "disk full".into()));
        let report = RunReport::new(
            &result,
            Duration::ZERO,
            MetricsSnapshot::default(),
            Vec::new(),
            &TimingsSummary::default(),
        );

        assert!(!report.is_ok());
        let error = report.error.unwrap();
        assert_eq!(error.code, "E_HANDLER_FAILED");
        assert_eq!(error.message, "disk full");
    }
}
