//! Per-stage wall-clock timings for one analysis run.

use std::time::{Duration, Instant};

use serde_json::json;

/// Elapsed time of one named pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTiming {
    pub name: &'static str,
    pub elapsed: Duration,
}

/// Stage timings in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageTimings {
    stages: Vec<StageTiming>,
}

impl StageTimings {
    /// Run `f`, recording its duration under `name`.
    pub fn timed<R>(&mut self, name: &'static str, f: impl FnOnce() -> R) -> R {
        let started = Instant::now();
        let result = f();
        self.record(name, started.elapsed());
        result
    }

    pub fn record(&mut self, name: &'static str, elapsed: Duration) {
        self.stages.push(StageTiming { name, elapsed });
    }

    #[must_use]
    pub fn stages(&self) -> &[StageTiming] {
        &self.stages
    }

    #[must_use]
    pub fn total(&self) -> Duration {
        self.stages.iter().map(|stage| stage.elapsed).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let stages = self
            .stages
            .iter()
            .map(|stage| json!({ "name": stage.name, "elapsed_us": stage.elapsed.as_micros() }))
            .collect::<Vec<_>>();
        json!({ "stages": stages, "total_us": self.total().as_micros() })
    }

    /// Render as a two-column table for terminal output.
    #[must_use]
    pub fn display_table(&self) -> String {
        if self.stages.is_empty() {
            return "No stage timings recorded.".to_string();
        }

        let mut out = String::new();
        out.push_str("stage                         elapsed\n");
        out.push_str("-------------------------------------\n");
        for stage in &self.stages {
            out.push_str(&format!("{:<28} {:>8}\n", stage.name, format_duration(stage.elapsed)));
        }
        out.push_str(&format!("{:<28} {:>8}\n", "total", format_duration(self.total())));
        out
    }
}

fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros();
    if micros >= 1_000_000 {
        format!("{}.{:03}s", micros / 1_000_000, (micros % 1_000_000) / 1_000)
    } else if micros >= 1_000 {
        format!("{}.{:03}ms", micros / 1_000, micros % 1_000)
    } else {
        format!("{micros}µs")
    }
}
