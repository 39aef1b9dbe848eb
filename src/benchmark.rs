//! # Timing Reporter
//!
//! Named checkpoints recorded throughout the pipeline. Marks are always
//! cheap to record; rendering only happens when diagnostics were requested.

use std::time::Instant;

/// Append-only sequence of (label, instant) checkpoints.
///
/// Repeated labels append a new checkpoint rather than overwriting, so a
/// phase that runs twice shows up twice in the report.
#[derive(Debug)]
pub struct Benchmark {
    start: Instant,
    marks: Vec<(String, Instant)>,
}

impl Default for Benchmark {
    fn default() -> Self {
        Self::new()
    }
}

impl Benchmark {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            marks: Vec::new(),
        }
    }

    /// Record the current time under `label`.
    pub fn mark(&mut self, label: &str) {
        self.marks.push((label.to_string(), Instant::now()));
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Human-readable ordered report: each label with the time elapsed since
    /// the previous mark (the first relative to construction), plus a total.
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.marks.len() + 1);
        let mut previous = self.start;
        for (label, instant) in &self.marks {
            let elapsed = instant.duration_since(previous);
            lines.push(format!("{:>10.3}ms  {label}", elapsed.as_secs_f64() * 1000.0));
            previous = *instant;
        }
        if let Some((_, last)) = self.marks.last() {
            let total = last.duration_since(self.start);
            lines.push(format!(
                "{:>10.3}ms  total",
                total.as_secs_f64() * 1000.0
            ));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_render_in_order() {
        let mut bench = Benchmark::new();
        bench.mark("first phase");
        bench.mark("second phase");

        let report = bench.render();
        let first = report.find("first phase").unwrap();
        let second = report.find("second phase").unwrap();
        let total = report.find("total").unwrap();
        assert!(first < second);
        assert!(second < total);
    }

    #[test]
    fn test_render_is_nonempty_once_marked() {
        let mut bench = Benchmark::new();
        assert!(bench.is_empty());
        assert_eq!(bench.render(), "");

        bench.mark("all done");
        assert!(!bench.is_empty());
        assert!(!bench.render().is_empty());
    }

    #[test]
    fn test_duplicate_labels_append() {
        let mut bench = Benchmark::new();
        bench.mark("phase");
        bench.mark("phase");
        assert_eq!(bench.render().matches("phase").count(), 2);
    }
}
