use std::collections::HashMap;
use std::time::Instant;

/// Observer for pipeline orchestration events.
///
/// Stages report through this trait so the CLI, tests and future front ends
/// can each watch a run without touching the stage code.
pub trait PipelineLogger: Send {
    /// A frame left the pipeline, either handed off or dropped.
    fn frame_done(&mut self, index: usize);

    /// How long a named stage spent on one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Point-in-time measurement, e.g. faces per frame or queue depth.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-run report. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame_done(&mut self, _index: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running aggregate of one series; constant memory for unbounded streams.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SeriesStats {
    pub count: usize,
    pub total: f64,
    pub max: f64,
}

impl SeriesStats {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
        self.max = self.max.max(value);
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Aggregates stage timings and metrics, reporting through the `log` crate.
///
/// A progress line is logged every `report_every` finished frames.
pub struct StatsPipelineLogger {
    report_every: usize,
    timings: HashMap<String, SeriesStats>,
    metrics: HashMap<String, SeriesStats>,
    start_time: Instant,
    frames_done: usize,
}

impl StatsPipelineLogger {
    pub fn new(report_every: usize) -> Self {
        Self {
            report_every: report_every.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames_done: 0,
        }
    }

    pub fn frames_done(&self) -> usize {
        self.frames_done
    }

    pub fn timing_stats(&self, stage: &str) -> Option<SeriesStats> {
        self.timings.get(stage).copied()
    }

    pub fn metric_stats(&self, name: &str) -> Option<SeriesStats> {
        self.metrics.get(name).copied()
    }

    /// Formatted report, or `None` before anything was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Tracking summary ({} frames, {elapsed_s:.1}s):",
            self.frames_done
        )];

        let mut stages: Vec<_> = self.timings.iter().collect();
        stages.sort_by(|a, b| a.0.cmp(b.0));
        for (stage, stats) in stages {
            lines.push(format!(
                "  {stage:10}: avg {:6.2}ms  max {:7.2}ms  ({} frames)",
                stats.mean(),
                stats.max,
                stats.count
            ));
        }

        let mut names: Vec<_> = self.metrics.iter().collect();
        names.sort_by(|a, b| a.0.cmp(b.0));
        for (name, stats) in names {
            lines.push(format!("  {name}: avg {:.1}  max {:.1}", stats.mean(), stats.max));
        }

        if self.frames_done > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} fps",
                self.frames_done as f64 / elapsed_s
            ));
        }

        Some(lines.join("\n"))
    }
}

impl Default for StatsPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for StatsPipelineLogger {
    fn frame_done(&mut self, index: usize) {
        self.frames_done += 1;
        if self.frames_done % self.report_every == 0 {
            log::info!("{} frames done (latest #{index})", self.frames_done);
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings.entry(stage.to_string()).or_default().record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullPipelineLogger;
        logger.frame_done(1);
        logger.timing("detect", 5.0);
        logger.metric("faces", 1.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_keeps_count_mean_and_max() {
        let mut logger = StatsPipelineLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("annotate", 5.0);

        let detect = logger.timing_stats("detect").unwrap();
        assert_eq!(detect.count, 2);
        assert_relative_eq!(detect.mean(), 25.0);
        assert_relative_eq!(detect.max, 30.0);
        assert_eq!(logger.timing_stats("annotate").unwrap().count, 1);
        assert!(logger.timing_stats("handoff").is_none());
    }

    #[test]
    fn test_metric_mean() {
        let mut logger = StatsPipelineLogger::new(10);
        logger.metric("faces", 3.0);
        logger.metric("faces", 4.0);
        assert_relative_eq!(logger.metric_stats("faces").unwrap().mean(), 3.5);
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = StatsPipelineLogger::new(10);
        for i in 0..4 {
            logger.frame_done(i);
        }
        logger.timing("detect", 10.0);
        logger.timing("equalize", 1.0);
        logger.metric("faces", 2.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Tracking summary (4 frames"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("equalize"));
        assert!(summary.contains("faces: avg 2.0"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_empty_summary_is_none() {
        assert!(StatsPipelineLogger::default().summary_string().is_none());
    }

    #[test]
    fn test_frame_done_counts_every_frame() {
        let mut logger = StatsPipelineLogger::new(3);
        for i in 0..7 {
            logger.frame_done(i);
        }
        assert_eq!(logger.frames_done(), 7);
    }

    #[test]
    fn test_empty_series_mean_is_zero() {
        assert_relative_eq!(SeriesStats::default().mean(), 0.0);
    }
}
