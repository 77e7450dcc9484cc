//! Per-stage wall clock timing for the map pipeline
//!
//! Lines go to stderr so they never mix with the progress messages on stdout.

use std::time::{Duration, Instant};

/// Times consecutive pipeline stages
#[derive(Debug)]
pub struct StageTimer {
    stage_start: Instant,
    stages: Vec<(String, Duration)>,
}

impl StageTimer {
    pub fn new() -> Self {
        Self {
            stage_start: Instant::now(),
            stages: Vec::new(),
        }
    }

    /// Close the current stage under `stage` and start timing the next one
    pub fn finish(&mut self, stage: &str) -> Duration {
        let elapsed = self.stage_start.elapsed();
        eprintln!("TIMEPROF: {} [{:.3}s]", stage, elapsed.as_secs_f64());
        self.stages.push((stage.to_string(), elapsed));
        self.stage_start = Instant::now();
        elapsed
    }

    /// Stages finished so far, in order
    pub fn stages(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|(name, _)| name.as_str())
    }

    pub fn total(&self) -> Duration {
        self.stages.iter().map(|(_, d)| *d).sum()
    }
}

impl Default for StageTimer {
    fn default() -> Self {
        Self::new()
    }
}
