use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Outcome of a directory run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryStats {
    pub processed: usize,
    pub failed: usize,
    pub total_questions: usize,
}

impl DirectoryStats {
    pub fn record_success(&mut self, questions: usize) {
        self.processed += 1;
        self.total_questions += questions;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }
}

impl fmt::Display for DirectoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Files processed: {}", self.processed)?;
        writeln!(f, "  Files failed: {}", self.failed)?;
        write!(f, "  Total questions generated: {}", self.total_questions)
    }
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulate() {
        let mut stats = DirectoryStats::default();
        stats.record_success(8);
        stats.record_failure();
        stats.record_success(4);

        assert_eq!(
            stats,
            DirectoryStats {
                processed: 2,
                failed: 1,
                total_questions: 12,
            }
        );
        assert!(stats.to_string().contains("Total questions generated: 12"));
    }
}
