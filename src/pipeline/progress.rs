//! Progress and ETA reporting for sequential runs.
//!
//! The estimate is `elapsed / completed * remaining`; no estimate is given
//! before the first subject finishes.

use chrono::{DateTime, Local};
use std::fmt;
use std::time::{Duration, Instant};

/// Remaining time extrapolated from the average time per completed item
pub fn estimate_remaining(elapsed: Duration, completed: usize, remaining: usize) -> Option<Duration> {
    if completed == 0 {
        return None;
    }
    let per_item = elapsed.as_secs_f64() / completed as f64;
    Some(Duration::from_secs_f64(per_item * remaining as f64))
}

/// Render a duration as seconds, minutes, or hours
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs_f64();
    if seconds < 60.0 {
        format!("{seconds:.0}s")
    } else if seconds < 3600.0 {
        format!("{:.1}m", seconds / 60.0)
    } else {
        format!("{:.1}h", seconds / 3600.0)
    }
}

#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    completed: usize,
    started: Instant,
}

/// Point-in-time view of a run's progress
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// 1-based index of the item just finished
    pub completed: usize,
    pub total: usize,
    pub elapsed: Duration,
    pub eta: Option<Duration>,
    /// Wall-clock time at which the run is expected to finish
    pub finish_at: Option<DateTime<Local>>,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Mark one item finished and return the updated snapshot
    pub fn record(&mut self) -> ProgressSnapshot {
        self.completed = (self.completed + 1).min(self.total);
        self.snapshot_at(self.elapsed())
    }

    fn snapshot_at(&self, elapsed: Duration) -> ProgressSnapshot {
        let remaining = self.total - self.completed;
        let eta = estimate_remaining(elapsed, self.completed, remaining);
        let finish_at = eta
            .and_then(|eta| chrono::Duration::from_std(eta).ok())
            .map(|eta| Local::now() + eta);
        ProgressSnapshot {
            completed: self.completed,
            total: self.total,
            elapsed,
            eta,
            finish_at,
        }
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}] elapsed {}",
            self.completed,
            self.total,
            format_duration(self.elapsed)
        )?;
        if let Some(eta) = self.eta {
            write!(f, ", eta {}", format_duration(eta))?;
            if let Some(finish_at) = self.finish_at {
                write!(f, " (done ~{})", finish_at.format("%H:%M"))?;
            }
        }
        Ok(())
    }
}
