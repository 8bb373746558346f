// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Task and error telemetry
//!
//! Counters accumulate between reports, [`Telemetry::report`] computes
//! per-second rates over the elapsed window then resets all counters.

use core::fmt;

use strum::{EnumCount, IntoEnumIterator};

use crate::{engine::Error, scheduler::TaskId};

/// Initial minimum execution time, replaced on first execution
pub const MIN_TIME_SENTINEL: u64 = 10_000_000;

const RULE: &str =
    "-----------------------------------------------------------------------------";
const SHORT_RULE: &str = "-------------------------------------";

/// Per-task execution statistics
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct TaskStats {
    pub successes: u32,
    pub failures: u32,
    /// Total execution time (microseconds)
    pub total_time: u64,
    pub min_time: u64,
    pub max_time: u64,
}

impl Default for TaskStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStats {
    pub const fn new() -> Self {
        Self {
            successes: 0,
            failures: 0,
            total_time: 0,
            min_time: MIN_TIME_SENTINEL,
            max_time: 0,
        }
    }

    /// Total executions (successes and failures)
    pub fn executions(&self) -> u32 {
        self.successes.saturating_add(self.failures)
    }

    fn record(&mut self, success: bool, elapsed: u64) {
        if success {
            self.successes = self.successes.saturating_add(1);
        } else {
            self.failures = self.failures.saturating_add(1);
        }

        self.total_time = self.total_time.saturating_add(elapsed);
        self.min_time = self.min_time.min(elapsed);
        self.max_time = self.max_time.max(elapsed);
    }
}

/// Telemetry counters
#[derive(Clone, PartialEq, Debug)]
pub struct Telemetry {
    tasks: [TaskStats; TaskId::COUNT],
    loops: u32,
    errors: [u32; Error::COUNT],
    last_report: u64,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry {
    pub const fn new() -> Self {
        Self {
            tasks: [TaskStats::new(); TaskId::COUNT],
            loops: 0,
            errors: [0; Error::COUNT],
            last_report: 0,
        }
    }

    /// Record a task execution
    pub fn record_task(&mut self, task: TaskId, success: bool, elapsed: u64) {
        self.tasks[task.index()].record(success, elapsed);
    }

    /// Record a scheduler pass
    pub fn record_loop(&mut self) {
        self.loops = self.loops.saturating_add(1);
    }

    /// Record an error occurrence
    pub fn record_error(&mut self, e: Error) {
        let c = &mut self.errors[e as usize];
        *c = c.saturating_add(1);
    }

    /// Fetch statistics for a task
    pub fn task(&self, task: TaskId) -> &TaskStats {
        &self.tasks[task.index()]
    }

    /// Fetch the occurrence count for an error
    pub fn errors(&self, e: Error) -> u32 {
        self.errors[e as usize]
    }

    /// Fetch the scheduler pass count
    pub fn loops(&self) -> u32 {
        self.loops
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        self.tasks = [TaskStats::new(); TaskId::COUNT];
        self.loops = 0;
        self.errors = [0; Error::COUNT];
    }

    /// Compute a [`Report`] for the window since the last report, then reset counters
    ///
    /// Disabled tasks are omitted. Rates over an empty window are reported as zero.
    pub fn report(&mut self, now: u64, enabled: &[bool; TaskId::COUNT]) -> Report {
        let elapsed = now.saturating_sub(self.last_report) as f32 / 1e6;

        let rate = |n: u32| {
            if elapsed > 0.0 {
                n as f32 / elapsed
            } else {
                0.0
            }
        };

        let mut tasks = [None; TaskId::COUNT];
        for t in TaskId::iter() {
            if !enabled[t.index()] {
                continue;
            }

            let s = &self.tasks[t.index()];
            let executions = s.executions();

            let (mean_time, ratio, min_time) = match executions {
                0 => (0.0, 0.0, 0),
                n => (
                    s.total_time as f32 / n as f32,
                    s.successes as f32 / n as f32,
                    s.min_time,
                ),
            };

            tasks[t.index()] = Some(TaskReport {
                task: t,
                frequency: rate(s.successes),
                min_time,
                mean_time,
                max_time: s.max_time,
                ratio,
            });
        }

        let mut errors_per_second = [0.0; Error::COUNT];
        for (r, n) in errors_per_second.iter_mut().zip(self.errors.iter()) {
            *r = rate(*n);
        }

        let report = Report {
            elapsed,
            tasks,
            loop_frequency: rate(self.loops),
            errors_per_second,
        };

        self.reset();
        self.last_report = now;

        report
    }
}

/// Computed per-task statistics
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct TaskReport {
    pub task: TaskId,
    /// Successful executions per second
    pub frequency: f32,
    pub min_time: u64,
    pub mean_time: f32,
    pub max_time: u64,
    /// Ratio of successful executions
    pub ratio: f32,
}

/// Computed telemetry report
#[derive(Clone, PartialEq, Debug)]
pub struct Report {
    /// Report window (seconds)
    pub elapsed: f32,
    /// Task statistics, `None` for disabled tasks
    pub tasks: [Option<TaskReport>; TaskId::COUNT],
    /// Scheduler passes per second
    pub loop_frequency: f32,
    /// Error rates, indexed by error code
    pub errors_per_second: [f32; Error::COUNT],
}

impl Report {
    /// Fetch the rate for a given error
    pub fn error_rate(&self, e: Error) -> f32 {
        self.errors_per_second[e as usize]
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<23} | {:>8} | {:>8} | {:>11} | {:>8} | Ratio",
            "Task", "Freq", "Min", "Mean", "Max"
        )?;
        writeln!(f, "{RULE}")?;

        for t in self.tasks.iter().flatten() {
            writeln!(
                f,
                "{:<23} | {:>6.2}Hz | {:>6}us | ~{:>8.2}us | {:>6}us | {:.2}",
                t.task, t.frequency, t.min_time, t.mean_time, t.max_time, t.ratio
            )?;
        }

        writeln!(f, "{RULE}")?;
        writeln!(f, "Loop frequency: {:.2}Hz", self.loop_frequency)?;
        writeln!(f)?;

        writeln!(f, "{:<23} | {:>8}", "Error code", "Count/s")?;
        writeln!(f, "{SHORT_RULE}")?;
        for e in Error::iter() {
            writeln!(f, "{:<23} | {:>5.2}", e.reason(), self.error_rate(e))?;
        }
        write!(f, "{SHORT_RULE}")
    }
}
