// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Cooperative periodic task scheduler
//!
//! Each [`TaskId`] runs at most once per [`Scheduler::tick`], when enabled
//! and its next run time has been reached. Tasks are rescheduled one period
//! after their start time, adjusted by the [`TaskResult::offset`] they return.

use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

use crate::telemetry::Telemetry;

/// Microseconds per millisecond
const US_PER_MS: u64 = 1_000;

/// Scheduled task identifiers, in execution order
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumCount, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum TaskId {
    /// Read and handle protocol commands
    Protocol = 0,
    /// Service the provisioning interface
    Provisioning = 1,
    /// Report and reset telemetry
    Telemetry = 2,
}

impl TaskId {
    /// Default task period in milliseconds
    pub const fn default_period_ms(&self) -> u64 {
        match self {
            TaskId::Protocol => 100,
            TaskId::Provisioning => 50,
            TaskId::Telemetry => 2000,
        }
    }

    /// Slot index for per-task tables
    pub const fn index(&self) -> usize {
        *self as usize
    }
}

/// Task execution result
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct TaskResult {
    pub success: bool,
    /// Signed adjustment (in microseconds) applied to the next run time
    pub offset: i64,
}

impl TaskResult {
    /// Successful execution
    pub const fn ok() -> Self {
        Self {
            success: true,
            offset: 0,
        }
    }

    /// Failed execution
    pub const fn failed() -> Self {
        Self {
            success: false,
            offset: 0,
        }
    }

    /// Set the next run time offset
    pub const fn with_offset(self, offset: i64) -> Self {
        Self {
            success: self.success,
            offset,
        }
    }
}

/// Context passed to task executions
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct TaskContext {
    /// Task start time (microseconds)
    pub now: u64,
    /// Enabled flags, indexed by [`TaskId::index`]
    pub enabled: [bool; TaskId::COUNT],
}

/// [`Clock`] trait provides a monotonic microsecond time source
pub trait Clock {
    fn now_us(&self) -> u64;
}

impl<F: Fn() -> u64> Clock for F {
    fn now_us(&self) -> u64 {
        (self)()
    }
}

/// [`Runner`] trait executes scheduled tasks
pub trait Runner {
    /// Execute the provided task
    fn run(&mut self, task: TaskId, ctx: &TaskContext) -> TaskResult;

    /// Telemetry for recording task executions
    fn telemetry_mut(&mut self) -> &mut Telemetry;
}

#[derive(Copy, Clone, PartialEq, Debug)]
struct Slot {
    period: u64,
    next_run: u64,
    enabled: bool,
}

/// Periodic task [`Scheduler`]
pub struct Scheduler {
    slots: [Slot; TaskId::COUNT],
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create a new scheduler with default task periods, all tasks enabled
    pub fn new() -> Self {
        let mut s = Self {
            slots: [Slot {
                period: 0,
                next_run: 0,
                enabled: true,
            }; TaskId::COUNT],
        };

        for t in TaskId::iter() {
            s.set_period_ms(t, t.default_period_ms());
        }

        s
    }

    /// Set the period for a task
    pub fn set_period_ms(&mut self, task: TaskId, period_ms: u64) {
        self.slots[task.index()].period = period_ms.saturating_mul(US_PER_MS);
    }

    /// Fetch the period (in microseconds) for a task
    pub fn period(&self, task: TaskId) -> u64 {
        self.slots[task.index()].period
    }

    /// Enable or disable a task
    pub fn set_enabled(&mut self, task: TaskId, enabled: bool) {
        self.slots[task.index()].enabled = enabled;
    }

    /// Check whether a task is enabled
    pub fn is_enabled(&self, task: TaskId) -> bool {
        self.slots[task.index()].enabled
    }

    /// Fetch the next run time (in microseconds) for a task
    pub fn next_run(&self, task: TaskId) -> u64 {
        self.slots[task.index()].next_run
    }

    fn enabled(&self) -> [bool; TaskId::COUNT] {
        let mut e = [false; TaskId::COUNT];
        for (e, s) in e.iter_mut().zip(self.slots.iter()) {
            *e = s.enabled;
        }
        e
    }

    /// Run one scheduler pass, returning the number of tasks executed
    pub fn tick<R: Runner, C: Clock>(&mut self, runner: &mut R, clock: &C) -> usize {
        let mut count = 0;

        for task in TaskId::iter() {
            let now = clock.now_us();
            let slot = self.slots[task.index()];

            if !slot.enabled || now < slot.next_run {
                continue;
            }

            let ctx = TaskContext {
                now,
                enabled: self.enabled(),
            };
            let r = runner.run(task, &ctx);

            // Never reschedule prior to the start of this execution
            self.slots[task.index()].next_run = now
                .saturating_add(slot.period)
                .saturating_add_signed(r.offset)
                .max(now);

            let elapsed = clock.now_us().saturating_sub(now);
            runner.telemetry_mut().record_task(task, r.success, elapsed);

            count += 1;
        }

        runner.telemetry_mut().record_loop();

        count
    }
}
