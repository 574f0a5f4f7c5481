//! Named periodic tasks on a millisecond clock.
//!
//! The scheduler owns no timer. The application loop (or a test) passes
//! the current time to [`PeriodicTasks::due`], which returns the tasks
//! whose period has elapsed. A task fires at most once per call, however
//! far the clock jumped, and its next deadline is `now + period`.

use std::fmt;

use crate::config::ScheduleConfig;

/// Every periodic activity of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    /// Drain one queued TR request.
    TrDispatch,
    /// Drain one queued order.
    OrderDispatch,
    /// Queue an account snapshot request.
    AccountSync,
    /// Queue an unfilled-orders request.
    UnfilledQuery,
    /// Amend sells past the unfilled timeout.
    UnfilledSweep,
    /// Drop entries without usable levels.
    OutlierSweep,
    /// Save watchlist and settings.
    Persist,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrDispatch => "tr_dispatch",
            Self::OrderDispatch => "order_dispatch",
            Self::AccountSync => "account_sync",
            Self::UnfilledQuery => "unfilled_query",
            Self::UnfilledSweep => "unfilled_sweep",
            Self::OutlierSweep => "outlier_sweep",
            Self::Persist => "persist",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct Task {
    kind: TaskKind,
    period_ms: u64,
    next_due_ms: u64,
}

/// Periodic task table.
#[derive(Debug, Clone, Default)]
pub struct PeriodicTasks {
    tasks: Vec<Task>,
}

impl PeriodicTasks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the engine's task table. Every task first fires one period
    /// after `start_ms`.
    #[must_use]
    pub fn from_schedule(schedule: &ScheduleConfig, start_ms: u64) -> Self {
        let mut tasks = Self::new();
        tasks.add(TaskKind::TrDispatch, schedule.tr_dispatch_ms, start_ms);
        tasks.add(TaskKind::OrderDispatch, schedule.order_dispatch_ms, start_ms);
        tasks.add(TaskKind::AccountSync, schedule.account_sync_ms, start_ms);
        tasks.add(TaskKind::UnfilledQuery, schedule.unfilled_query_ms, start_ms);
        tasks.add(TaskKind::UnfilledSweep, schedule.unfilled_sweep_ms, start_ms);
        tasks.add(TaskKind::OutlierSweep, schedule.outlier_sweep_ms, start_ms);
        tasks.add(TaskKind::Persist, schedule.persist_ms, start_ms);
        tasks
    }

    /// Add or replace a task. A zero period is treated as 1 ms.
    pub fn add(&mut self, kind: TaskKind, period_ms: u64, start_ms: u64) {
        let period_ms = period_ms.max(1);
        self.tasks.retain(|t| t.kind != kind);
        self.tasks.push(Task {
            kind,
            period_ms,
            next_due_ms: start_ms.saturating_add(period_ms),
        });
    }

    pub fn period(&self, kind: TaskKind) -> Option<u64> {
        self.tasks.iter().find(|t| t.kind == kind).map(|t| t.period_ms)
    }

    /// Tasks due at `now_ms`, in registration order.
    pub fn due(&mut self, now_ms: u64) -> Vec<TaskKind> {
        let mut fired = Vec::new();
        for task in &mut self.tasks {
            if now_ms >= task.next_due_ms {
                task.next_due_ms = now_ms.saturating_add(task.period_ms);
                fired.push(task.kind);
            }
        }
        fired
    }

    /// Earliest deadline across all tasks.
    pub fn next_due(&self) -> Option<u64> {
        self.tasks.iter().map(|t| t.next_due_ms).min()
    }
}
