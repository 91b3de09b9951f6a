//! Run Context
//!
//! Every workflow run owns a fresh [`RunContext`]: the cursor over the
//! step list and the results accumulated so far. Nothing is shared
//! between runs, so overlapping runs of the same workflow cannot see
//! each other's state and a failed run leaves nothing behind.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::model::WorkflowResult;
use crate::integration::Payload;

/// Timing of a single executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub step: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl StepTiming {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Execution state of one run.
#[derive(Debug)]
pub struct RunContext {
    run_id: String,
    cursor: usize,
    results: Vec<WorkflowResult>,
    timings: Vec<StepTiming>,
    started_at: DateTime<Utc>,
}

impl RunContext {
    /// Starts a run, seeding the trigger payload as the first result.
    pub fn new(trigger: &str, data: Payload) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            cursor: 0,
            results: vec![WorkflowResult::new(trigger, data)],
            timings: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Index of the next step to execute.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Results recorded so far, trigger payload first.
    pub fn results(&self) -> &[WorkflowResult] {
        &self.results
    }

    /// Records a finished step and advances the cursor.
    pub fn record(&mut self, step: &str, output: Payload, started_at: DateTime<Utc>) {
        self.results.push(WorkflowResult::new(step, output));
        self.timings.push(StepTiming {
            step: step.to_string(),
            started_at,
            finished_at: Utc::now(),
        });
        self.cursor += 1;
    }

    /// Consumes the context into its report.
    pub fn finish(self) -> RunReport {
        RunReport {
            run_id: self.run_id,
            results: self.results,
            timings: self.timings,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub results: Vec<WorkflowResult>,
    pub timings: Vec<StepTiming>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Total run time in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
