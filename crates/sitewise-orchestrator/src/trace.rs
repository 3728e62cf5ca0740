use chrono::Utc;
use sitewise_core::models::{TraceStatus, TraceStep};
use std::time::Instant;

/// Collects one [`TraceStep`] per orchestration step
#[derive(Debug)]
pub struct TraceRecorder {
    steps: Vec<TraceStep>,
    started: Instant,
    step_started: Instant,
}

impl TraceRecorder {
    pub fn new() -> Self {
        let now = Instant::now();
        Self { steps: Vec::new(), started: now, step_started: now }
    }

    /// Mark the start of the next step's timing window
    pub fn begin(&mut self) {
        self.step_started = Instant::now();
    }

    fn push(&mut self, action: &str, reasoning: &str, status: TraceStatus) -> &mut TraceStep {
        let step = TraceStep {
            step: self.steps.len() as u32 + 1,
            action: action.to_string(),
            reasoning: reasoning.to_string(),
            status,
            duration_ms: self.step_started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
            result: None,
            error: None,
        };
        self.step_started = Instant::now();
        self.steps.push(step);
        let last = self.steps.len() - 1;
        &mut self.steps[last]
    }

    pub fn complete(&mut self, action: &str, reasoning: &str, result: impl Into<String>) {
        let result = result.into();
        tracing::debug!(action, %result, "Step complete");
        self.push(action, reasoning, TraceStatus::Complete).result = Some(result);
    }

    pub fn error(&mut self, action: &str, reasoning: &str, error: impl Into<String>) {
        let error = error.into();
        tracing::debug!(action, %error, "Step failed");
        self.push(action, reasoning, TraceStatus::Error).error = Some(error);
    }

    pub fn skip(&mut self, action: &str, reasoning: &str) {
        self.push(action, reasoning, TraceStatus::Skipped);
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<TraceStep> {
        self.steps
    }
}

impl Default for TraceRecorder {
    fn default() -> Self {
        Self::new()
    }
}
