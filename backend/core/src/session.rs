//! Agent session state machine.
//!
//! Folds the ordered event stream of one logical session into an
//! [`AgentSession`]. The machine is `idle -> streaming -> {complete | failed}`;
//! once terminal, every further event is ignored until the caller starts a
//! fresh session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::event::{CompletePayload, StepPayload, StreamEvent};
use crate::types::{AgentStep, BudgetUsage, Citation, SessionMode, SessionPhase, StepStatus};

/// Observable state of one optimization session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentSession {
    pub session_id: String,
    pub mode: SessionMode,
    pub original_input: String,
    pub accumulated_output: String,
    pub steps: Vec<AgentStep>,
    /// Keyed by `Citation::id`, in first-seen order.
    pub citations: Vec<Citation>,
    pub budget: BudgetUsage,
    pub phase: SessionPhase,
    pub progress: u8,
    pub progress_message: Option<String>,
    pub quality_score: Option<f64>,
    pub diff_summary: Vec<Value>,
    pub validation: Option<Value>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// What applying one event did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// State changed.
    Updated,
    /// State changed and the session is now terminal.
    Finished,
    /// The event was not applicable and state is unchanged.
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The session already completed or failed.
    Terminal,
    /// The session has not been started.
    NotStarted,
    /// The event would move a step backwards.
    StepRegression,
    /// Lifecycle and liveness events carry no session state.
    NoEffect,
}

impl AgentSession {
    pub fn new(
        session_id: impl Into<String>,
        mode: SessionMode,
        original_input: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            mode,
            original_input: original_input.into(),
            accumulated_output: String::new(),
            steps: Vec::new(),
            citations: Vec::new(),
            budget: BudgetUsage::default(),
            phase: SessionPhase::Idle,
            progress: 0,
            progress_message: None,
            quality_score: None,
            diff_summary: Vec::new(),
            validation: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// `idle -> streaming`, seeding the mode's pipeline with the first step
    /// active. Returns `false` if the session was not idle.
    pub fn start(&mut self) -> bool {
        if self.phase != SessionPhase::Idle {
            warn!(
                session = %self.session_id,
                phase = ?self.phase,
                "Refusing to start a session that is not idle"
            );
            return false;
        }
        let now = Utc::now();
        self.steps = self
            .mode
            .pipeline()
            .iter()
            .map(|(id, name)| AgentStep::pending(*id, *name))
            .collect();
        if let Some(first) = self.steps.first_mut() {
            first.status = StepStatus::Active;
            first.started_at = Some(now);
        }
        self.phase = SessionPhase::Streaming;
        self.started_at = Some(now);
        debug!(session = %self.session_id, mode = %self.mode, "Session streaming");
        true
    }

    /// Return to `idle`, discarding everything except identity and input.
    pub fn reset(&mut self) {
        *self = AgentSession::new(
            std::mem::take(&mut self.session_id),
            self.mode,
            std::mem::take(&mut self.original_input),
        );
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Apply one dispatched event.
    pub fn apply(&mut self, event: &StreamEvent) -> Applied {
        if self.phase.is_terminal() {
            debug!(
                session = %self.session_id,
                event = event.name(),
                "Ignoring event for terminal session"
            );
            return Applied::Ignored(IgnoreReason::Terminal);
        }
        if event.is_lifecycle() || matches!(event, StreamEvent::Heartbeat) {
            if let StreamEvent::GaveUp { attempts } = event {
                if self.phase == SessionPhase::Streaming {
                    self.fail(format!("connection lost after {attempts} reconnect attempts"));
                    return Applied::Finished;
                }
            }
            return Applied::Ignored(IgnoreReason::NoEffect);
        }
        if self.phase != SessionPhase::Streaming {
            return Applied::Ignored(IgnoreReason::NotStarted);
        }

        match event {
            StreamEvent::Progress(p) => {
                self.progress = p.percent();
                if p.message.is_some() {
                    self.progress_message = p.message.clone();
                }
                Applied::Updated
            }
            StreamEvent::Validation { payload } => {
                self.validation = Some(payload.clone());
                Applied::Updated
            }
            StreamEvent::Step(step) => self.apply_step(step),
            StreamEvent::Token(t) => {
                self.accumulated_output.push_str(&t.text);
                Applied::Updated
            }
            StreamEvent::Citations(c) => {
                self.upsert_citations(&c.citations);
                Applied::Updated
            }
            StreamEvent::Usage(u) => {
                self.budget.merge(&BudgetUsage::from(*u));
                Applied::Updated
            }
            StreamEvent::Complete(done) => {
                self.complete(done);
                Applied::Finished
            }
            StreamEvent::Error(e) => {
                self.fail(e.message.clone());
                Applied::Finished
            }
            _ => Applied::Ignored(IgnoreReason::NoEffect),
        }
    }

    fn apply_step(&mut self, update: &StepPayload) -> Applied {
        let now = Utc::now();
        let (index, appended) = match self.steps.iter().position(|s| s.id == update.id) {
            Some(index) => (index, false),
            None => {
                let name = update.name.clone().unwrap_or_else(|| update.id.clone());
                self.steps.push(AgentStep::pending(update.id.clone(), name));
                (self.steps.len() - 1, true)
            }
        };
        let step = &mut self.steps[index];

        if update.status == step.status && update.duration_ms.is_none() {
            return if appended {
                Applied::Updated
            } else {
                Applied::Ignored(IgnoreReason::NoEffect)
            };
        }
        if update.status != step.status && !step.status.can_advance_to(update.status) {
            debug!(
                step = %step.id,
                from = ?step.status,
                to = ?update.status,
                "Ignoring step regression"
            );
            return Applied::Ignored(IgnoreReason::StepRegression);
        }

        if let Some(name) = &update.name {
            step.name = name.clone();
        }
        if update.status == StepStatus::Active && step.started_at.is_none() {
            step.started_at = Some(now);
        }
        step.status = update.status;
        if let Some(ms) = update.duration_ms {
            step.duration_ms = Some(ms);
        } else if step.status.is_finished() && step.duration_ms.is_none() {
            step.duration_ms = step
                .started_at
                .map(|t| (now - t).num_milliseconds().max(0) as u64);
        }
        Applied::Updated
    }

    fn upsert_citations(&mut self, incoming: &[Citation]) {
        for citation in incoming {
            match self.citations.iter_mut().find(|c| c.id == citation.id) {
                Some(existing) => *existing = citation.clone(),
                None => self.citations.push(citation.clone()),
            }
        }
    }

    fn complete(&mut self, done: &CompletePayload) {
        // Final text is authoritative over whatever tokens were streamed.
        self.accumulated_output = done.optimized.clone();
        self.upsert_citations(&done.citations);
        if let Some(usage) = done.usage {
            self.budget.merge(&BudgetUsage::from(usage));
        }
        self.quality_score = done.quality_score;
        self.diff_summary = done.diff_summary.clone();
        self.progress = 100;
        self.phase = SessionPhase::Complete;
        self.finished_at = Some(Utc::now());
    }

    fn fail(&mut self, message: String) {
        warn!(session = %self.session_id, error = %message, "Session failed");
        self.error = Some(message);
        self.phase = SessionPhase::Failed;
        self.finished_at = Some(Utc::now());
    }
}
