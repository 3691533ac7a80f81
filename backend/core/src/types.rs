use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of one physical stream connection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Connected,
    #[default]
    Disconnected,
    Erroring,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Erroring => "erroring",
        };
        f.write_str(s)
    }
}

/// Optimization mode requested by the caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    #[default]
    Standard,
    EnhancedFast,
    EnhancedDeep,
}

impl SessionMode {
    /// The fixed pipeline a session in this mode is seeded with, as
    /// `(step id, step name)` pairs in server order.
    pub fn pipeline(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            SessionMode::Standard => &[
                ("1", "analyze"),
                ("2", "optimize"),
                ("3", "finalize"),
            ],
            SessionMode::EnhancedFast => &[
                ("1", "analyze"),
                ("2", "retrieve"),
                ("3", "optimize"),
                ("4", "finalize"),
            ],
            SessionMode::EnhancedDeep => &[
                ("1", "analyze"),
                ("2", "retrieve"),
                ("3", "critique"),
                ("4", "optimize"),
                ("5", "validate"),
                ("6", "finalize"),
            ],
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionMode::Standard => "standard",
            SessionMode::EnhancedFast => "enhanced-fast",
            SessionMode::EnhancedDeep => "enhanced-deep",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(SessionMode::Standard),
            "enhanced-fast" => Ok(SessionMode::EnhancedFast),
            "enhanced-deep" => Ok(SessionMode::EnhancedDeep),
            other => Err(format!(
                "unknown mode `{other}` (expected standard, enhanced-fast or enhanced-deep)"
            )),
        }
    }
}

/// Where a session is in its lifetime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Streaming,
    Complete,
    Failed,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Complete | SessionPhase::Failed)
    }
}

/// Status of a pipeline step. Transitions only move forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Active,
    Complete,
    Error,
}

impl StepStatus {
    fn rank(&self) -> u8 {
        match self {
            StepStatus::Pending => 0,
            StepStatus::Active => 1,
            StepStatus::Complete | StepStatus::Error => 2,
        }
    }

    /// Whether moving from `self` to `next` is a forward transition.
    pub fn can_advance_to(&self, next: StepStatus) -> bool {
        next.rank() > self.rank()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, StepStatus::Complete | StepStatus::Error)
    }
}

/// One step of the server-side optimization pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentStep {
    pub id: String,
    pub name: String,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
}

impl AgentStep {
    pub fn pending(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: StepStatus::Pending,
            started_at: None,
            duration_ms: None,
        }
    }
}

/// A knowledge-source reference returned by the optimization backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub snippet: String,
    #[serde(default, alias = "type")]
    pub kind: String,
}

impl Citation {
    /// Clamp the score into `[0, 1]`; NaN becomes 0.
    pub fn normalized(mut self) -> Self {
        self.score = if self.score.is_nan() {
            0.0
        } else {
            self.score.clamp(0.0, 1.0)
        };
        self
    }
}

/// Resource usage reported by the server. Never decreases within a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUsage {
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub credits_used: f64,
    pub credits_max: f64,
}

impl BudgetUsage {
    /// Fold a newer report into this one, keeping every field monotonic.
    pub fn merge(&mut self, newer: &BudgetUsage) {
        self.tokens_in = self.tokens_in.max(newer.tokens_in);
        self.tokens_out = self.tokens_out.max(newer.tokens_out);
        self.credits_used = self.credits_used.max(newer.credits_used);
        self.credits_max = self.credits_max.max(newer.credits_max);
    }
}
