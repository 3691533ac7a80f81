//! `promptcraft-core`: domain types, wire events, and the agent session
//! state machine shared by the streaming client crates.

pub mod budget;
pub mod error;
pub mod event;
pub mod session;
pub mod types;

pub use budget::{BudgetTracker, BudgetView};
pub use error::PayloadError;
pub use event::{
    names, CitationsPayload, CompletePayload, ErrorPayload, ProgressPayload, StepPayload,
    StreamEvent, TokenPayload, UsagePayload,
};
pub use session::{AgentSession, Applied, IgnoreReason};
pub use types::{
    AgentStep, BudgetUsage, Citation, ConnectionState, SessionMode, SessionPhase, StepStatus,
};
