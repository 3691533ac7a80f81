//! PromptCraft Agent Sessions
//!
//! Caller-facing entry points: start, cancel, observe and reset
//! optimization sessions. Each session is backed by one registry
//! connection whose events are folded into an [`AgentSession`] snapshot.
//!
//! [`AgentSession`]: promptcraft_core::AgentSession

pub mod session_manager;
mod session_pump;

pub use session_manager::{EventCallback, SessionManager, SessionRequest, SessionUpdate};
