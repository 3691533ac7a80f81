//! Structured logging for the PromptCraft client.
//!
//! Console plus daily-rolling JSON file output, credential redaction, and
//! one structured record per session outcome.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{SessionEvent, SessionEventLogger, SessionLogEntry};
pub use logger::init_logger;
pub use redact::{redact_sensitive_data, redact_url};
