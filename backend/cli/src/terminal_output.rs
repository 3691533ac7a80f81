//! Terminal rendering for streamed sessions.
//!
//! Progress and status go to stderr; only the final result is written to
//! stdout so it can be piped.

use std::io::Write;

use promptcraft_agent::SessionUpdate;
use promptcraft_core::{AgentSession, Applied, StepStatus, StreamEvent};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Honours `NO_COLOR` and dumb terminals.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

fn paint(color: bool, style: &str, text: &str) -> String {
    if color {
        format!("{style}{text}{RESET}")
    } else {
        text.to_string()
    }
}

pub fn note_info(msg: &str) {
    eprintln!("{} {msg}", paint(supports_color(), CYAN, "info:"));
}

pub fn note_warn(msg: &str) {
    eprintln!("{} {msg}", paint(supports_color(), YELLOW, "warn:"));
}

pub fn note_error(msg: &str) {
    eprintln!("{} {msg}", paint(supports_color(), RED, "error:"));
}

/// One status line for an update, or `None` if it is not worth showing.
/// Streamed token text is handled separately by the caller.
pub fn render_update(update: &SessionUpdate, color: bool) -> Option<String> {
    if matches!(update.applied, Applied::Ignored(_)) && !update.event.is_lifecycle() {
        return None;
    }
    let line = match &update.event {
        StreamEvent::Connecting => paint(color, DIM, "connecting..."),
        StreamEvent::Connected => paint(color, DIM, "connected"),
        StreamEvent::Reconnecting { attempt, delay_ms } => paint(
            color,
            YELLOW,
            &format!("connection lost; reconnect #{attempt} in {delay_ms}ms"),
        ),
        StreamEvent::GaveUp { attempts } => paint(
            color,
            RED,
            &format!("giving up after {attempts} reconnect attempts"),
        ),
        StreamEvent::Progress(p) => {
            let message = p.message.as_deref().unwrap_or("");
            format!("[{:>3}%] {message}", update.snapshot.progress)
                .trim_end()
                .to_string()
        }
        StreamEvent::Step(step) => {
            let name = update
                .snapshot
                .steps
                .iter()
                .find(|s| s.id == step.id)
                .map(|s| s.name.as_str())
                .unwrap_or(step.id.as_str());
            format!("{} {name}", step_marker(step.status, color))
        }
        StreamEvent::Citations(c) => format!("{} citation(s) received", c.citations.len()),
        _ => return None,
    };
    Some(line)
}

fn step_marker(status: StepStatus, color: bool) -> String {
    match status {
        StepStatus::Pending => paint(color, DIM, "·"),
        StepStatus::Active => paint(color, CYAN, "▸"),
        StepStatus::Complete => paint(color, GREEN, "✓"),
        StepStatus::Error => paint(color, RED, "✗"),
    }
}

/// Multi-line summary of a finished session.
pub fn render_summary(session: &AgentSession, color: bool) -> String {
    let mut out = String::new();
    for step in &session.steps {
        let duration = step
            .duration_ms
            .map(|ms| format!(" ({ms}ms)"))
            .unwrap_or_default();
        out.push_str(&format!(
            "  {} {}{}\n",
            step_marker(step.status, color),
            step.name,
            paint(color, DIM, &duration)
        ));
    }
    let budget = session.budget_view();
    out.push_str(&format!(
        "  tokens {} in / {} out, credits {:.2}",
        budget.tokens_in, budget.tokens_out, budget.credits_used
    ));
    if budget.credits_max > 0.0 {
        out.push_str(&format!(
            " of {:.2} ({:.0}%)",
            budget.credits_max, budget.percent_used
        ));
    }
    if let Some(score) = session.quality_score {
        out.push_str(&format!(", quality {score:.2}"));
    }
    out.push('\n');
    out
}

/// Write a chunk and flush, for incremental token output.
pub fn stream_write(writer: &mut impl Write, chunk: &str) -> std::io::Result<()> {
    writer.write_all(chunk.as_bytes())?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptcraft_core::{SessionMode, StepPayload};

    fn update(event: StreamEvent, applied: Applied) -> SessionUpdate {
        let mut snapshot = AgentSession::new("s1", SessionMode::Standard, "in");
        snapshot.start();
        snapshot.apply(&event);
        SessionUpdate {
            key: "s1".into(),
            event,
            applied,
            snapshot,
        }
    }

    #[test]
    fn renders_reconnect_line() {
        let u = update(
            StreamEvent::Reconnecting {
                attempt: 2,
                delay_ms: 1500,
            },
            Applied::Ignored(promptcraft_core::IgnoreReason::NoEffect),
        );
        assert_eq!(
            render_update(&u, false).as_deref(),
            Some("connection lost; reconnect #2 in 1500ms")
        );
    }

    #[test]
    fn renders_step_with_pipeline_name() {
        let u = update(
            StreamEvent::Step(StepPayload {
                id: "1".into(),
                status: StepStatus::Complete,
                name: None,
                duration_ms: Some(12),
            }),
            Applied::Updated,
        );
        assert_eq!(render_update(&u, false).as_deref(), Some("✓ analyze"));
    }

    #[test]
    fn ignored_domain_events_are_silent() {
        let u = update(
            StreamEvent::Heartbeat,
            Applied::Ignored(promptcraft_core::IgnoreReason::NoEffect),
        );
        assert_eq!(render_update(&u, false), None);
    }

    #[test]
    fn summary_lists_steps_and_budget() {
        let mut s = AgentSession::new("s1", SessionMode::Standard, "in");
        s.start();
        let text = render_summary(&s, false);
        assert!(text.contains("analyze"));
        assert!(text.contains("tokens 0 in / 0 out"));
    }
}
