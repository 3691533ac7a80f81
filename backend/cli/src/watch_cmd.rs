//! `promptcraft watch <ID>`
//!
//! Opens the stream for one session, renders progress to stderr and prints
//! the final optimized prompt to stdout. Ctrl-C cancels cleanly.

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use promptcraft_agent::{EventCallback, SessionManager, SessionRequest, SessionUpdate};
use promptcraft_config::PromptCraftConfig;
use promptcraft_core::{SessionMode, SessionPhase, StreamEvent};
use promptcraft_stream::{Credential, StreamEndpoint};

use crate::terminal_output::{
    note_error, note_warn, render_summary, render_update, stream_write, supports_color,
};

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Session or template id to stream
    pub id: String,

    /// standard, enhanced-fast or enhanced-deep (default from config)
    #[arg(long)]
    pub mode: Option<SessionMode>,

    /// The prompt being optimized, kept with the session for display
    #[arg(long, default_value = "")]
    pub input: String,

    /// Overrides server.baseUrl
    #[arg(long)]
    pub base_url: Option<String>,

    /// Overrides auth.token
    #[arg(long)]
    pub token: Option<String>,

    /// Print the final session snapshot as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Do not echo streamed tokens while waiting
    #[arg(long)]
    pub quiet: bool,
}

pub async fn run(args: WatchArgs, config: &PromptCraftConfig) -> Result<ExitCode> {
    let base_url = args.base_url.as_deref().unwrap_or(config.base_url());
    let endpoint = StreamEndpoint::new(base_url, args.id.clone())
        .with_context(|| format!("Cannot build stream endpoint from '{base_url}'"))?;
    let credential = args
        .token
        .clone()
        .and_then(Credential::new)
        .or_else(|| config.token().and_then(Credential::new));
    if credential.is_none() {
        note_warn("no token configured; connecting unauthenticated");
    }
    let mode = args.mode.unwrap_or_else(|| config.default_mode());

    let manager = SessionManager::http(config.connect_options());
    let request = SessionRequest::new(endpoint, mode, args.input.clone())
        .with_credential(credential);

    let color = supports_color() && std::io::stderr().is_terminal();
    let echo_tokens = !args.quiet && !args.json;
    let on_event: EventCallback = Arc::new(move |update: &SessionUpdate| {
        if let StreamEvent::Token(t) = &update.event {
            if echo_tokens {
                let _ = stream_write(&mut std::io::stderr(), &t.text);
            }
            return;
        }
        if let Some(line) = render_update(update, color) {
            eprintln!("{line}");
        }
    });

    let key = args.id.as_str();
    let mut snapshots = manager
        .start_session(key, request, Some(on_event))
        .await
        .context("Failed to start session")?;
    info!(key, mode = %mode, "Watching session");

    let finished = tokio::select! {
        result = snapshots.wait_for(|s| s.is_terminal()) => result.ok().map(|s| s.clone()),
        _ = tokio::signal::ctrl_c() => None,
    };

    let Some(session) = finished else {
        manager.cancel_session(key).await;
        manager.shutdown().await;
        note_warn("cancelled");
        return Ok(ExitCode::from(130));
    };
    manager.shutdown().await;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&session).context("Failed to serialize session")?
        );
    } else {
        eprintln!();
        eprint!("{}", render_summary(&session, color));
        if session.phase == SessionPhase::Complete {
            println!("{}", session.accumulated_output);
        }
    }

    match session.phase {
        SessionPhase::Complete => Ok(ExitCode::SUCCESS),
        _ => {
            note_error(session.error.as_deref().unwrap_or("session failed"));
            Ok(ExitCode::FAILURE)
        }
    }
}
