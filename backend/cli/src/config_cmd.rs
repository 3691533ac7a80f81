//! `promptcraft config`

use std::process::ExitCode;

use anyhow::{Context, Result};

use promptcraft_config::{redact, validate, PromptCraftConfig};

use crate::terminal_output::{note_error, note_info, note_warn};

pub fn run(config: &PromptCraftConfig, run_validation: bool) -> Result<ExitCode> {
    let value = serde_json::to_value(config).context("Failed to serialize config")?;
    let yaml = serde_yaml::to_string(&redact(&value)).context("Failed to render config")?;
    print!("{yaml}");

    if !run_validation {
        return Ok(ExitCode::SUCCESS);
    }
    let report = validate(config);
    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }
    if report.is_valid() {
        note_info("config is valid");
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
