//! Confirmation Prompts
//!
//! The only interactive gates in the lifecycle: the pre-flight summary
//! before a run starts and the confirmation before a clean.

use std::io;
use std::path::PathBuf;

use colored::*;
use dialoguer::Confirm;
use log::debug;

use crate::config::Parameters;
use crate::error::{Result, SeisflowsError};

/// Keys shown in the pre-flight summary, in display order.
const SUMMARY_KEYS: &[&str] = &[
    "WORKFLOW",
    "BEGIN",
    "END",
    "RESUME_FROM",
    "STOP_AFTER",
    "NTASK",
    "WALLTIME",
    "CASE",
];

/// Asks the user a yes/no question.
pub trait Prompt {
    /// Returns true when the user agreed to `message`.
    fn confirm(&mut self, message: &str) -> Result<bool>;
}

/// Asks on the terminal, defaulting to "no".
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn confirm(&mut self, message: &str) -> Result<bool> {
        Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
            .map_err(|e| {
                SeisflowsError::io("read confirmation", io::Error::other(e))
            })
    }
}

/// Agrees to everything; used for `--yes`.
#[derive(Debug, Default)]
pub struct AssumeYes;

impl Prompt for AssumeYes {
    fn confirm(&mut self, message: &str) -> Result<bool> {
        debug!("Assuming yes: {}", message.lines().last().unwrap_or(message));
        Ok(true)
    }
}

fn display(parameters: &Parameters, key: &str) -> String {
    match parameters.get(key) {
        Some(value) if !value.is_unset() => value.to_string(),
        _ => "None".to_string(),
    }
}

/// Summary of the settings that most affect a run, shown before it starts.
///
/// Reads the raw parameter file so unset keys show as `None`.
pub fn preflight_summary(parameters: &Parameters) -> String {
    let title = display(parameters, "TITLE");
    let mut summary = format!("\nBeginning workflow \"{}\"...\n", title.bold());

    for key in SUMMARY_KEYS {
        summary.push_str(&format!(
            "    {:<12} {}\n",
            format!("{}:", key),
            display(parameters, key).cyan()
        ));
    }
    summary.push_str(&format!(
        "    {:<12} {}, {}\n",
        "SMOOTH H,V:",
        display(parameters, "SMOOTH_H").cyan(),
        display(parameters, "SMOOTH_V").cyan()
    ));

    summary.push_str("Continue?");
    summary
}

/// The message printed when required paths are missing.
pub fn missing_paths_report(missing: &[PathBuf]) -> String {
    let mut report = format!("\n{}\n\n", "The following paths do not exist:".red().bold());
    for path in missing {
        report.push_str(&format!("\t{}\n", path.display()));
    }
    report
}

/// Confirmation text for `clean`.
pub fn clean_message() -> String {
    format!(
        "\nThis will remove all workflow objects, leaving only the parameter file.\n{}",
        "Are you sure you want to clean?".yellow()
    )
}
