//! Validate command for LevelUp.
//!
//! Parses a model document, checks cross-references and prints entity counts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::{Model, ModelSummary};
use crate::util::read_to_string_limited;

/// Options for the validate command.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the validate command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateOutput {
    /// Whether the document is a valid model.
    pub valid: bool,
    /// Path of the validated document.
    pub path: PathBuf,
    /// Entity counts, when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ModelSummary>,
    /// Why the document is invalid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidateOutput {
    fn valid(path: &Path, summary: ModelSummary) -> Self {
        Self {
            valid: true,
            path: path.to_path_buf(),
            summary: Some(summary),
            error: None,
        }
    }

    fn invalid(path: &Path, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            path: path.to_path_buf(),
            summary: None,
            error: Some(error.into()),
        }
    }
}

/// The validate command implementation.
#[derive(Debug, Default)]
pub struct ValidateCommand;

impl ValidateCommand {
    pub fn new() -> Self {
        Self
    }

    /// Validate the model document at `path`.
    pub fn run(&self, path: &Path, _options: &ValidateOptions) -> ValidateOutput {
        let json = match read_to_string_limited(path) {
            Ok(json) => json,
            Err(e) => return ValidateOutput::invalid(path, e.to_string()),
        };

        match Model::from_json(&json) {
            Ok(model) => ValidateOutput::valid(path, model.summary()),
            Err(e) => ValidateOutput::invalid(path, e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ValidateOutput, options: &ValidateOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &ValidateOutput) -> String {
        let path = output.path.display();
        match (&output.summary, &output.error) {
            (Some(s), _) => format!(
                "{} is valid\n  {} world(s), {} level(s), {} score(s), {} gate(s), {} challenge(s), {} reward(s)\n",
                path, s.worlds, s.levels, s.scores, s.gates, s.challenges, s.rewards
            ),
            (None, error) => format!(
                "{} is invalid: {}\n",
                path,
                error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}
