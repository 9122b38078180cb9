//! Reset command for LevelUp.
//!
//! Clears persisted progress (gates, completions, level statistics, scores,
//! rewards and challenges). The stored model document is kept.

use serde::{Deserialize, Serialize};

use crate::context::Context;

/// Options for the reset command.
#[derive(Debug, Clone, Default)]
pub struct ResetOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the reset command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetOutput {
    pub success: bool,
    /// Number of persisted keys removed.
    pub keys_removed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The reset command implementation.
#[derive(Debug)]
pub struct ResetCommand {
    ctx: Context,
}

impl ResetCommand {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub fn run(&self, _options: &ResetOptions) -> ResetOutput {
        match self.ctx.progress().clear() {
            Ok(keys_removed) => {
                tracing::info!(keys_removed, "progress reset");
                ResetOutput {
                    success: true,
                    keys_removed,
                    error: None,
                }
            }
            Err(e) => ResetOutput {
                success: false,
                keys_removed: 0,
                error: Some(e.to_string()),
            },
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ResetOutput, options: &ResetOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        if output.success {
            format!("Reset progress ({} key(s) removed)\n", output.keys_removed)
        } else {
            format!(
                "Reset failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}
