//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use themesync_core::{OperationOutcome, SyncEvent, Theme};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
#[derive(Debug, Clone, Copy)]
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print the themes of a shop
    pub fn print_themes(&self, themes: &[Theme]) {
        match self.format {
            OutputFormat::Human => {
                if themes.is_empty() {
                    println!("No themes found.");
                    return;
                }
                for theme in themes {
                    println!("{}", theme);
                }
                println!("\n{} theme(s)", themes.len());
            }
            OutputFormat::Json => match serde_json::to_string_pretty(themes) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Failed to serialize themes: {}", e),
            },
            OutputFormat::Quiet => {
                for theme in themes {
                    println!("{}", theme.id);
                }
            }
        }
    }

    /// Print one line of sync progress
    ///
    /// Only human output shows progress; JSON callers get the summary.
    pub fn print_event(&self, event: &SyncEvent) {
        if self.format != OutputFormat::Human {
            return;
        }
        match event {
            SyncEvent::Completed { operation, outcome } => {
                let label = match outcome {
                    OperationOutcome::Downloaded => "Downloaded",
                    OperationOutcome::Unchanged => "Unchanged",
                    OperationOutcome::Uploaded => "Uploaded",
                    OperationOutcome::Deleted => "Deleted",
                    OperationOutcome::AlreadyAbsent => "Already gone",
                };
                println!("  {:<12} {}", label, operation.path);
            }
            SyncEvent::Retrying {
                operation,
                delay,
                message,
            } => {
                eprintln!(
                    "  Retrying     {} in {}ms ({})",
                    operation.path,
                    delay.as_millis(),
                    message
                );
            }
            SyncEvent::Failed(failure) => {
                eprintln!("  Failed       {}", failure);
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (shown even in quiet mode)
    pub fn warn(&self, message: &str) {
        match self.format {
            OutputFormat::Json => {
                eprintln!("{}", serde_json::json!({"status": "warning", "message": message}));
            }
            _ => eprintln!("⚠ {}", message),
        }
    }

    /// Print an error to stderr
    pub fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Json => {
                eprintln!("{}", serde_json::json!({"status": "error", "message": message}));
            }
            _ => eprintln!("{}", message),
        }
    }

    /// Check if we should prompt for input
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_prompting_only_for_humans() {
        assert!(Output::new(OutputFormat::Human).should_prompt());
        assert!(!Output::new(OutputFormat::Json).should_prompt());
        assert!(Output::new(OutputFormat::Json).is_json());
        assert!(!Output::new(OutputFormat::Quiet).is_json());
    }
}
