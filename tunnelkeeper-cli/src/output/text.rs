//! Text output formatting with colors.

use chrono::{DateTime, Local, Utc};

use tunnelkeeper_core::{AttemptRecord, SessionInfo, TunnelState};
use tunnelkeeper_tunnel::{CycleOutcome, ProviderInfo};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats provider list header.
    pub fn format_providers_header(&self) -> String {
        format!(
            "{:<20} {:<15} {:<12} {:<9} {}",
            self.bold("Provider"),
            self.bold("CLI"),
            self.bold("Binary"),
            self.bold("Timeout"),
            self.bold("Order")
        )
    }

    /// Formats a single provider line. `position` is the zero-based place
    /// in the configured order, `None` when disabled.
    pub fn format_provider_line(&self, info: &ProviderInfo, position: Option<usize>) -> String {
        let installed = if info.available {
            self.green("✓")
        } else {
            self.red("✗")
        };

        let order = match position {
            Some(n) => (n + 1).to_string(),
            None => self.dim("disabled"),
        };

        format!(
            "{:<20} {:<15} {:<12} {:<9} {}",
            format!("{} {}", info.name, installed),
            info.id,
            info.program,
            format!("{}s", info.timeout_secs),
            order
        )
    }

    /// Formats one attempt of a cycle.
    pub fn format_attempt(&self, record: &AttemptRecord) -> String {
        let outcome = if record.outcome.is_success() {
            self.green(record.outcome.label())
        } else {
            self.yellow(record.outcome.label())
        };

        let mut line = format!(
            "{:<15} #{:<2} {:<20} {:>6.1}s",
            record.provider_id,
            record.attempt,
            outcome,
            record.duration.as_secs_f64()
        );
        if let Some(url) = &record.url {
            line.push_str(&format!("  {url}"));
        }
        if let Some(error) = &record.error {
            line.push_str(&format!("  {}", self.dim(error)));
        }
        line
    }

    /// Formats the end result of a cycle.
    pub fn format_cycle_result(&self, outcome: &CycleOutcome) -> String {
        match &outcome.result {
            Ok(activation) => format!(
                "{} {} via {} ({:.1}s)",
                self.green("✓"),
                self.bold(&activation.url),
                activation.provider_id,
                outcome.duration.as_secs_f64()
            ),
            Err(e) => format!("{} {}", self.red("✗"), e),
        }
    }

    /// Formats a status snapshot.
    pub fn format_status(&self, info: &SessionInfo) -> String {
        let mut lines = Vec::new();

        let state = match &info.state {
            TunnelState::Active { .. } => self.green(info.state.label()),
            TunnelState::CoolingDown { .. } | TunnelState::Deactivated => {
                self.yellow(info.state.label())
            }
            TunnelState::Stopped => self.red(info.state.label()),
            _ => info.state.label().to_string(),
        };
        lines.push(format!("State:     {state}"));

        match &info.state {
            TunnelState::Active { provider, url } => {
                lines.push(format!("URL:       {}", self.bold(url)));
                lines.push(format!("Provider:  {provider}"));
            }
            TunnelState::Attempting { provider, attempt } => {
                lines.push(format!("Provider:  {provider} (attempt {attempt})"));
            }
            TunnelState::Verifying { provider, url } => {
                lines.push(format!("Candidate: {url} ({provider})"));
            }
            TunnelState::CoolingDown { until } => {
                lines.push(format!("Next try:  {}", format_time(*until)));
            }
            _ => {}
        }

        if let Some(at) = info.activated_at {
            lines.push(format!("Since:     {}", format_time(at)));
        }
        lines.push(format!("Cycles:    {}", info.cycles));
        if let Some(error) = &info.last_error {
            lines.push(format!("Last error: {}", self.red(error)));
        }
        if let Some(at) = info.updated_at {
            lines.push(self.dim(&format!("Updated {}", format_time(at))));
        }

        lines.join("\n")
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
