//! JSON output formatting.

use anyhow::Result;
use serde::Serialize;

use tunnelkeeper_core::AttemptRecord;
use tunnelkeeper_tunnel::{CycleOutcome, ProviderInfo};

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for one provider.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOutput<'a> {
    #[serde(flatten)]
    pub info: &'a ProviderInfo,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

/// JSON output for a failover cycle.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleOutput<'a> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u128,
    pub attempts: &'a [AttemptRecord],
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats the provider list. `enabled` holds ids in configured order.
    pub fn format_providers(&self, providers: &[ProviderInfo], enabled: &[String]) -> Result<String> {
        let outputs: Vec<ProviderOutput<'_>> = providers
            .iter()
            .map(|info| {
                let position = enabled.iter().position(|id| *id == info.id);
                ProviderOutput {
                    info,
                    enabled: position.is_some(),
                    position,
                }
            })
            .collect();

        self.format(&outputs)
    }

    /// Formats a cycle outcome.
    pub fn format_cycle(&self, outcome: &CycleOutcome) -> Result<String> {
        let activation = outcome.result.as_ref().ok();
        let output = CycleOutput {
            success: outcome.is_success(),
            provider: activation.map(|a| a.provider_id.as_str()),
            url: activation.map(|a| a.url.as_str()),
            error: outcome.result.as_ref().err().map(ToString::to_string),
            duration_ms: outcome.duration.as_millis(),
            attempts: &outcome.attempts,
        };

        self.format(&output)
    }
}

// ============================================================================
// Tests
// ============================================================================
