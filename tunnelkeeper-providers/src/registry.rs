//! Provider registry for managing all provider descriptors.
//!
//! The registry provides static access to all provider configurations
//! and turns the user's provider selection into an ordered pipeline.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use tunnelkeeper_core::{CoreError, ProviderKind, ProviderOverride};
use tunnelkeeper_tunnel::TunnelProvider;

use crate::cloudflared::cloudflared_descriptor;
use crate::command::CommandProvider;
use crate::descriptor::ProviderDescriptor;
use crate::localhost_run::localhost_run_descriptor;
use crate::localtunnel::localtunnel_descriptor;
use crate::pinggy::pinggy_descriptor;
use crate::serveo::serveo_descriptor;

// ============================================================================
// Static Registry
// ============================================================================

/// Static storage for all provider descriptors.
static DESCRIPTORS: OnceLock<Vec<ProviderDescriptor>> = OnceLock::new();

/// Static storage for CLI name to provider kind mapping.
static CLI_NAME_MAP: OnceLock<HashMap<String, ProviderKind>> = OnceLock::new();

/// Initializes all provider descriptors in default priority order.
///
/// SSH based providers come first since `ssh` is nearly always installed.
fn init_descriptors() -> Vec<ProviderDescriptor> {
    vec![
        serveo_descriptor(),
        localhost_run_descriptor(),
        cloudflared_descriptor(),
        pinggy_descriptor(),
        localtunnel_descriptor(),
    ]
}

/// Builds the CLI name to provider kind mapping.
fn build_cli_name_map(descriptors: &[ProviderDescriptor]) -> HashMap<String, ProviderKind> {
    let mut map = HashMap::new();

    for desc in descriptors {
        map.insert(desc.cli.name.to_string(), desc.id);

        for alias in desc.cli.aliases {
            map.insert((*alias).to_string(), desc.id);
        }
    }

    map
}

// ============================================================================
// Provider Registry
// ============================================================================

/// Global registry of all provider descriptors.
pub struct ProviderRegistry;

impl ProviderRegistry {
    /// Returns all provider descriptors in default priority order.
    pub fn all() -> &'static [ProviderDescriptor] {
        DESCRIPTORS.get_or_init(init_descriptors)
    }

    /// Gets a provider descriptor by kind.
    pub fn get(id: ProviderKind) -> Option<&'static ProviderDescriptor> {
        Self::all().iter().find(|d| d.id == id)
    }

    /// Returns the CLI name to provider kind mapping.
    pub fn cli_name_map() -> &'static HashMap<String, ProviderKind> {
        CLI_NAME_MAP.get_or_init(|| build_cli_name_map(Self::all()))
    }

    /// Looks up a provider by CLI name or alias (case-insensitive).
    pub fn get_by_cli_name(name: &str) -> Option<&'static ProviderDescriptor> {
        let kind = Self::cli_name_map().get(&name.trim().to_ascii_lowercase())?;
        Self::get(*kind)
    }

    /// Like [`ProviderRegistry::get_by_cli_name`], but unknown names are errors.
    pub fn resolve(name: &str) -> Result<&'static ProviderDescriptor, CoreError> {
        Self::get_by_cli_name(name).ok_or_else(|| CoreError::UnknownProvider(name.to_string()))
    }

    /// Returns the number of registered providers.
    pub fn count() -> usize {
        Self::all().len()
    }

    /// Returns all provider kinds.
    pub fn kinds() -> Vec<ProviderKind> {
        Self::all().iter().map(|d| d.id).collect()
    }

    /// Resolves a provider order.
    ///
    /// An empty `order` means registry order. Duplicates keep their first
    /// position; names in `disabled` are dropped.
    pub fn ordered(
        order: &[String],
        disabled: &[String],
    ) -> Result<Vec<&'static ProviderDescriptor>, CoreError> {
        let disabled = disabled
            .iter()
            .map(|name| Self::resolve(name).map(|d| d.id))
            .collect::<Result<Vec<_>, _>>()?;

        let mut selected: Vec<&'static ProviderDescriptor> = Vec::new();
        if order.is_empty() {
            selected.extend(Self::all());
        } else {
            for name in order {
                let desc = Self::resolve(name)?;
                if !selected.iter().any(|d| d.id == desc.id) {
                    selected.push(desc);
                }
            }
        }

        selected.retain(|d| !disabled.contains(&d.id));
        Ok(selected)
    }

    /// Builds runnable providers for the given selection.
    ///
    /// `overrides` is keyed by provider name or alias.
    pub fn build(
        order: &[String],
        disabled: &[String],
        overrides: &HashMap<String, ProviderOverride>,
    ) -> Result<Vec<Arc<dyn TunnelProvider>>, CoreError> {
        let mut by_kind = HashMap::new();
        for (name, config) in overrides {
            by_kind.insert(Self::resolve(name)?.id, *config);
        }

        let providers = Self::ordered(order, disabled)?
            .into_iter()
            .map(|desc| {
                let mut provider = CommandProvider::new(desc);
                if let Some(config) = by_kind.get(&desc.id) {
                    provider = provider.with_override(*config);
                }
                Arc::new(provider) as Arc<dyn TunnelProvider>
            })
            .collect::<Vec<_>>();

        debug!(
            providers = ?providers.iter().map(|p| p.id()).collect::<Vec<_>>(),
            "Resolved provider order"
        );
        Ok(providers)
    }
}

/// All built-in providers in default order, without overrides.
pub fn providers() -> Vec<Arc<dyn TunnelProvider>> {
    ProviderRegistry::all()
        .iter()
        .map(|desc| Arc::new(CommandProvider::new(desc)) as Arc<dyn TunnelProvider>)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
