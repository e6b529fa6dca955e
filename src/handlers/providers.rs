use axum::{extract::State, response::Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::ProviderKind;
use crate::plugin::{PluginMetadata, ProviderHealth, ProviderMetadata};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProviderEntry {
    #[serde(flatten)]
    pub metadata: ProviderMetadata,
    /// Selected in the persisted configuration
    pub active: bool,
    pub health: Option<ProviderHealth>,
}

#[derive(Debug, Serialize)]
pub struct ActiveProvider {
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub providers: BTreeMap<ProviderKind, Vec<ProviderEntry>>,
    pub active: BTreeMap<ProviderKind, ActiveProvider>,
}

#[derive(Debug, Serialize)]
pub struct PluginEntry {
    #[serde(flatten)]
    pub metadata: PluginMetadata,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct PluginsResponse {
    pub plugins: Vec<PluginEntry>,
}

/// Handler for GET /providers
pub async fn list_providers(State(state): State<Arc<AppState>>) -> Json<ProvidersResponse> {
    let registry = state.runtime.providers();
    let config = state.runtime.store().config();

    let mut providers = BTreeMap::new();
    let mut active = BTreeMap::new();
    for kind in ProviderKind::ALL {
        let selected = config.provider(kind);
        let entries = registry
            .provider_names(kind)
            .into_iter()
            .filter_map(|name| {
                let metadata = registry.metadata(kind, &name)?;
                Some(ProviderEntry {
                    active: name.eq_ignore_ascii_case(&selected.provider_name),
                    health: registry.health(kind, &name),
                    metadata,
                })
            })
            .collect();
        providers.insert(kind, entries);
        active.insert(
            kind,
            ActiveProvider {
                provider: selected.provider_name.clone(),
                model: selected.model.clone(),
            },
        );
    }

    Json(ProvidersResponse { providers, active })
}

/// Handler for GET /plugins
pub async fn list_plugins(State(state): State<Arc<AppState>>) -> Json<PluginsResponse> {
    let registry = state.runtime.plugins();
    let config = state.runtime.store().config();

    let plugins = registry
        .list_available()
        .into_iter()
        .filter_map(|name| {
            let metadata = registry.metadata(&name)?;
            let enabled = config
                .enabled_plugins
                .iter()
                .any(|plugin| plugin.enabled && plugin.plugin_name.eq_ignore_ascii_case(&name));
            Some(PluginEntry { metadata, enabled })
        })
        .collect();

    Json(PluginsResponse { plugins })
}
