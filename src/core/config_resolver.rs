//! # Default Resolver
//!
//! Merges the global (`~/.nrun.json`) and local (`./.nrun.json`) configuration
//! documents into the effective values for one project path.
//!
//! Precedence, lowest first:
//! 1. global `*` entries, then global entries for the exact project path;
//! 2. local `*` entries, then local entries for the exact project path.
//!
//! `vars` merge additively (local on top). `projects` and `scripts` come from the
//! global document only. `pipes` and manifest overrides are keyed by comma-separated
//! selectors and applied in the order wildcard, exact path, project alias.

use crate::{
    core::config_store::ConfigStore,
    models::{ConfigDocument, ResolvedDefaults, ScopedMap, Selector},
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Where the two configuration layers live.
#[derive(Debug, Clone)]
pub struct ConfigSources {
    pub global: PathBuf,
    pub local: PathBuf,
}

/// A rule whose comma-separated key has been parsed into typed selectors.
#[derive(Debug)]
struct SelectorRule<'a, V> {
    selectors: Vec<Selector>,
    value: &'a V,
}

// --- PUBLIC API ---

/// Resolves the effective defaults for `current_path`.
///
/// A missing or malformed file contributes nothing. When `current_path` is `None`
/// (no project found yet) only the global layer is consulted and only its wildcard
/// entries can match.
pub fn resolve_defaults(
    store: &mut ConfigStore,
    sources: &ConfigSources,
    current_path: Option<&Path>,
) -> ResolvedDefaults {
    let mut resolved = ResolvedDefaults::default();

    // 1. Global layer.
    if let Some(global) = store.read_layer(&sources.global) {
        resolved.vars.extend(global.vars.clone());
        resolved.projects.extend(global.projects.clone());
        resolved.chains.extend(global.scripts.clone());
        merge_layer(&global, current_path, &mut resolved);
    } else {
        log::debug!(
            "No global configuration at '{}', using empty defaults.",
            sources.global.display()
        );
    }

    // 2. Without a project there is nothing local to apply.
    let Some(current) = current_path else {
        return resolved;
    };

    // 3. Local layer.
    if let Some(local) = store.read_layer(&sources.local) {
        log::debug!("Applying local configuration '{}'.", sources.local.display());
        resolved.vars.extend(local.vars.clone());
        merge_layer(&local, Some(current), &mut resolved);
    }

    resolved
}

/// Parses a rule key such as `"/srv/app, @web, *"` into selectors.
///
/// Empty elements and a bare `@` are dropped.
pub fn parse_selectors(key: &str) -> Vec<Selector> {
    key.split(',')
        .map(str::trim)
        .filter_map(|token| {
            if token.is_empty() {
                None
            } else if token == "*" {
                Some(Selector::Wildcard)
            } else if let Some(alias) = token.strip_prefix('@') {
                (!alias.is_empty()).then(|| Selector::ProjectAlias(alias.to_string()))
            } else {
                Some(Selector::ExactPath(PathBuf::from(token)))
            }
        })
        .collect()
}

/// Whether `selector` applies to `current_path` given the registered `projects`.
pub fn selector_matches(
    selector: &Selector,
    current_path: Option<&Path>,
    projects: &BTreeMap<String, String>,
) -> bool {
    match (selector, current_path) {
        (Selector::Wildcard, _) => true,
        (_, None) => false,
        (Selector::ExactPath(path), Some(current)) => path.as_path() == current,
        (Selector::ProjectAlias(alias), Some(current)) => projects
            .get(alias)
            .is_some_and(|registered| !registered.is_empty() && Path::new(registered) == current),
    }
}

// --- LAYER MERGING ---

fn merge_layer(document: &ConfigDocument, current_path: Option<&Path>, resolved: &mut ResolvedDefaults) {
    merge_scoped(&document.path, current_path, &mut resolved.path_defaults);
    merge_scoped(&document.env, current_path, &mut resolved.env_defaults);

    let projects = resolved.projects.clone();

    for stages in matching_values(&document.pipes, current_path, &projects) {
        resolved
            .pipes
            .extend(stages.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    for partial in matching_values(&document.package_json_override, current_path, &projects) {
        merge_manifest_override(partial, &mut resolved.manifest_overrides);
    }
}

/// Seeds `target` from `scoped["*"]`, then overwrites with `scoped[current_path]`.
fn merge_scoped(scoped: &ScopedMap, current_path: Option<&Path>, target: &mut BTreeMap<String, String>) {
    if let Some(wildcard) = scoped.get("*") {
        target.extend(wildcard.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    let Some(current) = current_path else {
        return;
    };
    for (key, values) in scoped {
        if key != "*" && Path::new(key) == current {
            target.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }
}

fn compile_rules<V>(rules: &BTreeMap<String, V>) -> Vec<SelectorRule<'_, V>> {
    rules
        .iter()
        .map(|(key, value)| SelectorRule {
            selectors: parse_selectors(key),
            value,
        })
        .collect()
}

/// Returns the values of every rule that matches, ordered wildcard matches first,
/// then exact paths, then aliases. Later entries win when merged in order.
fn matching_values<'a, V>(
    rules: &'a BTreeMap<String, V>,
    current_path: Option<&Path>,
    projects: &BTreeMap<String, String>,
) -> Vec<&'a V> {
    let mut matched: Vec<(u8, &'a V)> = Vec::new();
    for rule in compile_rules(rules) {
        let mut tiers: Vec<u8> = rule
            .selectors
            .iter()
            .filter(|selector| selector_matches(selector, current_path, projects))
            .map(precedence_tier)
            .collect();
        tiers.sort_unstable();
        tiers.dedup();
        matched.extend(tiers.into_iter().map(|tier| (tier, rule.value)));
    }
    matched.sort_by_key(|(tier, _)| *tier);
    matched.into_iter().map(|(_, value)| value).collect()
}

fn precedence_tier(selector: &Selector) -> u8 {
    match selector {
        Selector::Wildcard => 0,
        Selector::ExactPath(_) => 1,
        Selector::ProjectAlias(_) => 2,
    }
}

fn merge_manifest_override(partial: &Value, target: &mut BTreeMap<String, String>) {
    let Some(scripts) = partial.get("scripts").and_then(Value::as_object) else {
        return;
    };
    for (name, body) in scripts {
        match body.as_str() {
            Some(body) => {
                target.insert(name.clone(), body.to_string());
            }
            None => log::warn!("Ignoring non-string manifest override for script '{}'.", name),
        }
    }
}
