//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they are only applied to fields
//! that no config file set.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// All supported `APPHOST_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "APPHOST_HOST",
        field_path: "server.host",
    },
    EnvMapping {
        var_name: "APPHOST_PORT",
        field_path: "server.port",
    },
    EnvMapping {
        var_name: "APPHOST_WORKING_DIR",
        field_path: "apps.working_dir",
    },
    EnvMapping {
        var_name: "APPHOST_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "APPHOST_LOG_FORMAT",
        field_path: "logging.format",
    },
];

/// Fields whose env values are coerced to integers.
const INTEGER_FIELDS: &[&str] = &["server.port"];

/// Snapshot all `APPHOST_*` variables from the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("APPHOST_"))
        .collect()
}

/// Apply environment variable fallbacks to fields that were **not** set by
/// any config file layer.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let file_set = sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults);
        if file_set {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );

            set_field_from_string(merged, mapping.field_path, val);
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Set a field in the TOML tree from a string value, creating intermediate
/// tables as needed.
fn set_field_from_string(root: &mut toml::Value, path: &str, val: &str) {
    let toml_val = coerce_to_toml_value(path, val);

    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut current = root;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), toml_val);
    }
}

fn coerce_to_toml_value(path: &str, val: &str) -> toml::Value {
    if INTEGER_FIELDS.contains(&path)
        && let Ok(n) = val.parse::<i64>()
    {
        return toml::Value::Integer(n);
    }
    toml::Value::String(val.to_owned())
}
