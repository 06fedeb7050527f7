//! Deep merge of TOML values with per-field source tracking.
//!
//! The merge operates on raw [`toml::Value`] trees rather than deserialized
//! structs. This correctly handles "absent vs default": a missing key in a
//! TOML table will not override the base layer.

use std::collections::HashMap;

/// Which configuration layer a value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults (`defaults.toml`).
    Defaults,
    /// User-level configuration (`~/.apphost/config.toml`).
    User,
    /// Workspace-level configuration (`{workspace}/.apphost/config.toml`).
    Workspace,
    /// Environment variable fallback.
    Environment,
}

impl std::fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::User => write!(f, "user (~/.apphost/config.toml)"),
            Self::Workspace => write!(f, "workspace (.apphost/config.toml)"),
            Self::Environment => write!(f, "environment variable"),
        }
    }
}

/// Tracks which layer set each field's value.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// Deep-merge `overlay` into `base`, recording which layer set each leaf
/// field.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
///
/// `prefix` is the dotted path prefix (e.g. `"server"`).
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };

                if let Some(base_val) = base_table.get_mut(key) {
                    if overlay_val.is_table() {
                        deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                    } else {
                        *base_val = overlay_val.clone();
                        sources.insert(path, layer.clone());
                    }
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                    record_leaves(overlay_val, &path, layer, sources);
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            sources.insert(prefix.to_owned(), layer.clone());
        },
    }
}

/// Walk a value tree and record all leaf paths with their source layer.
pub fn record_leaves(val: &toml::Value, prefix: &str, layer: &ConfigLayer, sources: &mut FieldSources) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            record_leaves(child, &path, layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn overlay_replaces_scalars_and_keeps_siblings() {
        let mut base = parse("[server]\nhost = \"127.0.0.1\"\nport = 3000\n");
        let overlay = parse("[server]\nport = 8080\n");
        let mut sources = FieldSources::new();

        deep_merge_tracking(&mut base, &overlay, "", &ConfigLayer::User, &mut sources);

        assert_eq!(base["server"]["port"].as_integer(), Some(8080));
        assert_eq!(base["server"]["host"].as_str(), Some("127.0.0.1"));
        assert_eq!(sources.get("server.port"), Some(&ConfigLayer::User));
        assert!(!sources.contains_key("server.host"));
    }

    #[test]
    fn arrays_are_replaced_not_appended() {
        let mut base = parse("[apps]\nautoload = [\"a\", \"b\"]\n");
        let overlay = parse("[apps]\nautoload = [\"c\"]\n");
        let mut sources = FieldSources::new();

        deep_merge_tracking(&mut base, &overlay, "", &ConfigLayer::Workspace, &mut sources);

        let autoload = base["apps"]["autoload"].as_array().unwrap();
        assert_eq!(autoload.len(), 1);
        assert_eq!(sources.get("apps.autoload"), Some(&ConfigLayer::Workspace));
    }

    #[test]
    fn new_tables_record_all_leaves() {
        let mut base = parse("[server]\nport = 1\n");
        let overlay = parse("[storage]\ndocuments_dir = \"docs\"\napp_data_dir = \"data\"\n");
        let mut sources = FieldSources::new();

        deep_merge_tracking(&mut base, &overlay, "", &ConfigLayer::User, &mut sources);

        assert_eq!(sources.get("storage.documents_dir"), Some(&ConfigLayer::User));
        assert_eq!(sources.get("storage.app_data_dir"), Some(&ConfigLayer::User));
    }
}
