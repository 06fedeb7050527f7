//! App directory discovery.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::manifest::manifest_path;

/// List every sub-directory of `dir` that carries a manifest, sorted by
/// path.
///
/// A missing or unreadable `dir` yields an empty list; the failure is
/// logged.
#[must_use]
pub fn discover_app_dirs(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Cannot scan app directory");
            return Vec::new();
        },
    };

    let mut found: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && manifest_path(path).is_some())
        .collect();
    found.sort();

    debug!(path = %dir.display(), count = found.len(), "Discovered app directories");
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_directories_with_manifests() {
        let root = tempfile::tempdir().unwrap();
        for (name, file) in [("b", "App.toml"), ("a", "package.json")] {
            let dir = root.path().join(name);
            std::fs::create_dir(&dir).unwrap();
            std::fs::write(dir.join(file), if file.ends_with("json") { "{}" } else { "" })
                .unwrap();
        }
        std::fs::create_dir(root.path().join("bare")).unwrap();
        std::fs::write(root.path().join("App.toml"), "").unwrap();

        let found = discover_app_dirs(root.path());
        assert_eq!(found, vec![root.path().join("a"), root.path().join("b")]);
    }

    #[test]
    fn missing_dir_is_empty() {
        let root = tempfile::tempdir().unwrap();
        assert!(discover_app_dirs(&root.path().join("nope")).is_empty());
    }
}
