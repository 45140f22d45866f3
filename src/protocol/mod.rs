//! Protocol definitions
//!
//! A protocol is a table of phases, each mapping the signals it recognizes
//! to the state that follows. Definitions are plain data loaded once and
//! shared by reference for the lifetime of a run.
//!
//! ## Example Protocol
//!
//! ```toml
//! name = "tick"
//!
//! [[phases]]
//! id = "implement"
//! [phases.signals]
//! IMPLEMENTED = "verify"
//! BLOCKED = "implement:blocked"
//!
//! [[phases]]
//! id = "verify"
//! [phases.signals]
//! VERIFIED = "complete"
//!
//! [[phases]]
//! id = "complete"
//! ```

pub mod builtin;
pub mod definition;
pub mod state;

pub use builtin::{builtin, BUILTIN_PROTOCOLS};
pub use definition::{Phase, Protocol};
pub use state::PhaseState;

use tracing::debug;

use crate::{Config, Error, Result};

const PROTOCOL_EXTENSIONS: &[&str] = &["toml", "json", "yaml", "yml"];

/// Resolve a protocol by name.
///
/// A file `<protocols_dir>/<name>.<ext>` takes precedence over the
/// built-in protocol of the same name.
pub fn resolve(config: &Config, name: &str) -> Result<Protocol> {
    let dir = config.protocols_dir();

    for ext in PROTOCOL_EXTENSIONS {
        let path = dir.join(format!("{}.{}", name, ext));
        if path.exists() {
            debug!("Loading protocol {} from {:?}", name, path);
            return Protocol::load(&path);
        }
    }

    builtin(name).ok_or_else(|| {
        Error::Protocol(format!(
            "Unknown protocol '{}' (not in {:?} and not built in)",
            name, dir
        ))
    })
}

/// Names of every protocol reachable through [`resolve`]
pub fn available(config: &Config) -> Vec<String> {
    let mut names: Vec<String> = BUILTIN_PROTOCOLS.iter().map(|s| s.to_string()).collect();

    if let Ok(entries) = std::fs::read_dir(config.protocols_dir()) {
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let known = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| PROTOCOL_EXTENSIONS.contains(&e))
                .unwrap_or(false);
            if !known {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !names.iter().any(|n| n == stem) {
                    names.push(stem.to_string());
                }
            }
        }
    }

    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &std::path::Path) -> Config {
        Config {
            protocols_dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let protocol = resolve(&config_in(dir.path()), "tick").unwrap();
        assert_eq!(protocol.name, "tick");
    }

    #[test]
    fn test_file_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("tick.json"),
            r#"{"name": "tick", "phases": [{"id": "only"}]}"#,
        )
        .unwrap();

        let protocol = resolve(&config_in(dir.path()), "tick").unwrap();
        assert_eq!(protocol.phase_ids().collect::<Vec<_>>(), vec!["only"]);
    }

    #[test]
    fn test_resolve_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(&config_in(dir.path()), "nope").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_available_merges_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("custom.yaml"), "name: custom\n").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let names = available(&config_in(dir.path()));
        assert_eq!(names, vec!["bugfix", "custom", "standard", "tick"]);
    }
}
