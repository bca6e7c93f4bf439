//! Shared configuration helpers for Xend applications
//!
//! All Xend tools keep their settings as JSON files in one directory
//! (~/.config/xend/ on Linux, the platform equivalent elsewhere). This
//! crate owns that directory: resolving paths inside it, creating it on
//! demand, and reading/writing the JSON files it holds.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Bootstrap the Xend config directory, creating it if needed.
/// Call once at application startup.
pub fn init() -> Result<PathBuf> {
    ensure_config_dir()
}

/// The Xend config directory (~/.config/xend/), if the platform has one
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("xend"))
}

/// Resolve a filename inside the Xend config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    Some(config_dir()?.join(filename))
}

/// Whether the named config file exists
pub fn config_exists(filename: &str) -> bool {
    config_path(filename).is_some_and(|p| p.exists())
}

/// Create the config directory if missing and return its path
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine config directory")?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}

/// Read and deserialize a JSON config file by name
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = config_path(filename).context("Could not determine config directory")?;
    load_json_file(&path)
}

/// Read and deserialize a JSON file at an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Serialize a value as pretty JSON into the named config file,
/// creating the config directory if needed
pub fn save_json<T: Serialize>(filename: &str, value: &T) -> Result<()> {
    let path = ensure_config_dir()?.join(filename);
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_paths_live_under_xend_dir() {
        let dir = config_dir().unwrap();
        assert!(dir.ends_with("xend"));
        let path = config_path("settings.json").unwrap();
        assert_eq!(path.parent(), Some(dir.as_path()));
    }

    #[test]
    fn test_load_json_file_round_trip() {
        #[derive(Deserialize)]
        struct Sample {
            name: String,
            count: u32,
        }

        let path = std::env::temp_dir().join(format!("xend-config-test-{}.json", std::process::id()));
        fs::write(&path, r#"{"name":"inbox","count":3}"#).unwrap();

        let sample: Sample = load_json_file(&path).unwrap();
        assert_eq!(sample.name, "inbox");
        assert_eq!(sample.count, 3);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_json_file_missing() {
        let missing = std::env::temp_dir().join("xend-config-does-not-exist.json");
        assert!(load_json_file::<serde_json::Value>(&missing).is_err());
    }
}
