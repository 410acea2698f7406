//! Command handler modules for the fraudgate CLI.
//!
//! Shared utilities used by multiple command paths live here.

pub mod evaluate;
pub mod snapshot;

use anyhow::{Context, Result};
use fg_config::{LoadedConfig, UnusedKeyPolicy};
use serde::de::DeserializeOwned;
use std::fs;

/// Load layered config and run the unused-key guard.
pub fn load_config(paths: &[String], strict: bool) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = fg_config::load_layered_yaml(&path_refs)?;
    let policy = if strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    fg_config::report_unused_keys(&loaded.config_json, policy)?;
    Ok(loaded)
}

pub fn read_json<T: DeserializeOwned>(path: &str, what: &str) -> Result<T> {
    let raw = fs::read(path).with_context(|| format!("read {what} failed: {path}"))?;
    serde_json::from_slice(&raw).with_context(|| format!("parse {what} json failed: {path}"))
}
