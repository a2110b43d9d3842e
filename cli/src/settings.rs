// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use blockgpt_core::config::Settings;
use dirs::config_dir;
use log::debug;
use std::path::{Path, PathBuf};

/// Settings file looked up in the current directory first.
pub const LOCAL_CONFIG: &str = "blockgpt.yaml";

/// Get the per-user config file path
pub fn config_file_path() -> Result<PathBuf> {
    let config_dir =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
    Ok(config_dir.join("blockgpt").join("config.yaml"))
}

/// Pick the settings file: the explicit path, then `./blockgpt.yaml`, then the user config dir.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Config file '{}' does not exist", path.display());
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Ok(Some(local));
    }

    let user = config_file_path()?;
    Ok(user.exists().then_some(user))
}

/// Load settings for one command. An empty key falls back to `OPENAI_API_KEY`.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let settings = match resolve_config_path(explicit)? {
        Some(path) => {
            debug!("Loading settings from {}", path.display());
            let path_str = path.to_string_lossy();
            Settings::from_yaml(&path_str)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?
        }
        None => {
            debug!("No settings file found, using defaults");
            Settings::default()
        }
    };

    Ok(with_env_api_key(settings, std::env::var("OPENAI_API_KEY").ok()))
}

fn with_env_api_key(settings: Settings, env_key: Option<String>) -> Settings {
    if !settings.openai_key.trim().is_empty() {
        return settings;
    }
    match env_key.filter(|key| !key.trim().is_empty()) {
        Some(key) => settings.with_api_key(key),
        None => settings,
    }
}
