use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::AppConfig;

/// Get the default fanline data directory: ~/.fanline
pub fn get_fanline_data_dir() -> Result<PathBuf, ConfigError> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| ConfigError::NoHomeDir)?;
    Ok(PathBuf::from(home).join(".fanline"))
}

pub fn load_default() -> Result<AppConfig, ConfigError> {
    // Priority 1: ~/.fanline/config.toml (highest)
    let data_dir = get_fanline_data_dir()?;
    let user_config = data_dir.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let cfg = if user_config.exists() {
        load_from_path(&user_config)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        AppConfig::default()
    };

    finish(cfg, &data_dir)
}

/// Loads `path` instead of the default lookup; env overrides and validation
/// still apply.
pub fn load_explicit(path: &Path) -> Result<AppConfig, ConfigError> {
    let cfg = load_from_path(path)?;
    finish(cfg, &get_fanline_data_dir()?)
}

fn finish(mut cfg: AppConfig, data_dir: &Path) -> Result<AppConfig, ConfigError> {
    if cfg.logging.file
        && cfg
            .logging
            .directory
            .as_deref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true)
    {
        cfg.logging.directory = Some(data_dir.join("logs").to_string_lossy().to_string());
    }

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    validate(&cfg)?;

    Ok(cfg)
}

pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let display = path.display().to_string();
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    toml::from_str::<AppConfig>(&s).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })
}

/// Environment variable overrides (Priority 0: highest). The first non-empty
/// variable in each list wins.
fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let first = |keys: &[&str]| -> Option<String> {
        keys.iter()
            .filter_map(|k| lookup(k))
            .find(|v| !v.trim().is_empty())
    };

    if let Some(v) = first(&["FANLINE_AUTOMATION_API_KEY", "TINYFISH_API_KEY"]) {
        cfg.automation.api_key = v;
    }
    if let Some(v) = first(&["FANLINE_AUTOMATION_URL"]) {
        cfg.automation.base_url = v;
    }
    if let Some(v) = first(&["FANLINE_LLM_API_KEY", "OPENROUTER_API_KEY"]) {
        cfg.llm.api_key = v;
    }
    if let Some(v) = first(&["FANLINE_LLM_URL"]) {
        cfg.llm.base_url = v;
    }
    if let Some(v) = first(&["GITHUB_TOKEN"]) {
        cfg.search.github.token = v;
    }
    if let Some(v) = first(&["STACKEXCHANGE_KEY"]) {
        cfg.search.stackexchange.key = v;
    }
}

fn validate(cfg: &AppConfig) -> Result<(), ConfigError> {
    if cfg.pipeline.max_tasks == 0 {
        return Err(ConfigError::Invalid {
            field: "pipeline.max_tasks",
            reason: "must be at least 1".into(),
        });
    }
    if cfg.retry.max_attempts == 0 {
        return Err(ConfigError::Invalid {
            field: "retry.max_attempts",
            reason: "must be at least 1".into(),
        });
    }
    if !cfg.search.github.enabled && !cfg.search.stackexchange.enabled {
        return Err(ConfigError::Invalid {
            field: "search",
            reason: "at least one search provider must be enabled".into(),
        });
    }
    Ok(())
}
