//! Config file discovery and loading.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::IntrachatConfig};

const CONFIG_FILENAME: &str = "intrachat.toml";

/// Load config from the given path.
pub fn load_config(path: &Path) -> anyhow::Result<IntrachatConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    let config = toml::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;
    Ok(config)
}

/// Discover and load config from standard locations, then apply
/// environment overrides.
///
/// Search order:
/// 1. `./intrachat.toml` (project-local)
/// 2. `~/.config/intrachat/intrachat.toml` (user-global)
///
/// Returns defaults when no config file is found or the file fails to
/// parse.
pub fn discover_and_load() -> IntrachatConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            match load_config(&path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                    IntrachatConfig::default()
                },
            }
        },
        None => {
            debug!("no config file found, using defaults");
            IntrachatConfig::default()
        },
    };
    apply_env_overrides(&mut config);
    config
}

/// `INTRACHAT_BIND` and `INTRACHAT_PORT` (or the conventional `PORT`)
/// override the file values.
pub fn apply_env_overrides(config: &mut IntrachatConfig) {
    if let Ok(bind) = std::env::var("INTRACHAT_BIND") {
        config.gateway.bind = bind;
    }
    let port = std::env::var("INTRACHAT_PORT").or_else(|_| std::env::var("PORT"));
    if let Ok(raw) = port {
        match raw.parse() {
            Ok(port) => config.gateway.port = port,
            Err(_) => warn!(value = %raw, "ignoring non-numeric port override"),
        }
    }
}

fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Some(local);
    }
    if let Some(dir) = config_dir() {
        let p = dir.join(CONFIG_FILENAME);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

/// `~/.config/intrachat/` on all platforms.
pub fn config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().join(".config").join("intrachat"))
}
