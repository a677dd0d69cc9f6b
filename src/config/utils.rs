/// Global configuration storage and access
///
/// The config is loaded once at startup into a process-wide cell and read
/// through `with_config`. Updates and saves go through the same cell so
/// every subsystem observes the same values.
use super::schemas::Config;
use crate::logger::{self, LogTag};
use crate::paths;
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::RwLock;

static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Load configuration from the default path and install it globally
///
/// A missing file is not an error: defaults are used and the file is
/// written on the next save.
pub fn load_config() -> Result<(), String> {
    let path = paths::get_config_path();
    let config = load_config_from_path(&path)?;
    CONFIG
        .set(RwLock::new(config))
        .map_err(|_| "Config already initialized".to_string())
}

/// Parse a config file, falling back to defaults when it does not exist
pub fn load_config_from_path(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        logger::info(
            LogTag::Config,
            &format!("Config file {} not found, using default values", path.display()),
        );
        return Ok(Config::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;
    toml::from_str(&raw).map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))
}

/// Whether load_config has run
pub fn is_config_initialized() -> bool {
    CONFIG.get().is_some()
}

/// Read access to the global config
///
/// Panics if called before load_config(); startup order in run.rs
/// guarantees initialization before any service starts.
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    let lock = CONFIG.get().expect("Config not initialized - call load_config() first");
    let guard = lock.read().expect("Config lock poisoned");
    f(&guard)
}

/// Clone of the full config for handlers that hold values across awaits
pub fn get_config_clone() -> Config {
    with_config(|config| config.clone())
}

/// Serialize the current config to the config file
pub fn save_config() -> Result<(), String> {
    let config = get_config_clone();
    save_config_to_path(&config, &paths::get_config_path())
}

/// Serialize a config value to an explicit path
pub fn save_config_to_path(config: &Config, path: &Path) -> Result<(), String> {
    let serialized = toml::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(path, serialized)
        .map_err(|e| format!("Failed to write config file {}: {}", path.display(), e))
}

/// Mutate one part of the config in place, optionally persisting it
pub fn update_config_section<F>(update_fn: F, save_to_disk: bool) -> Result<(), String>
where
    F: FnOnce(&mut Config),
{
    {
        let lock = CONFIG
            .get()
            .ok_or_else(|| "Config not initialized".to_string())?;
        let mut guard = lock
            .write()
            .map_err(|_| "Config lock poisoned".to_string())?;
        update_fn(&mut guard);
    }

    if save_to_disk {
        save_config()?;
    }
    Ok(())
}
