/// Configuration system
///
/// TOML-backed settings with per-field defaults. Every struct is declared
/// through `config_struct!` so a partial file (or no file at all) always
/// yields a complete Config.
pub mod macros;
pub mod schemas;
mod utils;

pub use schemas::*;
pub use utils::{
    get_config_clone, is_config_initialized, load_config, load_config_from_path, save_config,
    save_config_to_path, update_config_section, with_config,
};
