//! Path resolution for notebook-stack
//!
//! # Config discovery
//!
//! For the stack config file:
//! 1. `--config` flag (or `NOTEBOOK_STACK_CONFIG`, wired through clap)
//! 2. `./stack.toml` in the working directory
//! 3. `<platform config dir>/notebook-stack/stack.toml`
//! 4. None - built-in defaults are used

use std::path::{Path, PathBuf};

/// Environment variable for the config file override
pub const ENV_CONFIG: &str = "NOTEBOOK_STACK_CONFIG";

/// Environment variable for the repository linked to the notebook
pub const ENV_REPO: &str = "NOTEBOOK_GIT_REPO";

/// Default config file name
pub const CONFIG_FILE: &str = "stack.toml";

/// Locate the stack config file, if any
pub fn discover_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        let path = expand(&path.to_string_lossy());
        log::debug!("Using config from command line: {}", path.display());
        return Some(path);
    }

    let local = PathBuf::from(CONFIG_FILE);
    if local.is_file() {
        log::debug!("Using config from working directory: {}", local.display());
        return Some(local);
    }

    let user = dirs::config_dir()?.join("notebook-stack").join(CONFIG_FILE);
    if user.is_file() {
        log::debug!("Using user config: {}", user.display());
        return Some(user);
    }

    log::debug!("No config file found, using defaults");
    None
}

/// Directory relative paths in a config file are resolved against
pub fn config_base_dir(config_path: Option<&Path>) -> PathBuf {
    config_path
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as-is.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full_with_context_no_errors(
        path,
        || dirs::home_dir().map(|home| home.to_string_lossy().into_owned()),
        |var| std::env::var(var).ok(),
    );
    PathBuf::from(expanded.as_ref())
}
