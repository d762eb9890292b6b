pub mod build;
pub mod clean;
pub mod init;
pub mod serve;

use std::path::{Path, PathBuf};

use crate::config::{DEFAULT_CONFIG_FILE, SiteConfig, base_path_from_config};

/// Load the config named on the command line with every path resolved
/// against the config file's directory.
pub(crate) async fn load_config(config_file: Option<&Path>) -> Result<SiteConfig, anyhow::Error> {
    let config_path = config_file
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config_path = if config_path.is_relative() {
        std::env::current_dir()?.join(&config_path)
    } else {
        config_path
    };

    let config = SiteConfig::load_from_arg(config_file.map(|_| config_path.as_path())).await?;
    let base_path = base_path_from_config(&config_path);
    Ok(config.resolve_paths(&base_path))
}
