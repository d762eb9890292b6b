//! Configuration loading and types for presskit.
//!
//! - Type definitions for config structures (`types`)
//! - Loading configs from files (`load`)

mod load;
mod types;

pub use types::{
    HeadingConfig, ListingConfig, MarkdownConfig, MinifyConfig, PassThrough, SiteConfig,
    SortOrder, SortRule,
};

pub use load::{DEFAULT_CONFIG_FILE, base_path_from_config};

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to get current working directory: {0}")]
    CwdFailure(std::io::Error),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{0}")]
    Validation(String),
}
