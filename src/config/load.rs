//! Configuration loading from files.
//!
//! This module handles reading, parsing and validating configuration files.

use std::path::{Path, PathBuf};

use super::{ConfigError, SiteConfig};

pub const DEFAULT_CONFIG_FILE: &str = "presskit.yaml";

impl SiteConfig {
    /// Load the config from the command line argument, defaulting to `presskit.yaml`.
    ///
    /// A missing default config file yields the default configuration; an
    /// explicitly named file must exist.
    pub async fn load_from_arg(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = config_file.is_some();
        let config_file = config_file.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let config_file = absolute(config_file)?;

        if !explicit && !config_file.exists() {
            return Ok(Self::default());
        }

        Self::load_from_file(&config_file).await
    }

    /// Load the config from a file path.
    pub(crate) async fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: SiteConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=2).contains(&self.headings.min_level) {
            return Err(ConfigError::Validation(
                "headings.min_level must be 1 or 2".to_string(),
            ));
        }
        if self.headings.max_level < self.headings.min_level || self.headings.max_level > 6 {
            return Err(ConfigError::Validation(
                "headings.max_level must be between min_level and 6".to_string(),
            ));
        }
        if self.index_filename.is_empty() || self.index_filename.contains('/') {
            return Err(ConfigError::Validation(
                "index_filename must be a bare filename".to_string(),
            ));
        }
        if self.front_matter_delimiter.trim().is_empty() {
            return Err(ConfigError::Validation(
                "front_matter_delimiter must not be empty".to_string(),
            ));
        }
        for rule in &self.slug_replace {
            regex::Regex::new(&rule.pattern).map_err(|e| {
                ConfigError::Validation(format!("invalid slug_replace pattern '{}': {e}", rule.pattern))
            })?;
        }
        Ok(())
    }

    /// Resolve every configured directory against `base_path`.
    pub fn resolve_paths(mut self, base_path: &Path) -> Self {
        let join = |p: &Path| {
            if p.is_relative() {
                base_path.join(p)
            } else {
                p.to_path_buf()
            }
        };
        self.content_dir = join(&self.content_dir);
        self.template_dir = join(&self.template_dir);
        self.build_dir = join(&self.build_dir);
        for entry in &mut self.pass_through {
            entry.from = join(&entry.from);
        }
        self
    }
}

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.is_relative() {
        Ok(std::env::current_dir()
            .map_err(ConfigError::CwdFailure)?
            .join(path))
    } else {
        Ok(path.to_path_buf())
    }
}

/// Get the base path from a config file path (its parent directory).
pub fn base_path_from_config(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SortOrder;

    #[test]
    fn test_defaults() {
        let config: SiteConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.index_filename, "index.html");
        assert_eq!(config.front_matter_delimiter, "---");
        assert_eq!(config.dir_pages.size, 24);
        assert!(config.tag_pages.is_some());
        assert_eq!(config.watch.debounce_ms, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tag_pages_disabled() {
        let config: SiteConfig = serde_yaml::from_str("tag_pages: null").unwrap();
        assert!(config.tag_pages.is_none());
    }

    #[test]
    fn test_parse_overrides() {
        let yaml = r#"
root: /blog/
development: true
slug_replace:
  - pattern: "\\d+_"
dir_pages:
  size: 3
  overrides:
    post: { sort_by: date, sort_order: asc }
globals:
  site_name: Example
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.root, "/blog/");
        assert!(config.development);
        assert_eq!(config.slug_replace[0].replace, "");
        assert_eq!(config.dir_pages.size, 3);
        let rule = config.dir_pages.rule_for("post");
        assert_eq!(rule.sort_by, "date");
        assert_eq!(rule.sort_order, SortOrder::Asc);
        assert_eq!(config.dir_pages.rule_for("about").sort_by, "priority");
        assert_eq!(config.globals["site_name"], "Example");
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let mut config = SiteConfig::default();
        config.slug_replace.push(super::super::types::SlugReplace {
            pattern: "(".to_string(),
            replace: String::new(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_paths() {
        let config = SiteConfig::default().resolve_paths(Path::new("/project"));
        assert_eq!(config.content_dir, PathBuf::from("/project/src/content"));
        assert_eq!(config.build_dir, PathBuf::from("/project/build"));
    }

    #[test]
    fn test_base_path_from_config() {
        assert_eq!(
            base_path_from_config(Path::new("/project/presskit.yaml")),
            PathBuf::from("/project")
        );
    }
}
