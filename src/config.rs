//! Configuration management for the security notices
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (notices.toml)
//! - Environment variables (NOTICES__*)
//!
//! ## Example config file (notices.toml):
//! ```toml
//! [project]
//! amplify_dir = "amplify"
//! backend_dir = "backend"
//! meta_file = "amplify-meta.json"
//! cli_file = "cli.json"
//! marker = ".config/project-config.json"
//!
//! [api]
//! category = "api"
//! service = "AppSync"
//! schema_file = "schema.graphql"
//! schema_dir = "schema"
//! resolver_build_dir = "build/resolvers"
//!
//! [features]
//! area = "graphqltransformer"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration for the notices
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoticeConfig {
    /// Project layout
    #[serde(default)]
    pub project: ProjectLayout,

    /// GraphQL API resource layout
    #[serde(default)]
    pub api: ApiLayout,

    /// Feature flag settings
    #[serde(default)]
    pub features: FeatureConfig,
}

/// Where project state lives, relative to the project root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectLayout {
    #[serde(default = "default_amplify_dir")]
    pub amplify_dir: String,

    /// Backend directory, relative to `amplify_dir`
    #[serde(default = "default_backend_dir")]
    pub backend_dir: String,

    /// Project metadata file, relative to the backend directory
    #[serde(default = "default_meta_file")]
    pub meta_file: String,

    /// Project JSON config holding feature flags, relative to `amplify_dir`
    #[serde(default = "default_cli_file")]
    pub cli_file: String,

    /// File whose presence marks the project root, relative to `amplify_dir`
    #[serde(default = "default_marker")]
    pub marker: String,
}

/// Layout of a GraphQL API resource directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiLayout {
    /// Resource category holding GraphQL APIs
    #[serde(default = "default_category")]
    pub category: String,

    /// Service type identifying a GraphQL API in project metadata
    #[serde(default = "default_service")]
    pub service: String,

    #[serde(default = "default_schema_file")]
    pub schema_file: String,

    #[serde(default = "default_schema_dir")]
    pub schema_dir: String,

    /// Build output holding generated resolver templates
    #[serde(default = "default_resolver_build_dir")]
    pub resolver_build_dir: String,
}

/// Feature flag configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Feature area owning the notification flags
    #[serde(default = "default_area")]
    pub area: String,
}

fn default_amplify_dir() -> String {
    "amplify".to_string()
}

fn default_backend_dir() -> String {
    "backend".to_string()
}

fn default_meta_file() -> String {
    "amplify-meta.json".to_string()
}

fn default_cli_file() -> String {
    "cli.json".to_string()
}

fn default_marker() -> String {
    ".config/project-config.json".to_string()
}

fn default_category() -> String {
    "api".to_string()
}

fn default_service() -> String {
    "AppSync".to_string()
}

fn default_schema_file() -> String {
    "schema.graphql".to_string()
}

fn default_schema_dir() -> String {
    "schema".to_string()
}

fn default_resolver_build_dir() -> String {
    "build/resolvers".to_string()
}

fn default_area() -> String {
    "graphqltransformer".to_string()
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            amplify_dir: default_amplify_dir(),
            backend_dir: default_backend_dir(),
            meta_file: default_meta_file(),
            cli_file: default_cli_file(),
            marker: default_marker(),
        }
    }
}

impl Default for ApiLayout {
    fn default() -> Self {
        Self {
            category: default_category(),
            service: default_service(),
            schema_file: default_schema_file(),
            schema_dir: default_schema_dir(),
            resolver_build_dir: default_resolver_build_dir(),
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            area: default_area(),
        }
    }
}

impl NoticeConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["notices.toml", ".notices.toml", "config/notices.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "notices") {
            let xdg_config = config_dir.config_dir().join("notices.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // NOTICES__API__SCHEMA_FILE=main.graphql
        builder = builder.add_source(
            Environment::with_prefix("NOTICES")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
