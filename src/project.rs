//! Project State
//!
//! Locates the project root and reads the persisted project files: the
//! backend metadata listing deployed resources, and the JSON config holding
//! feature flags.
//!
//! Project JSON may carry `//` and `/* */` comments. Flag updates edit the
//! config in place so comments and formatting survive the rewrite.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use jsonc_parser::cst::{CstInputValue, CstObject, CstObjectProp, CstRootNode};
use jsonc_parser::ParseOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ApiLayout, NoticeConfig, ProjectLayout};
use crate::error::{NoticeError, Result};

/// A resource entry in the backend metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceMeta {
    /// Backing service (e.g., "AppSync", "Cognito")
    #[serde(default)]
    pub service: Option<String>,
}

/// Backend metadata, reduced to the categories the notices inspect
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectMeta {
    #[serde(default)]
    pub api: BTreeMap<String, ResourceMeta>,
    #[serde(default)]
    pub auth: BTreeMap<String, ResourceMeta>,
}

impl ProjectMeta {
    /// Names of API resources backed by the given service, sorted
    pub fn api_names_for_service(&self, service: &str) -> Vec<&str> {
        self.api
            .iter()
            .filter(|(_, resource)| resource.service.as_deref() == Some(service))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Whether an auth resource is declared
    pub fn has_auth(&self) -> bool {
        !self.auth.is_empty()
    }
}

/// Access to a project's on-disk state
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
    layout: ProjectLayout,
    api: ApiLayout,
}

impl ProjectStore {
    /// Open the project rooted at `root`
    pub fn open(root: impl AsRef<Path>, config: &NoticeConfig) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            layout: config.project.clone(),
            api: config.api.clone(),
        }
    }

    /// Find the project root at or above `start`
    ///
    /// Falls back to `start` itself when no ancestor carries the marker file.
    pub fn discover(start: impl AsRef<Path>, config: &NoticeConfig) -> Self {
        let start = start.as_ref();
        let marker = Path::new(&config.project.amplify_dir).join(&config.project.marker);
        let root = start
            .ancestors()
            .find(|dir| dir.join(&marker).is_file())
            .unwrap_or(start);
        Self::open(root, config)
    }

    /// Get the root path of the project
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Layout of API resource directories
    pub fn api_layout(&self) -> &ApiLayout {
        &self.api
    }

    fn amplify_dir(&self) -> PathBuf {
        self.root.join(&self.layout.amplify_dir)
    }

    fn backend_dir(&self) -> PathBuf {
        self.amplify_dir().join(&self.layout.backend_dir)
    }

    /// Path of the project JSON config
    pub fn cli_json_path(&self) -> PathBuf {
        self.amplify_dir().join(&self.layout.cli_file)
    }

    /// Path of the backend metadata file
    pub fn meta_path(&self) -> PathBuf {
        self.backend_dir().join(&self.layout.meta_file)
    }

    /// Directory of a resource, whether or not it exists
    pub fn resource_dir(&self, category: &str, name: &str) -> PathBuf {
        self.backend_dir().join(category).join(name)
    }

    /// Read the project JSON config; `None` when the file is missing
    pub fn read_cli_json(&self) -> Result<Option<Value>> {
        read_json_if_exists(&self.cli_json_path())
    }

    /// Set `features.<area>.<flag_name>` in the project JSON config
    ///
    /// Existing keys are matched case-insensitively and keep their spelling.
    /// Returns `false` without writing when the config is missing or has no
    /// `features.<area>` object.
    pub fn set_cli_flag(&self, area: &str, flag_name: &str, value: bool) -> Result<bool> {
        let path = self.cli_json_path();
        if !path.is_file() {
            return Ok(false);
        }

        let content = fs::read_to_string(&path)?;
        let root = CstRootNode::parse(&content, &ParseOptions::default())
            .map_err(|e| invalid_file(&path, e))?;

        let Some(section) = root
            .object_value()
            .and_then(|config| find_prop(&config, "features"))
            .and_then(|features| features.object_value())
            .and_then(|features| find_prop(&features, area))
            .and_then(|section| section.object_value())
        else {
            return Ok(false);
        };

        if let Some(prop) = find_prop(&section, flag_name) {
            prop.set_value(CstInputValue::Bool(value));
        } else {
            section.append(flag_name, CstInputValue::Bool(value));
        }

        fs::write(&path, root.to_string())?;
        Ok(true)
    }

    /// Replace the project JSON config
    pub fn write_cli_json(&self, config: &Value) -> Result<()> {
        let path = self.cli_json_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut content = serde_json::to_string_pretty(config)?;
        content.push('\n');
        fs::write(&path, content)?;
        Ok(())
    }

    /// Read the backend metadata; empty when the file is missing
    pub fn read_meta(&self) -> Result<ProjectMeta> {
        match read_json_if_exists(&self.meta_path())? {
            Some(value) => {
                serde_json::from_value(value).map_err(|e| invalid_file(&self.meta_path(), e))
            }
            None => Ok(ProjectMeta::default()),
        }
    }

    /// Names of the project's GraphQL APIs
    pub fn graphql_api_names(&self) -> Result<Vec<String>> {
        let meta = self.read_meta()?;
        Ok(meta
            .api_names_for_service(&self.api.service)
            .into_iter()
            .map(String::from)
            .collect())
    }

    /// Directory of the project's single GraphQL API
    ///
    /// `None` unless exactly one GraphQL API is declared and its directory
    /// exists.
    pub fn api_resource_dir(&self) -> Result<Option<PathBuf>> {
        let names = self.graphql_api_names()?;
        let [name] = names.as_slice() else {
            tracing::debug!(count = names.len(), "no single GraphQL API in project");
            return Ok(None);
        };

        let dir = self.resource_dir(&self.api.category, name);
        if dir.is_dir() {
            Ok(Some(dir))
        } else {
            tracing::debug!(path = %dir.display(), "GraphQL API directory missing");
            Ok(None)
        }
    }
}

fn read_json_if_exists(path: &Path) -> Result<Option<Value>> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    jsonc_parser::parse_to_serde_value(&content, &ParseOptions::default())
        .map_err(|e| invalid_file(path, e))
}

fn invalid_file(path: &Path, error: impl std::fmt::Display) -> NoticeError {
    NoticeError::InvalidProjectFile {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

fn find_prop(object: &CstObject, name: &str) -> Option<CstObjectProp> {
    let props = object.properties();
    let prop_name = |prop: &CstObjectProp| prop.name().and_then(|n| n.decoded_value().ok());
    let exact = props
        .iter()
        .position(|prop| prop_name(prop).as_deref() == Some(name));
    let index = exact.or_else(|| {
        props.iter().position(|prop| {
            prop_name(prop).is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
    })?;
    props.into_iter().nth(index)
}
