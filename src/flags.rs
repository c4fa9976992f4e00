//! Feature Flags
//!
//! Flag values come from the `features` object of the project JSON config,
//! falling back to the defaults of registered flags. The registry is an
//! explicit value handed to each policy; nothing is process-global.
//!
//! Flag paths have the form `area.flag`. Flag names are matched
//! case-insensitively, so `securityEnhancementNotification` and
//! `securityenhancementnotification` name the same flag.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::project::ProjectStore;

pub const TRANSFORMER_VERSION: &str = "transformerversion";
pub const SHOW_FIELD_AUTH_NOTIFICATION: &str = "showfieldauthnotification";
pub const SECURITY_ENHANCEMENT_NOTIFICATION: &str = "securityEnhancementNotification";

/// Default value of a registered flag
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlagDefault {
    Boolean(bool),
    Number(i64),
}

/// Registry of known flags plus the values read from the project
#[derive(Debug, Clone)]
pub struct FeatureFlags {
    /// Feature area owning the transformer flags
    area: String,
    /// Keyed by lowercased `area.flag`
    registered: BTreeMap<String, FlagDefault>,
    /// The `features` object of the project config
    values: Map<String, Value>,
}

impl FeatureFlags {
    /// Registry with the transformer flags of `area` and no project values
    pub fn new(area: &str) -> Self {
        let mut flags = Self {
            area: area.to_string(),
            registered: BTreeMap::new(),
            values: Map::new(),
        };
        flags.register(area, TRANSFORMER_VERSION, FlagDefault::Number(1));
        flags.register(area, SHOW_FIELD_AUTH_NOTIFICATION, FlagDefault::Boolean(false));
        flags.register(area, SECURITY_ENHANCEMENT_NOTIFICATION, FlagDefault::Boolean(false));
        flags
    }

    /// Registry loaded with the values persisted in `project`
    pub fn load(area: &str, project: &ProjectStore) -> Result<Self> {
        let mut flags = Self::new(area);
        flags.reload_values(project)?;
        Ok(flags)
    }

    /// Replace the project values with a `features` object
    pub fn with_values(mut self, features: Value) -> Self {
        self.values = match features {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self
    }

    /// Register a flag, keeping an existing registration
    pub fn register(&mut self, area: &str, name: &str, default: FlagDefault) {
        self.registered.entry(flag_key(area, name)).or_insert(default);
    }

    /// Feature area owning the transformer flags
    pub fn area(&self) -> &str {
        &self.area
    }

    pub fn is_registered(&self, area: &str, name: &str) -> bool {
        self.registered.contains_key(&flag_key(area, name))
    }

    /// Make sure `area.name` is known, registering it as a `false` boolean
    pub fn ensure_feature_flag(&mut self, area: &str, name: &str) {
        if !self.is_registered(area, name) {
            tracing::debug!(area, name, "registering feature flag");
            self.register(area, name, FlagDefault::Boolean(false));
        }
    }

    /// Re-read flag values from the project config
    pub fn reload_values(&mut self, project: &ProjectStore) -> Result<()> {
        self.values = project
            .read_cli_json()?
            .and_then(|config| match config.get("features") {
                Some(Value::Object(features)) => Some(features.clone()),
                _ => None,
            })
            .unwrap_or_default();
        Ok(())
    }

    /// Boolean value of `area.flag`; unknown flags are `false`
    pub fn get_boolean(&self, path: &str) -> bool {
        if let Some(value) = self.lookup(path) {
            return match value {
                Value::Bool(b) => *b,
                Value::String(s) => s.eq_ignore_ascii_case("true"),
                _ => false,
            };
        }
        matches!(self.default_for(path), Some(FlagDefault::Boolean(true)))
    }

    /// Numeric value of `area.flag`
    pub fn get_number(&self, path: &str) -> Option<i64> {
        if let Some(value) = self.lookup(path) {
            return match value {
                Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_number)),
                Value::String(s) => s.trim().parse::<f64>().ok().and_then(whole_number),
                _ => None,
            };
        }
        match self.default_for(path) {
            Some(FlagDefault::Number(n)) => Some(n),
            _ => None,
        }
    }

    /// Whether version 2 of the schema transformer is active
    pub fn uses_transformer_v2(&self) -> bool {
        self.get_number(&format!("{}.{TRANSFORMER_VERSION}", self.area)) == Some(2)
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        let (area, name) = path.split_once('.')?;
        let section = find_ignore_case(&self.values, area)?.as_object()?;
        find_ignore_case(section, name)
    }

    fn default_for(&self, path: &str) -> Option<FlagDefault> {
        self.registered.get(&path.to_ascii_lowercase()).copied()
    }
}

fn whole_number(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n.is_finite()).then_some(n as i64)
}

fn flag_key(area: &str, name: &str) -> String {
    format!("{area}.{name}").to_ascii_lowercase()
}

fn find_ignore_case<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

/// Persist a notification flag of the flags' area and refresh `flags`
///
/// The value is only written when the project config already has a
/// `features.<area>` section; otherwise the config is left untouched.
pub fn set_notification_flag(
    project: &ProjectStore,
    flags: &mut FeatureFlags,
    flag_name: &str,
    value: bool,
) -> Result<()> {
    let area = flags.area().to_string();
    flags.ensure_feature_flag(&area, flag_name);

    if !project.set_cli_flag(&area, flag_name, value)? {
        tracing::debug!("no features.{area} section, flag {flag_name} not persisted");
        return Ok(());
    }

    tracing::info!(area = %area, flag = flag_name, value, "notification flag updated");
    flags.reload_values(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NoticeConfig;
    use serde_json::json;
    use tempfile::tempdir;

    const AREA: &str = "graphqltransformer";

    #[test]
    fn test_registered_defaults() {
        let flags = FeatureFlags::new(AREA);
        assert_eq!(flags.get_number("graphqltransformer.transformerversion"), Some(1));
        assert!(!flags.get_boolean("graphqltransformer.showfieldauthnotification"));
        assert!(!flags.get_boolean("graphqltransformer.unknown"));
        assert!(!flags.uses_transformer_v2());
    }

    #[test]
    fn test_values_are_case_insensitive() {
        let flags = FeatureFlags::new(AREA).with_values(json!({
            "graphqltransformer": {
                "transformerVersion": 2,
                "securityenhancementnotification": true
            }
        }));
        assert!(flags.uses_transformer_v2());
        assert!(flags.get_boolean("graphqltransformer.securityEnhancementNotification"));
    }

    #[test]
    fn test_whole_float_transformer_version() {
        let flags = FeatureFlags::new(AREA)
            .with_values(json!({ "graphqltransformer": { "transformerversion": 2.0 } }));
        assert_eq!(flags.get_number("graphqltransformer.transformerversion"), Some(2));
        assert!(flags.uses_transformer_v2());

        let fractional = FeatureFlags::new(AREA)
            .with_values(json!({ "graphqltransformer": { "transformerversion": 2.5 } }));
        assert_eq!(fractional.get_number("graphqltransformer.transformerversion"), None);
        assert!(!fractional.uses_transformer_v2());
    }

    #[test]
    fn test_load_and_clear_with_commented_config() {
        let dir = tempdir().unwrap();
        let project = ProjectStore::open(dir.path(), &NoticeConfig::default());
        std::fs::create_dir_all(dir.path().join("amplify")).unwrap();
        std::fs::write(
            project.cli_json_path(),
            "{\n  // managed by the CLI\n  \"features\": {\n    \"graphqltransformer\": {\n      \"showfieldauthnotification\": true\n    }\n  }\n}\n",
        )
        .unwrap();

        let mut flags = FeatureFlags::load(AREA, &project).unwrap();
        assert!(flags.get_boolean("graphqltransformer.showfieldauthnotification"));

        set_notification_flag(&project, &mut flags, SHOW_FIELD_AUTH_NOTIFICATION, false)
            .unwrap();
        assert!(!flags.get_boolean("graphqltransformer.showfieldauthnotification"));
        let text = std::fs::read_to_string(project.cli_json_path()).unwrap();
        assert!(text.contains("// managed by the CLI"));
    }

    #[test]
    fn test_ensure_registers_unknown_flag() {
        let mut flags = FeatureFlags::new(AREA);
        assert!(!flags.is_registered(AREA, "newnotice"));
        flags.ensure_feature_flag(AREA, "newNotice");
        assert!(flags.is_registered(AREA, "newnotice"));
        assert!(!flags.get_boolean("graphqltransformer.newnotice"));
    }

    #[test]
    fn test_set_flag_rewrites_existing_key() {
        let dir = tempdir().unwrap();
        let project = ProjectStore::open(dir.path(), &NoticeConfig::default());
        project
            .write_cli_json(&json!({
                "features": {
                    "graphqltransformer": { "securityenhancementnotification": true },
                    "other": { "keep": 1 }
                }
            }))
            .unwrap();
        let mut flags = FeatureFlags::load(AREA, &project).unwrap();
        assert!(flags.get_boolean("graphqltransformer.securityEnhancementNotification"));

        set_notification_flag(&project, &mut flags, SECURITY_ENHANCEMENT_NOTIFICATION, false)
            .unwrap();

        assert!(!flags.get_boolean("graphqltransformer.securityEnhancementNotification"));
        let saved = project.read_cli_json().unwrap().unwrap();
        let section = saved["features"]["graphqltransformer"].as_object().unwrap();
        assert_eq!(section.len(), 1);
        assert_eq!(section["securityenhancementnotification"], json!(false));
        assert_eq!(saved["features"]["other"]["keep"], json!(1));
    }

    #[test]
    fn test_set_flag_without_section_is_noop() {
        let dir = tempdir().unwrap();
        let project = ProjectStore::open(dir.path(), &NoticeConfig::default());
        let mut flags = FeatureFlags::new(AREA);

        set_notification_flag(&project, &mut flags, SHOW_FIELD_AUTH_NOTIFICATION, false)
            .unwrap();
        assert!(project.read_cli_json().unwrap().is_none());

        project.write_cli_json(&json!({ "features": {} })).unwrap();
        set_notification_flag(&project, &mut flags, SHOW_FIELD_AUTH_NOTIFICATION, false)
            .unwrap();
        assert_eq!(project.read_cli_json().unwrap().unwrap(), json!({ "features": {} }));
    }
}
