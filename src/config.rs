/// Server configuration, layered from defaults, the project file
/// (`.comment-linker.yaml` at the workspace root), `initializationOptions`
/// and `workspace/didChangeConfiguration` settings.
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ConfigError;

pub(crate) const PROJECT_FILE: &str = ".comment-linker.yaml";

/// Key under which clients nest our settings in `didChangeConfiguration`.
pub(crate) const SETTINGS_SECTION: &str = "commentLinker";

/// When the cursor counts as being "in" a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TriggerPolicy {
    /// Anywhere on a line the link spans.
    Line,
    /// On the link's start line, within `proximity_columns` of its markup.
    Proximity,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct Config {
    pub trigger: TriggerPolicy,
    pub proximity_columns: u32,
    pub root_relative_paths: bool,
    pub link_color: String,
    /// Language ids to provide links for; empty means every language.
    pub languages: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trigger: TriggerPolicy::Line,
            proximity_columns: 5,
            root_relative_paths: true,
            link_color: "#61AFEF".to_string(),
            languages: Vec::new(),
        }
    }
}

impl Config {
    /// The effective config for the merged layers from `base_layers`.
    pub fn from_layers(layers: &Value) -> Self {
        Self::from_value(layers.clone())
    }

    /// Apply `didChangeConfiguration` settings on top of `base`.
    pub fn with_settings(base: &Value, settings: &Value) -> Self {
        let mut merged = base.clone();
        let section = settings.get(SETTINGS_SECTION).unwrap_or(settings);
        merge(&mut merged, section.clone());
        Self::from_value(merged)
    }

    fn from_value(value: Value) -> Self {
        match serde_json::from_value::<Config>(value).map_err(ConfigError::from) {
            Ok(config) => {
                debug!(?config, "config: loaded");
                config
            }
            Err(e) => {
                warn!(error = %e, "config: falling back to defaults");
                Config::default()
            }
        }
    }

    pub fn accepts_language(&self, language_id: &str) -> bool {
        self.languages.is_empty() || self.languages.iter().any(|l| l == language_id)
    }
}

/// The merged layers below client settings, kept so later settings changes
/// can be re-applied on top.
///
/// A project file that fails to load or parse is logged and skipped.
pub(crate) fn base_layers(root: Option<&Path>, init_options: Option<&Value>) -> Value {
    let mut merged = Value::Object(Map::new());
    if let Some(root) = root {
        match read_project_file(root) {
            Ok(Some(file)) => merge(&mut merged, file),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "config: ignoring project file"),
        }
    }
    if let Some(options) = init_options {
        merge(&mut merged, options.clone());
    }
    merged
}

fn read_project_file(root: &Path) -> Result<Option<Value>, ConfigError> {
    let path = root.join(PROJECT_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let value: Value =
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml { path, source })?;
    Ok(Some(value))
}

/// Deep-merge `overlay` into `base`; objects merge key by key, anything else replaces.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                if value.is_null() {
                    continue;
                }
                merge(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}
