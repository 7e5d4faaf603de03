//! `app.config.json`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use hypmirror_catalogue::SelectionPolicy;
use hypmirror_storage::StorageConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::source::{Launcher, LauncherOptions};

pub const DEFAULT_CONFIG_PATH: &str = "app.config.json";
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Filter key that matches any game without a filter of its own.
pub const WILDCARD_BIZ: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Where the status snapshot is published; nothing is written when unset.
    #[serde(default)]
    pub status_file:   Option<PathBuf>,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    pub storage:       StorageConfig,
    pub tasks:         Vec<TaskConfig>,
}

fn default_interval() -> u64 { DEFAULT_INTERVAL_SECS }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub launcher: LauncherConfig,
    pub filters:  Vec<FilterConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LauncherConfig {
    #[serde(rename = "type")]
    pub kind:        String,
    #[serde(default)]
    pub language:    Option<String>,
    #[serde(default)]
    pub channel:     Option<String>,
    #[serde(default)]
    pub sub_channel: Option<String>,
}

impl LauncherConfig {
    pub fn launcher(&self) -> Result<Launcher, ConfigError> {
        self.kind
            .parse()
            .map_err(|kind| ConfigError::Invalid(vec![format!("launcher.type: unknown launcher '{kind}'")]))
    }

    pub fn options(&self) -> LauncherOptions {
        LauncherOptions {
            language:    self.language.clone(),
            channel:     self.channel.clone(),
            sub_channel: self.sub_channel.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    /// Exact game biz, or [`WILDCARD_BIZ`].
    pub match_game_biz: String,
    #[serde(flatten)]
    pub policy:         SelectionPolicy,
}

impl TaskConfig {
    /// The filter for `biz`: an exact match first, then the wildcard.
    pub fn filter_for(&self, biz: &str) -> Option<&FilterConfig> {
        self.filters
            .iter()
            .find(|f| f.match_game_biz == biz)
            .or_else(|| self.filters.iter().find(|f| f.match_game_biz == WILDCARD_BIZ))
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse and validate. Structural problems are collected and reported
    /// together before typed decoding.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text)?;
        let problems = validate(&value);
        if !problems.is_empty() {
            return Err(ConfigError::Invalid(problems));
        }
        Ok(serde_json::from_value(value)?)
    }
}

fn validate(config: &Value) -> Vec<String> {
    let mut problems = Vec::new();

    let storage_type = config.pointer("/storage/type").and_then(Value::as_str);
    match storage_type {
        None => problems.push("storage.type".to_string()),
        Some("local" | "aria2") => {
            let root = config.pointer("/storage/root").and_then(Value::as_str);
            if root.is_none_or(str::is_empty) {
                problems.push("storage.root".to_string());
            }
        }
        Some("dummy") => {}
        Some(other) => problems.push(format!("storage.type: unknown storage '{other}'")),
    }

    let Some(tasks) = config.get("tasks").and_then(Value::as_array) else {
        problems.push("tasks".to_string());
        return problems;
    };

    for (i, task) in tasks.iter().enumerate() {
        match task.pointer("/launcher/type").and_then(Value::as_str) {
            None => problems.push(format!("tasks[{i}].launcher.type")),
            Some(kind) if kind.parse::<Launcher>().is_err() => {
                problems.push(format!("tasks[{i}].launcher.type: unknown launcher '{kind}'"));
            }
            Some(_) => {}
        }

        let Some(filters) = task.get("filters").and_then(Value::as_array) else {
            problems.push(format!("tasks[{i}].filters"));
            continue;
        };
        let mut seen = HashSet::new();
        for (j, filter) in filters.iter().enumerate() {
            match filter.get("matchGameBiz").and_then(Value::as_str) {
                None => problems.push(format!("tasks[{i}].filters[{j}].matchGameBiz")),
                Some(biz) if !seen.insert(biz) => {
                    problems.push(format!("tasks[{i}].filters[{j}].matchGameBiz: duplicate '{biz}'"));
                }
                Some(_) => {}
            }
        }
    }

    problems
}
