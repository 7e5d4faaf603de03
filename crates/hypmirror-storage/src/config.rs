use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

/// Storage section of the application config, tagged by `type`.
///
/// ```json
/// { "type": "local", "root": "mirror", "url": "https://cdn.example/" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum StorageConfig {
    /// In-memory simulation, random delay unless `delayMs` is set.
    Dummy {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delay_ms: Option<u64>,
    },
    /// Built-in HTTP downloader with a status sidecar.
    Local {
        root: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url:  Option<Url>,
    },
    /// External `aria2c` process per transfer.
    Aria2 {
        root:    PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url:     Option<Url>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        program: Option<PathBuf>,
    },
}

impl Default for StorageConfig {
    fn default() -> Self { Self::Dummy { delay_ms: None } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local() {
        let config: StorageConfig =
            serde_json::from_str(r#"{"type": "local", "root": "mirror", "url": "https://cdn.example/"}"#).unwrap();
        assert_eq!(
            config,
            StorageConfig::Local {
                root: PathBuf::from("mirror"),
                url:  Some("https://cdn.example/".parse().unwrap()),
            }
        );
    }

    #[test]
    fn test_parse_dummy_delay() {
        let config: StorageConfig = serde_json::from_str(r#"{"type": "dummy", "delayMs": 250}"#).unwrap();
        assert_eq!(config, StorageConfig::Dummy { delay_ms: Some(250) });
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        assert!(serde_json::from_str::<StorageConfig>(r#"{"type": "s3", "root": "x"}"#).is_err());
        assert!(serde_json::from_str::<StorageConfig>(r#"{"root": "x"}"#).is_err());
    }
}
