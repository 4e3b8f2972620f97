use serde::{Deserialize, Serialize};

use crate::differ::DiffCompatVersion;

/// Settings that select and tune a differ. Persist these next to stored diffs: both fields
/// affect the produced opcodes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct DiffConfig {
    pub ignore_space: bool,
    pub compat_version: DiffCompatVersion,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            ignore_space: false,
            compat_version: DiffCompatVersion::DEFAULT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DiffConfig::default();
        assert!(!config.ignore_space);
        assert_eq!(config.compat_version, DiffCompatVersion::MyersSmsCostBail);
    }

    #[test]
    fn test_version_persists_as_integer() {
        let config = DiffConfig {
            ignore_space: true,
            compat_version: DiffCompatVersion::SmDiffer,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"ignore_space":true,"compat_version":0}"#);

        let parsed: DiffConfig = serde_json::from_str(r#"{"compat_version":1}"#).unwrap();
        assert_eq!(parsed.compat_version, DiffCompatVersion::Myers);
        assert!(!parsed.ignore_space);
    }

    #[test]
    fn test_unknown_version_rejected() {
        let err = serde_json::from_str::<DiffConfig>(r#"{"compat_version":999}"#).unwrap_err();
        assert!(err.to_string().contains("999"));
    }
}
