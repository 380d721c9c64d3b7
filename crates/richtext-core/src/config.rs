use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::format::FontSizeBand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSizeBands {
    pub small_max: u32,
    pub normal_max: u32,
}

impl Default for FontSizeBands {
    fn default() -> Self {
        Self {
            small_max: 12,
            normal_max: 16,
        }
    }
}

impl FontSizeBands {
    pub fn classify(&self, px: u32) -> FontSizeBand {
        if px <= self.small_max {
            FontSizeBand::Small
        } else if px <= self.normal_max {
            FontSizeBand::Normal
        } else {
            FontSizeBand::Large
        }
    }
}

/// How long attachment blobs stay in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentRetention {
    #[default]
    Session,
    /// Blobs no longer referenced by any history entry are evicted after
    /// each commit.
    Reachable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EditorConfig {
    /// Upper bound on history entries, the initial one included. 0 keeps
    /// every entry.
    pub max_history: usize,
    pub font_size_bands: FontSizeBands,
    pub link_target: String,
    pub link_rel: String,
    pub default_link_scheme: String,
    pub attachment_retention: AttachmentRetention,
}

impl EditorConfig {
    pub fn with_defaults(mut self) -> Self {
        if self.max_history == 1 {
            self.max_history = 2;
        }
        if self.font_size_bands.normal_max < self.font_size_bands.small_max {
            log::warn!(
                "font size bands out of order ({} > {}), using defaults",
                self.font_size_bands.small_max,
                self.font_size_bands.normal_max
            );
            self.font_size_bands = FontSizeBands::default();
        }
        if self.link_target.is_empty() {
            self.link_target = "_blank".to_string();
        }
        if self.link_rel.is_empty() {
            self.link_rel = "noopener noreferrer".to_string();
        }
        if self.default_link_scheme.is_empty() {
            self.default_link_scheme = "https://".to_string();
        }
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        Ok(config.with_defaults())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_is_filled_with_defaults() {
        let json = r#"{ "max_history": 50, "font_size_bands": { "small_max": 10 } }"#;
        let config = EditorConfig::from_json_str(json).unwrap();
        assert_eq!(config.max_history, 50);
        assert_eq!(config.font_size_bands.small_max, 10);
        assert_eq!(config.font_size_bands.normal_max, 16);
        assert_eq!(config.link_target, "_blank");
        assert_eq!(config.default_link_scheme, "https://");
        assert_eq!(config.attachment_retention, AttachmentRetention::Session);
    }

    #[test]
    fn bands_classify_inclusively() {
        let bands = FontSizeBands::default();
        assert_eq!(bands.classify(12), FontSizeBand::Small);
        assert_eq!(bands.classify(13), FontSizeBand::Normal);
        assert_eq!(bands.classify(16), FontSizeBand::Normal);
        assert_eq!(bands.classify(17), FontSizeBand::Large);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(EditorConfig::from_json_str("{ \"max_history\": \"lots\" }").is_err());
    }
}
