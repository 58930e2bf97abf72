//! Parser configuration contracts shared across crates.

use serde::{Deserialize, Serialize};

/// Default maximum number of parts (files and fields) per body
pub const DEFAULT_MAX_FIELDS: usize = 1000;

/// Default maximum total size of field values in bytes
pub const DEFAULT_MAX_FIELDS_SIZE: usize = 2 * 1024 * 1024;

/// Multipart parser limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipartConfig {
    /// Maximum number of parts; a file counts as a field
    #[serde(default = "default_max_fields")]
    pub max_fields: usize,

    /// Maximum total bytes of all non-file field values
    #[serde(default = "default_max_fields_size")]
    pub max_fields_size: usize,
}

impl MultipartConfig {
    /// Config with the given field limit and default size limit
    pub fn with_max_fields(max_fields: usize) -> Self {
        Self {
            max_fields,
            ..Default::default()
        }
    }
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_fields: DEFAULT_MAX_FIELDS,
            max_fields_size: DEFAULT_MAX_FIELDS_SIZE,
        }
    }
}

fn default_max_fields() -> usize {
    DEFAULT_MAX_FIELDS
}

fn default_max_fields_size() -> usize {
    DEFAULT_MAX_FIELDS_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_use_defaults() {
        let config: MultipartConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MultipartConfig::default());
    }

    #[test]
    fn test_with_max_fields() {
        let config = MultipartConfig::with_max_fields(1);
        assert_eq!(config.max_fields, 1);
        assert_eq!(config.max_fields_size, DEFAULT_MAX_FIELDS_SIZE);
    }
}
