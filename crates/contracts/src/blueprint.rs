//! FormBlueprint - Config Loader output
//!
//! Describes parser limits and the handler routes to install on a dispatcher.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::MultipartConfig;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete routing blueprint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Parser limits
    #[serde(default)]
    pub limits: MultipartConfig,

    /// File part routes
    #[serde(default)]
    pub files: Vec<FileRouteConfig>,

    /// Field routes
    #[serde(default)]
    pub fields: Vec<FieldRouteConfig>,
}

impl FormBlueprint {
    /// Whether any route is declared
    pub fn has_routes(&self) -> bool {
        !self.files.is_empty() || !self.fields.is_empty()
    }
}

/// Route for file parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRouteConfig {
    /// Field name, or `"*"` for every unmatched file
    pub name: String,

    /// Handler kind
    pub handler: FileHandlerKind,

    /// Handler-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Built-in file handler kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileHandlerKind {
    /// Write the part under `params.base_path`
    Disk,
    /// Log part metadata and discard the bytes
    Log,
    /// Discard the bytes silently
    Discard,
}

/// Route for non-file fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRouteConfig {
    /// Field key, or `"*"` for every unmatched field
    pub name: String,

    /// Handler kind
    pub handler: FieldHandlerKind,
}

/// Built-in field handler kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldHandlerKind {
    /// Log key and value length
    Log,
    /// Keep key/value pairs for the run summary
    Collect,
}
