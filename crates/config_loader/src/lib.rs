//! # Config Loader
//!
//! Loads the route file of a form dispatcher: parser limits plus the built-in
//! handler to install for each file or field name. TOML and JSON are accepted;
//! every blueprint is validated before it is returned.
//!
//! ```no_run
//! use config_loader::{ConfigLoader, LimitOverrides};
//! use std::path::Path;
//!
//! let overrides = LimitOverrides { max_fields: Some(20), ..Default::default() };
//! let blueprint = ConfigLoader::load_with_overrides(Path::new("form.toml"), overrides)?;
//! println!("File routes: {}", blueprint.files.len());
//! # Ok::<(), contracts::ContractError>(())
//! ```

mod parser;
mod validator;

pub use contracts::FormBlueprint;
pub use parser::ConfigFormat;

use contracts::{ContractError, MultipartConfig};
use std::path::Path;

/// Limit overrides applied on top of a loaded blueprint (e.g. from CLI flags)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitOverrides {
    pub max_fields: Option<usize>,
    pub max_fields_size: Option<usize>,
}

impl LimitOverrides {
    /// Whether no limit is overridden
    pub fn is_empty(&self) -> bool {
        self.max_fields.is_none() && self.max_fields_size.is_none()
    }

    fn apply(&self, limits: &mut MultipartConfig) {
        if let Some(max_fields) = self.max_fields {
            limits.max_fields = max_fields;
        }
        if let Some(max_fields_size) = self.max_fields_size {
            limits.max_fields_size = max_fields_size;
        }
    }
}

/// Loads and validates [`FormBlueprint`] route files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a blueprint, format chosen by extension (.toml / .json)
    ///
    /// # Errors
    /// Read, format, parse or validation failure
    pub fn load_from_path(path: &Path) -> Result<FormBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load a blueprint from a file, then apply `overrides` and validate again
    ///
    /// # Errors
    /// As [`Self::load_from_path`]; an override such as `max_fields = 0` is rejected
    /// like the same value in the file.
    pub fn load_with_overrides(
        path: &Path,
        overrides: LimitOverrides,
    ) -> Result<FormBlueprint, ContractError> {
        let mut blueprint = Self::load_from_path(path)?;
        if !overrides.is_empty() {
            overrides.apply(&mut blueprint.limits);
            validator::validate(&blueprint)?;
        }
        Ok(blueprint)
    }

    /// Parse and validate a blueprint
    ///
    /// # Errors
    /// Parse or validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<FormBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    pub fn to_toml(blueprint: &FormBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(blueprint: &FormBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}
