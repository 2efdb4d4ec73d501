//! # Config Loader
//!
//! Objects definition loading and parsing module.
//!
//! Responsibilities:
//! - Parse JSON/TOML objects definition files
//! - Validate configuration legality
//! - Generate `ObjectsDefinition`
//! - Collect spawn point overrides from CLI assignments and the environment
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let definition = ConfigLoader::load_from_path(Path::new("objects.json")).unwrap();
//! println!("Objects: {}", definition.objects.len());
//! ```

mod overrides;
mod parser;
mod validator;

pub use contracts::ObjectsDefinition;
pub use overrides::{
    overrides_from_env, overrides_from_vars, parse_assignment, OverrideError,
    SPAWN_POINT_ENV_PREFIX,
};
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.json / .toml).
    ///
    /// # Errors
    /// - File missing or unreadable
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<ObjectsDefinition, ContractError> {
        if !path.exists() {
            return Err(ContractError::config_parse(format!(
                "could not read objects definition from {}",
                path.display()
            )));
        }
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ObjectsDefinition, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Serialize ObjectsDefinition to TOML string
    pub fn to_toml(definition: &ObjectsDefinition) -> Result<String, ContractError> {
        toml::to_string_pretty(definition)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize ObjectsDefinition to JSON string
    pub fn to_json(definition: &ObjectsDefinition) -> Result<String, ContractError> {
        serde_json::to_string_pretty(definition)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ObjectsDefinition, ContractError> {
        let definition = parser::parse(content, format)?;
        validator::validate(&definition)?;
        Ok(definition)
    }
}
