//! Logic for loading configuration in to an object model

use std::path::Path;
use std::str::FromStr;

use derivative::Derivative;
use displaydoc::Display;
use schemars::gen::SchemaSettings;
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Nesting deeper than this is rejected before any field is called.
pub(crate) const DEFAULT_MAX_DEPTH: usize = 512;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not read configuration file: {0}
    CannotReadFile(std::io::Error),
    /// could not deserialize configuration: {0}
    DeserializeConfigError(serde_yaml::Error),
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
}

/// Server configuration.
///
/// Can be created through `serde::Deserialize` from YAML or JSON, or inline
/// in Rust code with [`Configuration::builder`].
#[derive(Clone, Derivative, Deserialize, Serialize, JsonSchema, Default, PartialEq)]
#[derivative(Debug)]
#[serde(deny_unknown_fields, default)]
pub struct Configuration {
    /// Memoization of field results.
    pub cache: Cache,

    /// Resolution limits.
    pub limits: Limits,
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder]
    pub fn new(cache: Option<Cache>, limits: Option<Limits>) -> Result<Self, ConfigurationError> {
        let configuration = Self {
            cache: cache.unwrap_or_default(),
            limits: limits.unwrap_or_default(),
        };
        configuration.validate()?;
        Ok(configuration)
    }
}

impl Configuration {
    /// Reads a YAML (or JSON) configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let raw =
            std::fs::read_to_string(path.as_ref()).map_err(ConfigurationError::CannotReadFile)?;
        let configuration: Configuration =
            serde_yaml::from_str(&raw).map_err(ConfigurationError::DeserializeConfigError)?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigurationError> {
        if self.limits.max_depth == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "limits.max_depth must be at least 1",
                error: "got 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Parse configuration from a string in YAML syntax
impl FromStr for Configuration {
    type Err = serde_yaml::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_yaml::from_str(s)
    }
}

/// Memoization of field results by call identity.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Cache {
    /// Share results between calls with the same identity, within one server.
    /// Tainted and meta fields are never shared.
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Limits {
    /// Maximum nesting depth of a selection set; defaults to 512
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// The JSON schema of [`Configuration`].
pub fn generate_config_schema() -> RootSchema {
    let settings = SchemaSettings::draft07().with(|s| {
        s.option_nullable = true;
        s.option_add_null_type = false;
        s.inline_subschemas = true;
    });
    settings.into_generator().into_root_schema_for::<Configuration>()
}
