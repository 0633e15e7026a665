//! Generation options and document dialect selection.

use crate::error::{Error, Result};
use log::debug;
use std::path::PathBuf;

pub const DEFAULT_TITLE: &str = "Swagger Documentation for your application";
pub const DEFAULT_OPENAPI_VERSION: &str = "3.0.2";
pub const DEFAULT_HOST: &str = "localhost:8080";
pub const DEFAULT_SCHEMES: &[&str] = &["http"];
pub const DEFAULT_DIRECTIVE_PREFIX: &str = "hug_";
pub const DEFAULT_RESERVED_ARGUMENTS: &[&str] = &["request", "response"];

/// Prefix of the environment variables read by [`GeneratorOptions::from_env`].
pub const ENV_PREFIX: &str = "SWAGGER_";

/// OpenAPI major version controlling the output document shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Swagger 2.x: `swagger`, `definitions`, inline parameter types
    V2,
    /// OpenAPI 3.x: `openapi`, `components.schemas`, parameter `schema`
    V3,
}

impl Dialect {
    /// Select the dialect from a version string such as `"2.0"` or `"3.0.2"`.
    pub fn from_version(version: &str) -> Self {
        if version.trim_start().starts_with('2') {
            Dialect::V2
        } else {
            Dialect::V3
        }
    }

    /// Prefix of every `$ref` pointing at a registered schema.
    pub fn ref_prefix(&self) -> &'static str {
        match self {
            Dialect::V2 => "#/definitions/",
            Dialect::V3 => "#/components/schemas/",
        }
    }
}

/// Options for one document generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorOptions {
    pub title: String,
    pub version: Option<String>,
    pub openapi_version: String,
    pub host: String,
    pub schemes: Vec<String>,
    pub description: Option<String>,
    /// Rust source file or directory whose `*Schema` structs are pre-registered
    pub definitions_path: Option<PathBuf>,
    /// Document an implicit 200 response for handlers that declare none
    pub use_default_response: bool,
    /// Arguments whose name starts with this prefix are framework-injected
    pub directive_prefix: String,
    /// Argument names that always refer to framework-injected objects
    pub reserved_arguments: Vec<String>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            version: None,
            openapi_version: DEFAULT_OPENAPI_VERSION.to_string(),
            host: DEFAULT_HOST.to_string(),
            schemes: DEFAULT_SCHEMES.iter().map(|s| s.to_string()).collect(),
            description: None,
            definitions_path: None,
            use_default_response: true,
            directive_prefix: DEFAULT_DIRECTIVE_PREFIX.to_string(),
            reserved_arguments: DEFAULT_RESERVED_ARGUMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl GeneratorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_openapi_version(mut self, openapi_version: impl Into<String>) -> Self {
        self.openapi_version = openapi_version.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemes = schemes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_definitions_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.definitions_path = Some(path.into());
        self
    }

    pub fn with_default_response(mut self, enabled: bool) -> Self {
        self.use_default_response = enabled;
        self
    }

    pub fn dialect(&self) -> Dialect {
        Dialect::from_version(&self.openapi_version)
    }

    /// Whether an argument name refers to a framework-injected value.
    pub fn is_reserved_argument(&self, name: &str) -> bool {
        (!self.directive_prefix.is_empty() && name.starts_with(&self.directive_prefix))
            || self.reserved_arguments.iter().any(|reserved| reserved == name)
    }

    /// Defaults overlaid with `SWAGGER_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with `SWAGGER_*` values returned by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let mut options = Self::default();

        if let Some(title) = var("TITLE") {
            options.title = title;
        }
        if let Some(version) = var("VERSION") {
            options.version = Some(version);
        }
        if let Some(openapi_version) = var("OPENAPI_VERSION") {
            options.openapi_version = openapi_version;
        }
        if let Some(host) = var("HOST") {
            options.host = host;
        }
        if let Some(schemes) = var("SCHEMES") {
            options.schemes = schemes
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(description) = var("DESCRIPTION") {
            options.description = Some(description);
        }
        if let Some(path) = var("DEFINITIONS_PATH") {
            options.definitions_path = Some(PathBuf::from(path));
        }
        if let Some(flag) = var("USE_DEFAULT_RESPONSE") {
            options.use_default_response = parse_flag(&flag).ok_or_else(|| {
                Error::InvalidOption(format!(
                    "{}USE_DEFAULT_RESPONSE must be a boolean, got {:?}",
                    ENV_PREFIX, flag
                ))
            })?;
        }

        debug!("Generator options: {:?}", options);
        Ok(options)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
