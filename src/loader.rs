use log::{debug, info, warn};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::ConvertError;
use crate::models::OpenAPI;
use crate::swagger2;
use crate::validate::{kind_of, validate, validate_raw, ValidationIssue};

/// Major version prefix of the older dialect's `swagger` field
const SWAGGER2_PREFIX: &str = "2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Yaml,
}

impl InputFormat {
    /// YAML for `.yaml`/`.yml` files, JSON for everything else
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => InputFormat::Yaml,
            _ => InputFormat::Json,
        }
    }
}

/// Which dialect the input was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Swagger2,
    OpenApi3,
}

/// A document ready for conversion
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: OpenAPI,
    pub dialect: Dialect,
    /// `swagger` or `openapi` value exactly as declared in the input
    pub declared_version: String,
    pub issues: Vec<ValidationIssue>,
}

pub fn load_file(path: impl AsRef<Path>) -> Result<LoadedDocument, ConvertError> {
    let path = path.as_ref();
    debug!("Loading document from {:?}", path);
    let bytes = fs::read(path)?;
    load_slice(&bytes, InputFormat::from_path(path))
}

pub fn load_slice(bytes: &[u8], format: InputFormat) -> Result<LoadedDocument, ConvertError> {
    let value: Value = match format {
        InputFormat::Json => serde_json::from_slice(bytes)?,
        InputFormat::Yaml => {
            // through serde_yaml::Value so integer keys such as `200:` become strings
            let yaml: serde_yaml::Value = serde_yaml::from_slice(bytes)?;
            serde_json::to_value(yaml)?
        }
    };
    load_value(value)
}

/// Detects the dialect, decodes (upgrading Swagger 2.0 documents) and runs
/// structural validation. Validation issues are logged, never returned as
/// errors.
pub fn load_value(value: Value) -> Result<LoadedDocument, ConvertError> {
    if !value.is_object() {
        return Err(ConvertError::NotAnObject(kind_of(&value)));
    }

    let mut issues = validate_raw(&value);

    let (document, dialect, declared_version) = match swagger_version(&value) {
        Some(version) => {
            info!("Detected Swagger {} document, upgrading", version);
            (swagger2::upgrade(value)?, Dialect::Swagger2, version)
        }
        None => {
            let document: OpenAPI =
                serde_json::from_value(value).map_err(ConvertError::LoadError)?;
            let version = document.openapi.clone();
            debug!("Loaded OpenAPI {} document", version);
            (document, Dialect::OpenApi3, version)
        }
    };

    issues.extend(validate(&document));
    for issue in &issues {
        warn!("Validation: {}", issue);
    }
    if !issues.is_empty() {
        warn!(
            "Document has {} validation issue(s), continuing with it as-is",
            issues.len()
        );
    }

    Ok(LoadedDocument {
        document,
        dialect,
        declared_version,
        issues,
    })
}

/// The `swagger` marker, also when written as an unquoted YAML `2.0`
fn swagger_version(value: &Value) -> Option<String> {
    let version = match value.get("swagger")? {
        Value::String(version) => version.clone(),
        Value::Number(version) => version.to_string(),
        _ => return None,
    };
    version
        .trim_start()
        .starts_with(SWAGGER2_PREFIX)
        .then_some(version)
}
