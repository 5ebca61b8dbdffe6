use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to read input: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Invalid JSON input: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid YAML input: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Top-level document must be an object, found {0}")]
    NotAnObject(&'static str),

    #[error("Failed to upgrade Swagger 2.0 document: {0}")]
    UpgradeError(String),

    #[error("Failed to load OpenAPI document: {0}")]
    LoadError(#[source] serde_json::Error),
}
