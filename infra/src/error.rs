use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, InfraError>;

/// Errors raised while declaring or synthesizing a stack.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("cannot find asset at {0}")]
    AssetNotFound(PathBuf),

    #[error("asset {0} must be a .zip archive")]
    UnsupportedAsset(PathBuf),

    #[error("invalid construct id '{0}'")]
    InvalidConstructId(String),

    #[error("there is already a construct with id '{id}' in '{scope}'")]
    DuplicateConstruct { scope: String, id: String },

    #[error("logical id '{0}' is already used in this stack")]
    DuplicateLogicalId(String),

    #[error("stack name '{0}' must match /^[A-Za-z][A-Za-z0-9-]*$/ and be at most 128 characters")]
    InvalidStackName(String),

    #[error("stack '{0}' is already part of the app")]
    DuplicateStack(String),

    #[error("resource '{0}' is not declared in this stack")]
    UnknownResource(String),

    #[error("invalid path part '{0}'")]
    InvalidPathPart(String),

    #[error("unsupported HTTP method '{0}'")]
    InvalidHttpMethod(String),

    #[error("method {method} is already defined on resource {path}")]
    DuplicateMethod { method: String, path: String },

    #[error("invalid configuration: {0}")]
    Config(#[from] figment::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
