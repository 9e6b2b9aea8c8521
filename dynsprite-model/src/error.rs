use std::fmt::{self, Display};

/// Errors produced by model constructors and validation routines.
#[derive(Debug)]
pub enum ModelError {
    InvalidDimensions(String),
    InvalidManifest(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidDimensions(msg) => {
                write!(f, "invalid dimensions: {msg}")
            }
            ModelError::InvalidManifest(msg) => {
                write!(f, "invalid manifest: {msg}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
