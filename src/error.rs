//! Error types for the viewer core
//!
//! Load errors come from missing or corrupt model/texture files. Sequence
//! errors are contract violations by the caller (e.g. finishing a custom
//! object that was never started). The two are kept apart so the UI layer
//! can report the first to the user and treat the second as a bug.

use std::path::PathBuf;

use crate::gfx::scene::ObjectId;

/// A model or texture could not be loaded
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("failed to load model '{}': {source}", path.display())]
    Model {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("failed to load texture '{}': {source}", path.display())]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("model '{}' contains no geometry", path.display())]
    EmptyModel { path: PathBuf },
}

/// An operation was called out of order
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("no custom object is being drawn")]
    NoActiveCustomObject,

    #[error("a custom object is already being drawn")]
    AlreadyActive,

    #[error("handle does not refer to the custom object being drawn")]
    HandleMismatch,

    #[error("no object with id {0:?}")]
    UnknownObject(ObjectId),
}

/// Top-level error returned by the engine facade
#[derive(thiserror::Error, Debug)]
pub enum ViewerError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error("surface error: {0}")]
    Surface(String),
}

impl ViewerError {
    pub fn surface<T: ToString>(msg: T) -> Self {
        ViewerError::Surface(msg.to_string())
    }

    /// True when the error came from a file the user picked
    pub fn is_load_error(&self) -> bool {
        matches!(self, ViewerError::Load(_))
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_errors_are_not_load_errors() {
        let err: ViewerError = SequenceError::NoActiveCustomObject.into();
        assert!(!err.is_load_error());
        assert_eq!(err.to_string(), "no custom object is being drawn");
    }

    #[test]
    fn empty_model_message_names_the_file() {
        let err: ViewerError = LoadError::EmptyModel {
            path: PathBuf::from("models/empty.obj"),
        }
        .into();
        assert!(err.is_load_error());
        assert!(err.to_string().contains("models/empty.obj"));
    }
}
