//! Error type shared by all ticket desk crates

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias using [`DeskError`]
pub type Result<T, E = DeskError> = std::result::Result<T, E>;

/// Everything that can go wrong while serving the ticket desk
#[derive(Debug, Error)]
pub enum DeskError {
    /// Required fields for a new ticket are missing or empty
    #[error("No se ha podido crear el ticket :(")]
    Validation,

    /// No ticket with the given id exists
    #[error("No existe el ticket {id}")]
    NotFound {
        /// The id that was looked up
        id: String,
    },

    /// The request payload could not be understood
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The database file does not contain a valid ticket list
    #[error("Corrupt database {}: {source}", path.display())]
    Corrupt {
        /// Path of the database file
        path: PathBuf,
        /// Parser error
        source: serde_json::Error,
    },

    /// Serializing the ticket list failed
    #[error("Could not serialize tickets: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Reading or writing a file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path of the file involved
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// The configuration file is invalid
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DeskError {
    /// HTTP status code used when answering a request with this error
    ///
    /// A failed validation is answered with `200` and an `error` payload.
    pub fn status(&self) -> u16 {
        match self {
            DeskError::Validation => 200,
            DeskError::NotFound { .. } => 404,
            DeskError::BadRequest(_) => 400,
            DeskError::Corrupt { .. }
            | DeskError::Serialize(_)
            | DeskError::Io { .. }
            | DeskError::Config(_) => 500,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DeskError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_answered_with_ok_status() {
        assert_eq!(DeskError::Validation.status(), 200);
        assert_eq!(
            DeskError::Validation.to_string(),
            "No se ha podido crear el ticket :("
        );
    }

    #[test]
    fn missing_ticket_is_not_found() {
        let err = DeskError::NotFound { id: "abc".into() };
        assert_eq!(err.status(), 404);
        assert!(err.to_string().contains("abc"));
    }
}
