//! CLI-specific error types

use agentry::ServiceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not logged in to {0}\n  Run `agentry auth login` or set AGENTRY_TOKEN")]
    NotAuthenticated(String),

    #[error("Registry returned {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Integrity check failed: expected sha256 {expected}, got {actual}\n  The downloaded content was discarded")]
    Integrity { expected: String, actual: String },

    #[error("Registry answered for {actual} but {requested} was requested")]
    UnexpectedPackage { requested: String, actual: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

impl CliError {
    /// Process exit code: 3 for integrity failures, 2 for authentication, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Integrity { .. } | CliError::Service(ServiceError::Integrity { .. }) => 3,
            CliError::NotAuthenticated(_)
            | CliError::Api { status: 401, .. }
            | CliError::Service(ServiceError::Unauthorized) => 2,
            _ => 1,
        }
    }
}

impl From<reqwest::Error> for CliError {
    fn from(e: reqwest::Error) -> Self {
        CliError::Network(e.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let integrity = CliError::Integrity {
            expected: "a".repeat(64),
            actual: "b".repeat(64),
        };
        assert_eq!(integrity.exit_code(), 3);

        let unauthorized = CliError::Api {
            status: 401,
            code: "UNAUTHORIZED".to_string(),
            message: "Invalid or revoked token".to_string(),
        };
        assert_eq!(unauthorized.exit_code(), 2);
        assert_eq!(
            CliError::NotAuthenticated("http://localhost:8080".to_string()).exit_code(),
            2
        );

        let conflict = CliError::Api {
            status: 409,
            code: "CONFLICT".to_string(),
            message: "exists".to_string(),
        };
        assert_eq!(conflict.exit_code(), 1);
        assert_eq!(CliError::Validation("bad".to_string()).exit_code(), 1);
    }
}
