//! Error taxonomy shared by every `site-agent-*` crate.
//!
//! Errors are distinguished by how the orchestrator should react, not by
//! where they came from. [`ErrorClass`] is that reaction; every
//! `SiteAgentError` variant answers `classify()` once and for all so the
//! workflow adapter never has to pattern-match on error text.

use thiserror::Error;

/// How the orchestrator should react to a failed activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transport/credential hiccups the workflow engine should retry.
    Retryable,
    /// `InvalidArgument`/`NotFound`-shaped errors; retrying won't help.
    Terminal,
    /// Unknown resource kind, missing controller address: never happens at
    /// runtime if startup validation ran; a bug if it does.
    ConfigFatal,
}

pub type SiteAgentResult<T> = Result<T, SiteAgentError>;

#[derive(Debug, Error, Clone)]
pub enum SiteAgentError {
    #[error("[{kind}:{operation}] transport error: {message}")]
    Transport {
        kind: String,
        operation: String,
        message: String,
    },

    #[error("[{kind}:{operation}] credential error: {message}")]
    Credential {
        kind: String,
        operation: String,
        message: String,
    },

    #[error("[{kind}:{operation}] validation error: {message}")]
    Validation {
        kind: String,
        operation: String,
        message: String,
    },

    #[error("[{kind}:{operation}] state conflict: {message}")]
    Conflict {
        kind: String,
        operation: String,
        message: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("activity {operation} for {kind} exceeded its deadline")]
    Timeout { kind: String, operation: String },

    #[error("{0}")]
    Other(String),
}

impl SiteAgentError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            SiteAgentError::Transport { .. } => ErrorClass::Retryable,
            SiteAgentError::Credential { .. } => ErrorClass::Retryable,
            SiteAgentError::Timeout { .. } => ErrorClass::Retryable,
            SiteAgentError::Validation { .. } => ErrorClass::Terminal,
            SiteAgentError::Conflict { .. } => ErrorClass::Terminal,
            SiteAgentError::Config(_) => ErrorClass::ConfigFatal,
            // Unknown errors default to retryable rather than swallowed.
            SiteAgentError::Other(_) => ErrorClass::Retryable,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.classify() == ErrorClass::Retryable
    }

    pub fn wrap(kind: impl Into<String>, operation: impl Into<String>, status: &tonic::Status) -> Self {
        let kind = kind.into();
        let operation = operation.into();
        use tonic::Code::*;
        match status.code() {
            Unavailable | DeadlineExceeded | Aborted | Internal | Unknown | ResourceExhausted => {
                SiteAgentError::Transport {
                    kind,
                    operation,
                    message: status.message().to_string(),
                }
            }
            Unauthenticated | PermissionDenied => SiteAgentError::Credential {
                kind,
                operation,
                message: status.message().to_string(),
            },
            InvalidArgument | NotFound => SiteAgentError::Validation {
                kind,
                operation,
                message: status.message().to_string(),
            },
            AlreadyExists | FailedPrecondition => SiteAgentError::Conflict {
                kind,
                operation,
                message: status.message().to_string(),
            },
            _ => SiteAgentError::Other(status.message().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_retryable() {
        let status = tonic::Status::unavailable("controller restarting");
        let err = SiteAgentError::wrap("vpc", "CreateVpc", &status);
        assert_eq!(err.classify(), ErrorClass::Retryable);
    }

    #[test]
    fn already_exists_is_a_conflict_not_fatal() {
        let status = tonic::Status::already_exists("vpc beta already exists");
        let err = SiteAgentError::wrap("vpc", "CreateVpc", &status);
        assert_eq!(err.classify(), ErrorClass::Terminal);
        assert!(matches!(err, SiteAgentError::Conflict { .. }));
    }

    #[test]
    fn config_errors_never_retry() {
        let err = SiteAgentError::Config("no manager registered for kind".into());
        assert_eq!(err.classify(), ErrorClass::ConfigFatal);
        assert!(!err.is_retryable());
    }
}
