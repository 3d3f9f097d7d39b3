//! Service error types.
//!
//! Every failure the identity and catalog services report is one of these.
//! All of them are recoverable: the caller renders a message and carries on.
//! Services validate before they mutate, so none of these leave partial state
//! behind.

use thiserror::Error;

/// Failure to authenticate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No account with the given unique ID.
    #[error("invalid unique ID")]
    InvalidCredentials,
}

/// Failure to register a new account.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The unique ID was empty or whitespace.
    #[error("unique ID cannot be empty")]
    EmptyId,

    /// An account with this unique ID already exists.
    #[error("unique ID already taken: {0}")]
    DuplicateId(String),
}

/// Failure to remove an account.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemovalError {
    #[error("account not found: {0}")]
    NotFound(String),

    /// Admin accounts are permanently protected.
    #[error("cannot remove master account: {0}")]
    ProtectedRole(String),
}

impl RemovalError {
    /// Returns `true` if the target exists but is protected from removal.
    pub fn is_protected(&self) -> bool {
        matches!(self, RemovalError::ProtectedRole(_))
    }
}

/// Failure to submit a test.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The topic, or its question list, does not exist.
    #[error("test or topic not found: {0}")]
    NotFound(String),
}

/// Failure to create a topic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    #[error("topic title cannot be empty")]
    EmptyTitle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_id() {
        assert_eq!(
            RegistrationError::DuplicateId("student1".into()).to_string(),
            "unique ID already taken: student1"
        );
        assert_eq!(
            RemovalError::ProtectedRole("KRURA".into()).to_string(),
            "cannot remove master account: KRURA"
        );
        assert_eq!(
            SubmissionError::NotFound("topic-9".into()).to_string(),
            "test or topic not found: topic-9"
        );
    }

    #[test]
    fn protected_classification() {
        assert!(RemovalError::ProtectedRole("a".into()).is_protected());
        assert!(!RemovalError::NotFound("a".into()).is_protected());
    }
}
