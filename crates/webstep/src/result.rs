//! Result and error types for Webstep.

use thiserror::Error;

/// Result type for Webstep operations
pub type StepResult<T> = Result<T, StepError>;

/// Errors that can occur while executing a step
#[derive(Debug, Error)]
pub enum StepError {
    /// Test-suite authoring error (missing descriptor, bad config)
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Page identifier absent from the configured page map
    #[error("Unknown page identifier '{identifier}'")]
    UnknownPageIdentifier {
        /// Identifier used by the step
        identifier: String,
    },

    /// A query yielded no element where one was required
    #[error("Couldn't find {subject} matching {selector}{}", context_suffix(.context))]
    ElementNotFound {
        /// Human-readable subject ("link", "button", "field")
        subject: String,
        /// Selector or expression that was evaluated
        selector: String,
        /// Extra diagnostic context
        context: Option<String>,
    },

    /// A query yielded an element where none was allowed
    #[error("Unexpected {subject} found matching {selector}")]
    ElementUnexpectedlyFound {
        /// Human-readable subject
        subject: String,
        /// Selector or expression that was evaluated
        selector: String,
    },

    /// Semantic type with no registered tag mapping
    #[error("Tags for '{type_name}' type not defined")]
    UnsupportedType {
        /// The unknown semantic type
        type_name: String,
    },

    /// Step recognized but not implemented yet
    #[error("Pending: {message}")]
    Pending {
        /// What still needs implementing
        message: String,
    },

    /// No step definition matched the sentence
    #[error("Undefined step: {sentence}")]
    UndefinedStep {
        /// The sentence that did not match
        sentence: String,
    },

    /// Sequential matcher ran out of candidates
    #[error("Couldn't find '{expected}' after '{previous}'")]
    OrderingViolation {
        /// Expected item that could not be matched
        expected: String,
        /// Last successfully matched item (empty before the first match)
        previous: String,
    },

    /// Exact count assertion failed
    #[error("Expected {expected} {what} but found {actual}")]
    CountMismatch {
        /// What was counted
        what: String,
        /// Expected count
        expected: usize,
        /// Actual count
        actual: usize,
    },

    /// Generic assertion failure (expected vs actual)
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Driver cannot perform the requested capability
    #[error("Driver does not support {capability}")]
    UnsupportedCapability {
        /// Capability name (e.g. "script execution")
        capability: String,
    },

    /// File to attach does not exist
    #[error("File '{path}' does not exist")]
    MissingFile {
        /// Path that was checked
        path: String,
    },

    /// Driver-level failure
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

fn context_suffix(context: &Option<String>) -> String {
    context
        .as_ref()
        .map(|c| format!(" ({c})"))
        .unwrap_or_default()
}

impl StepError {
    /// Shorthand for [`StepError::ElementNotFound`] without context
    #[must_use]
    pub fn not_found(subject: impl Into<String>, selector: impl Into<String>) -> Self {
        Self::ElementNotFound {
            subject: subject.into(),
            selector: selector.into(),
            context: None,
        }
    }

    /// Shorthand for [`StepError::Pending`]
    #[must_use]
    pub fn pending(message: impl Into<String>) -> Self {
        Self::Pending {
            message: message.into(),
        }
    }

    /// Shorthand for [`StepError::AssertionFailed`]
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Shorthand for [`StepError::Configuration`]
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True for "not implemented yet" conditions, reported as pending
    /// rather than failed.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedType { .. } | Self::Pending { .. } | Self::UndefinedStep { .. }
        )
    }

    /// True for suite authoring errors that must halt the scenario.
    #[must_use]
    pub const fn is_fatal_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. }
                | Self::UnknownPageIdentifier { .. }
                | Self::Yaml(_)
                | Self::Json(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_without_context() {
        let err = StepError::not_found("link", "//a[@href]");
        assert_eq!(err.to_string(), "Couldn't find link matching //a[@href]");
    }

    #[test]
    fn test_not_found_message_with_context() {
        let err = StepError::ElementNotFound {
            subject: "field".to_string(),
            selector: "//input".to_string(),
            context: Some("form 'article'".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Couldn't find field matching //input (form 'article')"
        );
    }

    #[test]
    fn test_ordering_violation_message() {
        let err = StepError::OrderingViolation {
            expected: "A".to_string(),
            previous: "C".to_string(),
        };
        assert_eq!(err.to_string(), "Couldn't find 'A' after 'C'");
    }

    #[test]
    fn test_count_mismatch_shows_both_values() {
        let err = StepError::CountMismatch {
            what: "table rows".to_string(),
            expected: 3,
            actual: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains('3'));
        assert!(msg.contains('5'));
    }

    #[test]
    fn test_pending_classification() {
        assert!(StepError::pending("x").is_pending());
        assert!(StepError::UnsupportedType {
            type_name: "paragraph".to_string()
        }
        .is_pending());
        assert!(!StepError::assertion("x").is_pending());
    }

    #[test]
    fn test_configuration_classification() {
        assert!(StepError::UnknownPageIdentifier {
            identifier: "home".to_string()
        }
        .is_fatal_configuration());
        assert!(StepError::configuration("x").is_fatal_configuration());
        assert!(!StepError::not_found("link", "//a").is_fatal_configuration());
    }
}
