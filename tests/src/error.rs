//! Error types for the test harness.

use thiserror::Error;

pub type TestResult<T> = Result<T, TestError>;

#[derive(Debug, Error)]
pub enum TestError {
    #[error("step '{step}': {message}")]
    AssertionFailed { step: String, message: String },

    #[error("step '{step}': invalid selection: {message}")]
    InvalidSelection { step: String, message: String },

    #[error("fixture schema failed to build: {0}")]
    Schema(String),
}

impl TestError {
    pub fn assertion_failed(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            step: step.into(),
            message: message.into(),
        }
    }

    pub fn invalid_selection(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelection {
            step: step.into(),
            message: message.into(),
        }
    }
}
