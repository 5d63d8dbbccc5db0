//! Client-side submission checks
//!
//! Runs before any store call. Anything rejected here never reaches the
//! network.

use thiserror::Error;

use super::MarksPolicy;

/// A submission that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSubmission {
    /// Trimmed candidate name
    pub name: String,
    /// Parsed marks
    pub marks: f64,
}

/// Why a submission was rejected locally
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Name and marks are required")]
    MissingFields,

    #[error("Marks must be a number between {min} and {max}")]
    MarksOutOfRange { min: f64, max: f64 },

    #[error("Marks must be a number")]
    MarksNotANumber,
}

/// Validate raw form input against a marks policy
pub fn validate_submission(
    name: &str,
    marks_text: &str,
    policy: MarksPolicy,
) -> Result<ValidSubmission, ValidationError> {
    let name = name.trim();
    let marks_text = marks_text.trim();

    if name.is_empty() || marks_text.is_empty() {
        return Err(ValidationError::MissingFields);
    }

    // "inf" and "NaN" parse as f64 but are not scores
    let marks = marks_text.parse::<f64>().ok().filter(|m| m.is_finite());

    match (marks, policy) {
        (Some(marks), policy) if policy.accepts(marks) => Ok(ValidSubmission {
            name: name.to_string(),
            marks,
        }),
        (_, MarksPolicy::Bounded { min, max }) => {
            Err(ValidationError::MarksOutOfRange { min, max })
        }
        (_, MarksPolicy::Unbounded) => Err(ValidationError::MarksNotANumber),
    }
}
