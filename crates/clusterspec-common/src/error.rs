//! Error types for clusterspec
//!
//! Validation never fails fast: every violation is collected into a
//! [`ValidationErrors`] sink and surfaced as a single [`Error::Validation`]
//! once the pass has finished.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Main error type for clusterspec operations
#[derive(Debug, Error)]
pub enum Error {
    /// The cluster specification was rejected by the validation pass
    #[error(
        "cluster spec rejected with {} error(s):\n{}",
        .errors.len(),
        .errors.render()
    )]
    Validation {
        /// Every violation found, in traversal order
        errors: ValidationErrors,
    },
}

impl Error {
    /// Wrap a collector into an error
    pub fn validation(errors: ValidationErrors) -> Self {
        Self::Validation { errors }
    }

    /// Returns the collected field errors
    pub fn field_errors(&self) -> &ValidationErrors {
        match self {
            Self::Validation { errors } => errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FieldPath;

    #[test]
    fn validation_error_renders_every_entry() {
        let mut errs = ValidationErrors::new();
        errs.add(
            &FieldPath::root("spec").child("hosts"),
            "must contain at least one host",
        );
        errs.add(
            &FieldPath::root("spec").child("etcd"),
            "etcd section is required",
        );

        let err = Error::validation(errs);
        let msg = err.to_string();

        assert!(msg.starts_with("cluster spec rejected with 2 error(s)"));
        assert!(msg.contains("spec.hosts: must contain at least one host"));
        assert!(msg.contains("spec.etcd: etcd section is required"));
        assert_eq!(err.field_errors().len(), 2);
    }
}
