//! Validation pass plumbing
//!
//! Validators never return early with an error. They append every violation
//! they find to a shared [`ValidationErrors`] and keep going, so a user sees
//! all problems in one run.

pub mod errors;
pub mod format;
pub mod index;
pub mod path;

pub use errors::{FieldError, ValidationErrors};
pub use index::{expand_host_pattern, CrossRefIndex};
pub use path::{FieldPath, PathSegment};

/// Read-only consistency checks for one node of the spec tree
pub trait Validate {
    /// Append every violation found under `path` to `errs`
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors);
}

impl<T: Validate> Validate for Option<T> {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        if let Some(inner) = self {
            inner.validate(path, errs);
        }
    }
}

/// Report `value` at `path` unless it is one of `allowed`
pub(crate) fn check_one_of(
    value: &str,
    allowed: &[&str],
    what: &str,
    path: &FieldPath,
    errs: &mut ValidationErrors,
) {
    if !allowed.contains(&value) {
        errs.add(
            path,
            format!(
                "unsupported {what} \"{value}\", must be one of: {}",
                format::one_of(allowed)
            ),
        );
    }
}

/// Report a port outside [1, 65535]
pub(crate) fn check_port(port: i64, path: &FieldPath, errs: &mut ValidationErrors) {
    if !format::is_valid_port(port) {
        errs.add(
            path,
            format!("invalid port {port}: must be between 1 and 65535"),
        );
    }
}

/// Report a negative counter
pub(crate) fn check_non_negative(value: i64, path: &FieldPath, errs: &mut ValidationErrors) {
    if value < 0 {
        errs.add(path, format!("must be non-negative, got {value}"));
    }
}

/// Report a relative path; empty values are left to presence checks
pub(crate) fn check_absolute_path(value: &str, path: &FieldPath, errs: &mut ValidationErrors) {
    if !value.is_empty() && !format::is_absolute_path(value) {
        errs.add(path, format!("\"{value}\" must be an absolute path"));
    }
}

/// Report an empty required string
pub(crate) fn check_required(value: &str, what: &str, path: &FieldPath, errs: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errs.add(path, format!("{what} is required"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysBroken;

    impl Validate for AlwaysBroken {
        fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
            errs.add(path, "broken");
        }
    }

    #[test]
    fn none_is_a_no_op() {
        let mut errs = ValidationErrors::new();
        let value: Option<AlwaysBroken> = None;
        value.validate(&FieldPath::root("spec"), &mut errs);
        assert!(!errs.has_errors());

        Some(AlwaysBroken).validate(&FieldPath::root("spec"), &mut errs);
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn shared_checks_report_consistently() {
        let path = FieldPath::root("spec").child("port");
        let mut errs = ValidationErrors::new();

        check_port(-1, &path, &mut errs);
        check_port(443, &path, &mut errs);
        check_non_negative(-3, &path, &mut errs);
        check_absolute_path("relative/dir", &path, &mut errs);
        check_absolute_path("", &path, &mut errs);
        check_required("  ", "name", &path, &mut errs);
        check_one_of("udp", &["tcp", "http"], "mode", &path, &mut errs);

        let rendered = errs.render();
        assert_eq!(errs.len(), 5);
        assert!(rendered.contains("invalid port -1"));
        assert!(rendered.contains("must be non-negative, got -3"));
        assert!(rendered.contains("\"relative/dir\" must be an absolute path"));
        assert!(rendered.contains("name is required"));
        assert!(rendered.contains("unsupported mode \"udp\", must be one of: tcp, http"));
    }
}
