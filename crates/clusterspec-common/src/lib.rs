//! Common types for clusterspec: the cluster specification tree, the
//! defaulting pass, the validation pass and the error collector.
//!
//! The crate never performs I/O. A loader hands it a parsed [`spec::ClusterSpec`];
//! [`pipeline::process`] fills defaults in place and reports every violation
//! in one pass.

#![deny(missing_docs)]

pub mod constants;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod spec;
pub mod validation;

pub use defaults::SetDefaults;
pub use error::Error;
pub use validation::{CrossRefIndex, FieldError, FieldPath, Validate, ValidationErrors};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// API group of the `Cluster` resource
pub const API_GROUP: &str = "clusterspec.io";

/// Root path segment under which the cluster spec is validated
pub const SPEC_ROOT: &str = "spec";
