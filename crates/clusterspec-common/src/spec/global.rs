//! Cluster-wide connection settings inherited by hosts

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{
    DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_SSH_PORT, DEFAULT_USER, DEFAULT_WORK_DIR,
};
use crate::defaults::{default_str, default_zero, SetDefaults};
use crate::validation::{check_absolute_path, check_non_negative, check_port};
use crate::validation::{FieldPath, Validate, ValidationErrors};

/// Defaults applied to every host that does not override them
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalSpec {
    /// SSH user
    pub user: String,

    /// SSH port (0 = unset)
    pub port: i32,

    /// SSH password
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,

    /// Inline SSH private key
    #[serde(skip_serializing_if = "String::is_empty")]
    pub private_key: String,

    /// Path to an SSH private key on the deployment machine
    #[serde(skip_serializing_if = "String::is_empty")]
    pub private_key_path: String,

    /// SSH connection timeout in seconds (0 = unset)
    pub connection_timeout_seconds: i64,

    /// Scratch directory on the deployment machine
    pub work_dir: String,

    /// Verbose task output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,

    /// Continue past failed tasks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_err: Option<bool>,

    /// Skip the preflight phase entirely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_preflight: Option<bool>,
}

impl SetDefaults for GlobalSpec {
    fn set_defaults(&mut self) {
        default_str(&mut self.user, DEFAULT_USER);
        default_zero(&mut self.port, DEFAULT_SSH_PORT);
        default_zero(
            &mut self.connection_timeout_seconds,
            DEFAULT_CONNECTION_TIMEOUT_SECS,
        );
        default_str(&mut self.work_dir, DEFAULT_WORK_DIR);
        self.verbose.get_or_insert(false);
        self.ignore_err.get_or_insert(false);
        self.skip_preflight.get_or_insert(false);
        debug!(user = %self.user, port = self.port, "defaulted global spec");
    }
}

impl Validate for GlobalSpec {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        check_port(self.port.into(), &path.child("port"), errs);
        check_non_negative(
            self.connection_timeout_seconds,
            &path.child("connectionTimeoutSeconds"),
            errs,
        );
        check_absolute_path(&self.work_dir, &path.child("workDir"), errs);
    }
}
