//! Host inventory entries

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::GlobalSpec;
use crate::constants::{
    CONNECTION_TYPE_LOCAL, CONNECTION_TYPE_SSH, DEFAULT_ARCH, DEFAULT_CONNECTION_TIMEOUT_SECS,
    DEFAULT_PRIVATE_KEY_PATH, DEFAULT_SSH_PORT, DEFAULT_USER, SUPPORTED_ARCHES,
    SUPPORTED_CONNECTION_TYPES, TAINT_EFFECTS,
};
use crate::defaults::{default_str, default_zero, SetDefaults};
use crate::validation::format::{is_dns1123_subdomain, is_valid_ip};
use crate::validation::{check_non_negative, check_one_of, check_port, check_required};
use crate::validation::{CrossRefIndex, FieldPath, ValidationErrors};

/// A machine taking part in the cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct HostSpec {
    /// Unique host name, referenced from role groups
    pub name: String,

    /// Address used to reach the host
    pub address: String,

    /// Address used for cluster-internal traffic; defaults to `address`.
    /// A dual-stack pair may be given as `ipv4,ipv6`.
    pub internal_address: String,

    /// SSH port (0 = inherit)
    pub port: i32,

    /// SSH user (empty = inherit)
    pub user: String,

    /// SSH password
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,

    /// Inline SSH private key
    #[serde(skip_serializing_if = "String::is_empty")]
    pub private_key: String,

    /// Path to an SSH private key (empty = inherit)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub private_key_path: String,

    /// Connection type: `ssh` or `local`
    #[serde(rename = "type")]
    pub type_: String,

    /// CPU architecture: `amd64` or `arm64`
    pub arch: String,

    /// SSH connection timeout in seconds (unset = inherit)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,

    /// Roles assigned directly on the host, in addition to role groups
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    /// Node labels applied after join
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Node taints applied after join
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<TaintSpec>,
}

/// A Kubernetes node taint
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TaintSpec {
    /// Taint key
    pub key: String,
    /// Taint value
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    /// NoSchedule, PreferNoSchedule or NoExecute
    pub effect: String,
}

impl HostSpec {
    /// True if the host is the machine running the deployment
    pub fn is_local(&self) -> bool {
        self.type_ == CONNECTION_TYPE_LOCAL
    }

    /// True if at least one SSH authentication method is configured
    pub fn has_ssh_auth(&self) -> bool {
        !self.password.is_empty() || !self.private_key.is_empty() || !self.private_key_path.is_empty()
    }

    /// Fill unset fields, inheriting `port`, `user` and the connection
    /// timeout from `global` when present.
    ///
    /// SSH credentials are inherited as a whole, and only by hosts that
    /// configure no authentication of their own. Without a global section
    /// the hardcoded connection defaults apply.
    pub fn set_defaults_with(&mut self, global: Option<&GlobalSpec>) {
        if let Some(global) = global {
            default_zero(&mut self.port, global.port);
            default_str(&mut self.user, &global.user);
            if !self.has_ssh_auth() {
                self.password.clone_from(&global.password);
                self.private_key.clone_from(&global.private_key);
                self.private_key_path.clone_from(&global.private_key_path);
            }
            if self.timeout_seconds.is_none() && global.connection_timeout_seconds > 0 {
                self.timeout_seconds = Some(global.connection_timeout_seconds);
            }
        }

        default_zero(&mut self.port, DEFAULT_SSH_PORT);
        default_str(&mut self.user, DEFAULT_USER);
        default_str(&mut self.type_, CONNECTION_TYPE_SSH);
        default_str(&mut self.arch, DEFAULT_ARCH);
        if self.internal_address.is_empty() {
            self.internal_address = self.address.clone();
        }
        self.timeout_seconds.get_or_insert(DEFAULT_CONNECTION_TIMEOUT_SECS);

        if !self.is_local() && !self.has_ssh_auth() {
            self.private_key_path = DEFAULT_PRIVATE_KEY_PATH.to_string();
        }
    }

    /// Validate one entry of `spec.hosts`.
    ///
    /// `position` is the entry's index in the list; the index resolves
    /// duplicate names and role references.
    pub fn validate_with(
        &self,
        path: &FieldPath,
        position: usize,
        index: &CrossRefIndex,
        errs: &mut ValidationErrors,
    ) {
        let name_path = path.child("name");
        if self.name.is_empty() {
            errs.add(&name_path, "host name is required");
        } else {
            if !is_dns1123_subdomain(&self.name) {
                errs.add(
                    &name_path,
                    format!(
                        "invalid host name \"{}\": must be a lowercase RFC 1123 subdomain",
                        self.name
                    ),
                );
            }
            if let Some(first) = index.first_position(&self.name) {
                if first != position {
                    errs.add(
                        &name_path,
                        format!(
                            "duplicate host name \"{}\", already declared at index {first}",
                            self.name
                        ),
                    );
                }
            }
        }

        let address_path = path.child("address");
        if self.address.is_empty() {
            errs.add(&address_path, "address is required");
        } else if !is_valid_ip(&self.address) {
            errs.add(
                &address_path,
                format!("invalid IP address \"{}\"", self.address),
            );
        }

        if !self.internal_address.is_empty() {
            let parts: Vec<&str> = self.internal_address.split(',').collect();
            if parts.len() > 2 || parts.iter().any(|p| !is_valid_ip(p.trim())) {
                errs.add(
                    &path.child("internalAddress"),
                    format!(
                        "invalid internal address \"{}\": expected an IP or an ipv4,ipv6 pair",
                        self.internal_address
                    ),
                );
            }
        }

        check_port(self.port.into(), &path.child("port"), errs);

        if !self.type_.is_empty() {
            check_one_of(
                &self.type_,
                SUPPORTED_CONNECTION_TYPES,
                "connection type",
                &path.child("type"),
                errs,
            );
        }
        if !self.arch.is_empty() {
            check_one_of(
                &self.arch,
                SUPPORTED_ARCHES,
                "architecture",
                &path.child("arch"),
                errs,
            );
        }

        if !self.is_local() {
            check_required(&self.user, "user", &path.child("user"), errs);
            if !self.has_ssh_auth() {
                errs.add(
                    path,
                    "at least one SSH authentication method (password, privateKey or privateKeyPath) is required for non-local hosts",
                );
            }
        }

        if let Some(timeout) = self.timeout_seconds {
            check_non_negative(timeout, &path.child("timeoutSeconds"), errs);
        }

        for (i, role) in self.roles.iter().enumerate() {
            let role_path = path.child("roles").index(i);
            if role.is_empty() {
                errs.add(&role_path, "role name cannot be empty");
            } else if !index.is_known_role(role) {
                errs.add(
                    &role_path,
                    format!(
                        "unknown role \"{role}\": not a predefined role or a declared custom role"
                    ),
                );
            }
        }

        for key in self.labels.keys() {
            if key.trim().is_empty() {
                errs.add(&path.child("labels"), "label key cannot be empty");
            }
        }

        for (i, taint) in self.taints.iter().enumerate() {
            let taint_path = path.child("taints").index(i);
            check_required(&taint.key, "taint key", &taint_path.child("key"), errs);
            check_one_of(
                &taint.effect,
                TAINT_EFFECTS,
                "taint effect",
                &taint_path.child("effect"),
                errs,
            );
        }
    }
}

impl SetDefaults for HostSpec {
    fn set_defaults(&mut self) {
        self.set_defaults_with(None);
    }
}
