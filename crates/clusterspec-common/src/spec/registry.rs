//! Image registry: local registry deployment and pull credentials

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_REGISTRY_DATA_ROOT, SUPPORTED_REGISTRY_TYPES};
use crate::defaults::{default_str, SetDefaults};
use crate::validation::format::{is_dns1123_label, is_valid_host_port};
use crate::validation::{check_absolute_path, check_one_of, FieldPath, Validate, ValidationErrors};

/// Registry settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryConfig {
    /// Local registry to deploy: empty, `registry` or `harbor`
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub type_: String,

    /// Registry that replaces upstream registries in image references
    #[serde(skip_serializing_if = "String::is_empty")]
    pub private_registry: String,

    /// Namespace that replaces upstream namespaces in image references
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace_override: String,

    /// Local registry data directory
    #[serde(skip_serializing_if = "String::is_empty")]
    pub data_root: String,

    /// Credentials keyed by registry host
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub auths: BTreeMap<String, RegistryAuth>,
}

/// Credentials and transport options for one registry
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryAuth {
    /// Username
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    /// Password
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Skip TLS verification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_tls_verify: Option<bool>,
    /// Use plain HTTP
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plain_http: Option<bool>,
    /// Directory holding CA and client certificates
    #[serde(skip_serializing_if = "String::is_empty")]
    pub certs_path: String,
}

impl RegistryConfig {
    /// True if a local registry is deployed on the registry hosts
    pub fn deploys_local_registry(&self) -> bool {
        !self.type_.is_empty()
    }
}

impl SetDefaults for RegistryConfig {
    fn set_defaults(&mut self) {
        if self.deploys_local_registry() {
            default_str(&mut self.data_root, DEFAULT_REGISTRY_DATA_ROOT);
        }
        for auth in self.auths.values_mut() {
            auth.set_defaults();
        }
    }
}

impl SetDefaults for RegistryAuth {
    fn set_defaults(&mut self) {
        self.skip_tls_verify.get_or_insert(false);
        self.plain_http.get_or_insert(false);
    }
}

impl Validate for RegistryConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        if self.deploys_local_registry() {
            check_one_of(
                &self.type_,
                SUPPORTED_REGISTRY_TYPES,
                "registry type",
                &path.child("type"),
                errs,
            );
        }

        if !self.private_registry.is_empty() {
            let host = self
                .private_registry
                .split_once('/')
                .map_or(self.private_registry.as_str(), |(host, _)| host);
            if !is_valid_host_port(host) {
                errs.add(
                    &path.child("privateRegistry"),
                    format!("invalid private registry \"{}\"", self.private_registry),
                );
            }
        }

        if !self.namespace_override.is_empty() && !is_dns1123_label(&self.namespace_override) {
            errs.add(
                &path.child("namespaceOverride"),
                format!("invalid namespace override \"{}\"", self.namespace_override),
            );
        }

        check_absolute_path(&self.data_root, &path.child("dataRoot"), errs);

        for (registry, auth) in &self.auths {
            let auth_path = path.child("auths").key(registry);
            if !is_valid_host_port(registry) {
                errs.add(&auth_path, format!("invalid registry host \"{registry}\""));
            }
            auth.validate(&auth_path, errs);
        }
    }
}

impl Validate for RegistryAuth {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        match (self.username.is_empty(), self.password.is_empty()) {
            (false, true) => errs.add(
                &path.child("password"),
                "password is required when username is set",
            ),
            (true, false) => errs.add(
                &path.child("username"),
                "username is required when password is set",
            ),
            _ => {}
        }
        check_absolute_path(&self.certs_path, &path.child("certsPath"), errs);
    }
}
