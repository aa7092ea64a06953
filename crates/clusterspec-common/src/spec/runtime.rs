//! Container runtime selection and containerd settings

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONTAINERD_CONFIG_PATH, DEFAULT_CONTAINERD_REQUIRED_PLUGINS, DEFAULT_CONTAINERD_ROOT,
    DEFAULT_CONTAINERD_STATE, DEFAULT_CONTAINERD_VERSION, DEFAULT_SANDBOX_IMAGE,
    RUNTIME_CONTAINERD, SUPPORTED_RUNTIMES,
};
use crate::defaults::{default_list, default_str, SetDefaults};
use crate::validation::format::{is_valid_host_port, is_valid_url, is_valid_version};
use crate::validation::{check_absolute_path, check_one_of, FieldPath, Validate, ValidationErrors};

/// Container runtime settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerRuntimeConfig {
    /// Runtime: `containerd`, `docker`, `crio` or `isula`
    #[serde(rename = "type")]
    pub type_: String,

    /// Runtime version
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// containerd settings, only valid with the containerd runtime
    #[serde(skip_serializing_if = "Option::is_none")]
    pub containerd: Option<ContainerdConfig>,
}

/// containerd settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerdConfig {
    /// containerd version
    pub version: String,

    /// Mirror endpoints keyed by registry host
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub registry_mirrors: BTreeMap<String, Vec<String>>,

    /// Registries reached over plain HTTP or with unverified TLS
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub insecure_registries: Vec<String>,

    /// Use the systemd cgroup driver for runc
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_systemd_cgroup: Option<bool>,

    /// Path of `config.toml`
    pub config_path: String,

    /// Persistent root directory
    pub root: String,

    /// State directory
    pub state: String,

    /// Pause image
    pub sandbox_image: String,

    /// Plugins to disable
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disabled_plugins: Vec<String>,

    /// Plugins that must load; an explicit empty list requires none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_plugins: Option<Vec<String>>,

    /// Additional config files imported by `config.toml`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,

    /// Raw TOML appended to `config.toml`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub extra_toml_config: String,
}

impl ContainerRuntimeConfig {
    /// True if containerd is the selected runtime
    pub fn is_containerd(&self) -> bool {
        self.type_ == RUNTIME_CONTAINERD
    }
}

impl SetDefaults for ContainerRuntimeConfig {
    fn set_defaults(&mut self) {
        default_str(&mut self.type_, RUNTIME_CONTAINERD);
        if self.is_containerd() {
            if let Some(containerd) = &self.containerd {
                default_str(&mut self.version, &containerd.version);
            }
            default_str(&mut self.version, DEFAULT_CONTAINERD_VERSION);
            let version = self.version.clone();
            let containerd = self.containerd.get_or_insert_with(Default::default);
            default_str(&mut containerd.version, &version);
            containerd.set_defaults();
        }
    }
}

impl SetDefaults for ContainerdConfig {
    fn set_defaults(&mut self) {
        default_str(&mut self.version, DEFAULT_CONTAINERD_VERSION);
        self.use_systemd_cgroup.get_or_insert(true);
        default_str(&mut self.config_path, DEFAULT_CONTAINERD_CONFIG_PATH);
        default_str(&mut self.root, DEFAULT_CONTAINERD_ROOT);
        default_str(&mut self.state, DEFAULT_CONTAINERD_STATE);
        default_str(&mut self.sandbox_image, DEFAULT_SANDBOX_IMAGE);
        default_list(&mut self.required_plugins, DEFAULT_CONTAINERD_REQUIRED_PLUGINS);
    }
}

impl Validate for ContainerRuntimeConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        check_one_of(
            &self.type_,
            SUPPORTED_RUNTIMES,
            "container runtime",
            &path.child("type"),
            errs,
        );

        if !self.version.is_empty() && !is_valid_version(&self.version) {
            errs.add(
                &path.child("version"),
                format!("invalid runtime version \"{}\"", self.version),
            );
        }

        if self.containerd.is_some() && !self.is_containerd() {
            errs.add(
                &path.child("containerd"),
                format!(
                    "containerd configuration is set but the selected runtime is \"{}\"",
                    self.type_
                ),
            );
            return;
        }
        self.containerd.validate(&path.child("containerd"), errs);
    }
}

impl Validate for ContainerdConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        if !self.version.is_empty() && !is_valid_version(&self.version) {
            errs.add(
                &path.child("version"),
                format!("invalid containerd version \"{}\"", self.version),
            );
        }

        for (registry, endpoints) in &self.registry_mirrors {
            let mirror_path = path.child("registryMirrors").key(registry);
            if !is_valid_host_port(registry) {
                errs.add(
                    &mirror_path,
                    format!("invalid registry host \"{registry}\""),
                );
            }
            if endpoints.is_empty() {
                errs.add(&mirror_path, "at least one mirror endpoint is required");
            }
            for (i, endpoint) in endpoints.iter().enumerate() {
                if !is_valid_url(endpoint, &["http", "https"]) {
                    errs.add(
                        &mirror_path.index(i),
                        format!("invalid mirror endpoint \"{endpoint}\": must be an http(s) URL"),
                    );
                }
            }
        }

        for (i, registry) in self.insecure_registries.iter().enumerate() {
            if !is_valid_host_port(registry) {
                errs.add(
                    &path.child("insecureRegistries").index(i),
                    format!("invalid registry \"{registry}\": must be host or host:port"),
                );
            }
        }

        check_absolute_path(&self.config_path, &path.child("configPath"), errs);
        check_absolute_path(&self.root, &path.child("root"), errs);
        check_absolute_path(&self.state, &path.child("state"), errs);
        for (i, import) in self.imports.iter().enumerate() {
            check_absolute_path(import, &path.child("imports").index(i), errs);
        }

        if self.sandbox_image.trim().is_empty() {
            errs.add(&path.child("sandboxImage"), "sandbox image is required");
        }

        for plugin in self.required_plugins.iter().flatten() {
            if self.disabled_plugins.contains(plugin) {
                errs.add(
                    &path.child("disabledPlugins"),
                    format!("plugin \"{plugin}\" is both required and disabled"),
                );
            }
        }
    }
}
