//! OS-level preparation applied to every node

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_KERNEL_MODULES, DEFAULT_SYSCTL_PARAMS, SUPPORTED_PACKAGE_MANAGERS};
use crate::defaults::{default_list, merge_missing, SetDefaults};
use crate::validation::format::{
    is_valid_ip_or_domain, is_valid_kernel_module, is_valid_sysctl_key, is_valid_timezone,
};
use crate::validation::{check_one_of, FieldPath, Validate, ValidationErrors};

/// Operating system settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemSpec {
    /// NTP servers (IP or domain) used for time sync
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ntp_servers: Vec<String>,

    /// Timezone such as `UTC` or `Asia/Shanghai`; empty leaves the host untouched
    #[serde(skip_serializing_if = "String::is_empty")]
    pub timezone: String,

    /// Package manager override; empty means auto-detect
    #[serde(skip_serializing_if = "String::is_empty")]
    pub package_manager: String,

    /// Extra RPM packages to install
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rpms: Vec<String>,

    /// Extra DEB packages to install
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub debs: Vec<String>,

    /// Shell snippets run before OS preparation
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pre_install_scripts: Vec<String>,

    /// Shell snippets run after OS preparation
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub post_install_scripts: Vec<String>,

    /// Skip OS preparation entirely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_configure_os: Option<bool>,

    /// Kernel modules to load; an explicit empty list loads none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<String>>,

    /// sysctl parameters; baseline keys are added when missing
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sysctl_params: BTreeMap<String, String>,
}

impl SetDefaults for SystemSpec {
    fn set_defaults(&mut self) {
        self.skip_configure_os.get_or_insert(false);
        default_list(&mut self.modules, DEFAULT_KERNEL_MODULES);
        merge_missing(&mut self.sysctl_params, DEFAULT_SYSCTL_PARAMS);
    }
}

impl Validate for SystemSpec {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        for (i, server) in self.ntp_servers.iter().enumerate() {
            if !is_valid_ip_or_domain(server) {
                errs.add(
                    &path.child("ntpServers").index(i),
                    format!("invalid NTP server \"{server}\": must be an IP or domain"),
                );
            }
        }

        if !self.timezone.is_empty() && !is_valid_timezone(&self.timezone) {
            errs.add(
                &path.child("timezone"),
                format!("invalid timezone \"{}\"", self.timezone),
            );
        }

        if !self.package_manager.is_empty() {
            check_one_of(
                &self.package_manager,
                SUPPORTED_PACKAGE_MANAGERS,
                "package manager",
                &path.child("packageManager"),
                errs,
            );
        }

        for (field, packages) in [("rpms", &self.rpms), ("debs", &self.debs)] {
            for (i, pkg) in packages.iter().enumerate() {
                if pkg.trim().is_empty() {
                    errs.add(&path.child(field).index(i), "package name cannot be empty");
                }
            }
        }

        for (field, scripts) in [
            ("preInstallScripts", &self.pre_install_scripts),
            ("postInstallScripts", &self.post_install_scripts),
        ] {
            for (i, script) in scripts.iter().enumerate() {
                if script.trim().is_empty() {
                    errs.add(&path.child(field).index(i), "script cannot be empty");
                }
            }
        }

        for (i, module) in self.modules.iter().flatten().enumerate() {
            if !is_valid_kernel_module(module) {
                errs.add(
                    &path.child("modules").index(i),
                    format!("invalid kernel module name \"{module}\""),
                );
            }
        }

        for key in self.sysctl_params.keys() {
            if !is_valid_sysctl_key(key) {
                errs.add(
                    &path.child("sysctlParams").key(key),
                    format!("invalid sysctl key \"{key}\""),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_baseline_sysctl_without_overwriting() {
        let mut system = SystemSpec {
            sysctl_params: BTreeMap::from([("vm.swappiness".to_string(), "10".to_string())]),
            ..Default::default()
        };
        system.set_defaults();

        assert_eq!(system.sysctl_params["vm.swappiness"], "10");
        assert_eq!(system.sysctl_params["net.ipv4.ip_forward"], "1");
        assert_eq!(system.sysctl_params.len(), DEFAULT_SYSCTL_PARAMS.len());
    }

    #[test]
    fn modules_default_only_when_unset() {
        let mut unset = SystemSpec::default();
        unset.set_defaults();
        assert_eq!(
            unset.modules.as_deref().map(<[String]>::len),
            Some(DEFAULT_KERNEL_MODULES.len())
        );

        let mut explicit = SystemSpec {
            modules: Some(vec![]),
            ..Default::default()
        };
        explicit.set_defaults();
        assert_eq!(explicit.modules, Some(vec![]));
    }

    #[test]
    fn defaulted_system_is_valid() {
        let mut system = SystemSpec::default();
        system.set_defaults();
        let mut errs = ValidationErrors::new();
        system.validate(&FieldPath::root("spec").child("system"), &mut errs);
        assert!(!errs.has_errors(), "{errs}");
    }

    #[test]
    fn reports_invalid_entries() {
        let system = SystemSpec {
            ntp_servers: vec!["pool.ntp.org".to_string(), "bad server".to_string()],
            timezone: "Mars Base".to_string(),
            package_manager: "pacman".to_string(),
            rpms: vec![" ".to_string()],
            post_install_scripts: vec![String::new()],
            modules: Some(vec!["br netfilter".to_string()]),
            sysctl_params: BTreeMap::from([("swappiness".to_string(), "0".to_string())]),
            ..Default::default()
        };
        let mut errs = ValidationErrors::new();
        system.validate(&FieldPath::root("spec").child("system"), &mut errs);

        let rendered = errs.render();
        assert_eq!(errs.len(), 7, "{rendered}");
        assert!(rendered.contains("spec.system.ntpServers[1]"));
        assert!(rendered.contains("spec.system.timezone"));
        assert!(rendered.contains("unsupported package manager \"pacman\""));
        assert!(rendered.contains("spec.system.rpms[0]"));
        assert!(rendered.contains("spec.system.postInstallScripts[0]"));
        assert!(rendered.contains("spec.system.modules[0]"));
        assert!(rendered.contains("spec.system.sysctlParams[swappiness]"));
    }
}
