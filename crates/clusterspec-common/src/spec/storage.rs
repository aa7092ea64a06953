//! Persistent volume provisioners

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_NFS_STORAGE_CLASS, DEFAULT_OPENEBS_BASE_PATH};
use crate::defaults::{default_str, SetDefaults};
use crate::validation::format::{is_dns1123_subdomain, is_valid_ip_or_domain};
use crate::validation::{check_absolute_path, check_required, FieldPath, Validate, ValidationErrors};

/// Storage class served by the OpenEBS local provisioner
const OPENEBS_STORAGE_CLASS: &str = "openebs-hostpath";

/// Storage settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// Storage class marked as the cluster default
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_storage_class: String,

    /// OpenEBS local PV provisioner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openebs: Option<OpenEbsConfig>,

    /// NFS subdir provisioner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nfs: Option<NfsConfig>,
}

/// OpenEBS local PV settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenEbsConfig {
    /// Deploy the provisioner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Host directory backing the volumes
    pub base_path: String,
}

/// NFS provisioner settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NfsConfig {
    /// Deploy the provisioner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// NFS server IP or domain
    #[serde(skip_serializing_if = "String::is_empty")]
    pub server: String,
    /// Exported path
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// Storage class name
    pub storage_class_name: String,
}

impl StorageConfig {
    /// Storage classes provided by the enabled provisioners
    fn provided_classes(&self) -> Vec<&str> {
        let mut classes = Vec::new();
        if self.openebs.as_ref().is_some_and(|o| o.enabled == Some(true)) {
            classes.push(OPENEBS_STORAGE_CLASS);
        }
        if let Some(nfs) = self.nfs.as_ref().filter(|n| n.enabled == Some(true)) {
            classes.push(nfs.storage_class_name.as_str());
        }
        classes
    }
}

impl SetDefaults for StorageConfig {
    fn set_defaults(&mut self) {
        self.openebs.set_defaults();
        self.nfs.set_defaults();
    }
}

impl SetDefaults for OpenEbsConfig {
    fn set_defaults(&mut self) {
        self.enabled.get_or_insert(false);
        default_str(&mut self.base_path, DEFAULT_OPENEBS_BASE_PATH);
    }
}

impl SetDefaults for NfsConfig {
    fn set_defaults(&mut self) {
        self.enabled.get_or_insert(false);
        default_str(&mut self.storage_class_name, DEFAULT_NFS_STORAGE_CLASS);
    }
}

impl Validate for StorageConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        if !self.default_storage_class.is_empty()
            && !self
                .provided_classes()
                .contains(&self.default_storage_class.as_str())
        {
            errs.add(
                &path.child("defaultStorageClass"),
                format!(
                    "default storage class \"{}\" is not provided by any enabled provisioner",
                    self.default_storage_class
                ),
            );
        }
        self.openebs.validate(&path.child("openebs"), errs);
        self.nfs.validate(&path.child("nfs"), errs);
    }
}

impl Validate for OpenEbsConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        check_absolute_path(&self.base_path, &path.child("basePath"), errs);
    }
}

impl Validate for NfsConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        if self.enabled == Some(true) {
            check_required(&self.server, "NFS server", &path.child("server"), errs);
            check_required(&self.path, "NFS export path", &path.child("path"), errs);
        }
        if !self.server.is_empty() && !is_valid_ip_or_domain(&self.server) {
            errs.add(
                &path.child("server"),
                format!("invalid NFS server \"{}\"", self.server),
            );
        }
        check_absolute_path(&self.path, &path.child("path"), errs);
        if !is_dns1123_subdomain(&self.storage_class_name) {
            errs.add(
                &path.child("storageClassName"),
                format!("invalid storage class name \"{}\"", self.storage_class_name),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(config: &StorageConfig) -> ValidationErrors {
        let mut errs = ValidationErrors::new();
        config.validate(&FieldPath::root("spec").child("storage"), &mut errs);
        errs
    }

    #[test]
    fn enabled_nfs_requires_server_and_path() {
        let mut config = StorageConfig {
            nfs: Some(NfsConfig {
                enabled: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        config.set_defaults();

        let errs = validate(&config);
        let rendered = errs.render();
        assert_eq!(errs.len(), 2, "{rendered}");
        assert!(rendered.contains("spec.storage.nfs.server: NFS server is required"));
        assert!(rendered.contains("spec.storage.nfs.path: NFS export path is required"));
    }

    #[test]
    fn default_class_must_come_from_an_enabled_provisioner() {
        let mut config = StorageConfig {
            default_storage_class: "nfs-client".to_string(),
            nfs: Some(NfsConfig {
                enabled: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        config.set_defaults();
        assert_eq!(validate(&config).len(), 1);

        config.nfs = Some(NfsConfig {
            enabled: Some(true),
            server: "nfs.example.com".to_string(),
            path: "/exports/k8s".to_string(),
            storage_class_name: "nfs-client".to_string(),
        });
        let errs = validate(&config);
        assert!(!errs.has_errors(), "{errs}");
    }

    #[test]
    fn openebs_defaults_base_path() {
        let mut config = StorageConfig {
            default_storage_class: "openebs-hostpath".to_string(),
            openebs: Some(OpenEbsConfig {
                enabled: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        config.set_defaults();
        assert_eq!(
            config.openebs.as_ref().map(|o| o.base_path.as_str()),
            Some("/var/openebs/local")
        );
        assert!(!validate(&config).has_errors());
    }
}
