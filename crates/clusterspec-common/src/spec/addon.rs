//! Add-ons installed after the cluster is up

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{
    CHART_REPO_SCHEMES, DEFAULT_ADDON_DELAY_SECS, DEFAULT_ADDON_NAMESPACE, DEFAULT_ADDON_RETRIES,
    DEFAULT_ADDON_TIMEOUT_SECS,
};
use crate::defaults::{default_str, SetDefaults};
use crate::validation::format::{is_dns1123_label, is_dns1123_subdomain, is_valid_url, is_valid_version};
use crate::validation::{check_non_negative, FieldPath, Validate, ValidationErrors};

/// Schemes accepted for remote manifest URLs
const MANIFEST_URL_SCHEMES: &[&str] = &["http", "https"];

/// An add-on and the ordered sources that install it
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Addon {
    /// Unique add-on name
    pub name: String,

    /// Install this add-on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Target namespace
    pub namespace: String,

    /// Install retries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<i32>,

    /// Seconds between retries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<i32>,

    /// Install timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i32>,

    /// Installation sources, applied in order
    pub sources: Vec<AddonSource>,

    /// Commands run before installing
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pre_install: Vec<String>,

    /// Commands run after installing
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub post_install: Vec<String>,
}

/// Exactly one installation method
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AddonSource {
    /// Helm chart
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSource>,

    /// Raw manifests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaml: Option<YamlSource>,
}

/// A Helm chart from a repository or a local path
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartSource {
    /// Chart name in `repo`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Chart repository URL
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repo: String,

    /// Local chart directory or archive; excludes `name` and `repo`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,

    /// Chart version
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// Values files
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values_files: Vec<String>,

    /// Inline values as `key=value`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,

    /// Wait for resources to become ready
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait: Option<bool>,
}

/// Raw manifests by local path or URL
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct YamlSource {
    /// Manifest files, directories or http(s) URLs
    pub path: Vec<String>,
}

impl SetDefaults for Addon {
    fn set_defaults(&mut self) {
        self.enabled.get_or_insert(true);
        default_str(&mut self.namespace, DEFAULT_ADDON_NAMESPACE);
        self.retries.get_or_insert(DEFAULT_ADDON_RETRIES);
        self.delay_seconds.get_or_insert(DEFAULT_ADDON_DELAY_SECS);
        self.timeout_seconds.get_or_insert(DEFAULT_ADDON_TIMEOUT_SECS);
        for source in &mut self.sources {
            if let Some(chart) = source.chart.as_mut() {
                chart.wait.get_or_insert(true);
            }
        }
    }
}

impl Validate for Addon {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        if self.name.is_empty() {
            errs.add(&path.child("name"), "addon name is required");
        } else if !is_dns1123_subdomain(&self.name) {
            errs.add(
                &path.child("name"),
                format!("invalid addon name \"{}\": must be a lowercase RFC 1123 name", self.name),
            );
        }

        if !self.namespace.is_empty() && !is_dns1123_label(&self.namespace) {
            errs.add(
                &path.child("namespace"),
                format!("invalid namespace \"{}\"", self.namespace),
            );
        }

        if let Some(retries) = self.retries {
            check_non_negative(retries.into(), &path.child("retries"), errs);
        }
        if let Some(delay) = self.delay_seconds {
            check_non_negative(delay.into(), &path.child("delaySeconds"), errs);
        }
        if let Some(timeout) = self.timeout_seconds {
            if timeout <= 0 {
                errs.add(
                    &path.child("timeoutSeconds"),
                    format!("must be greater than 0, got {timeout}"),
                );
            }
        }

        if self.enabled != Some(false) && self.sources.is_empty() {
            errs.add(&path.child("sources"), "an enabled addon needs at least one source");
        }
        for (i, source) in self.sources.iter().enumerate() {
            source.validate(&path.child("sources").index(i), errs);
        }
    }
}

impl Validate for AddonSource {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        match (&self.chart, &self.yaml) {
            (None, None) => errs.add(path, "source must define either chart or yaml"),
            (Some(_), Some(_)) => errs.add(path, "source cannot define both chart and yaml"),
            (Some(chart), None) => chart.validate(&path.child("chart"), errs),
            (None, Some(yaml)) => yaml.validate(&path.child("yaml"), errs),
        }
    }
}

impl Validate for ChartSource {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        let has_name = !self.name.is_empty();
        let has_repo = !self.repo.is_empty();

        if !self.path.is_empty() {
            if has_name || has_repo {
                errs.add(
                    &path.child("path"),
                    "chart path cannot be combined with name or repo",
                );
            }
        } else {
            match (has_name, has_repo) {
                (true, false) => errs.add(&path.child("repo"), "repo is required when name is set"),
                (false, true) => errs.add(&path.child("name"), "name is required when repo is set"),
                (false, false) => errs.add(path, "chart needs either a path or a name and repo"),
                (true, true) => {}
            }
        }

        if has_repo && !is_valid_url(&self.repo, CHART_REPO_SCHEMES) {
            errs.add(
                &path.child("repo"),
                format!("invalid chart repository URL \"{}\"", self.repo),
            );
        }

        if !self.version.is_empty() && !is_valid_version(&self.version) {
            errs.add(
                &path.child("version"),
                format!("invalid chart version \"{}\"", self.version),
            );
        }

        for (i, file) in self.values_files.iter().enumerate() {
            if file.trim().is_empty() {
                errs.add(&path.child("valuesFiles").index(i), "values file cannot be empty");
            }
        }

        for (i, value) in self.values.iter().enumerate() {
            let well_formed = value
                .split_once('=')
                .is_some_and(|(key, _)| !key.trim().is_empty());
            if !well_formed {
                errs.add(
                    &path.child("values").index(i),
                    format!("invalid value \"{value}\": expected key=value"),
                );
            }
        }
    }
}

impl Validate for YamlSource {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        if self.path.is_empty() {
            errs.add(&path.child("path"), "at least one manifest path is required");
        }
        for (i, entry) in self.path.iter().enumerate() {
            let entry_path = path.child("path").index(i);
            if entry.trim().is_empty() {
                errs.add(&entry_path, "manifest path cannot be empty");
            } else if entry.contains("://") && !is_valid_url(entry, MANIFEST_URL_SCHEMES) {
                errs.add(
                    &entry_path,
                    format!("invalid manifest URL \"{entry}\": must be an http(s) URL"),
                );
            }
        }
    }
}

/// Validate every addon and report names declared more than once
pub fn validate_addons(addons: &[Addon], path: &FieldPath, errs: &mut ValidationErrors) {
    let mut seen = BTreeSet::new();
    for (i, addon) in addons.iter().enumerate() {
        let addon_path = path.keyed(i, &addon.name);
        if !addon.name.is_empty() && !seen.insert(addon.name.as_str()) {
            errs.add(
                &addon_path.child("name"),
                format!("duplicate addon name \"{}\"", addon.name),
            );
        }
        addon.validate(&addon_path, errs);
    }
}
