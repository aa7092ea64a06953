//! Kubernetes control plane and kubelet settings

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CGROUP_DRIVER, DEFAULT_CLUSTER_NAME, DEFAULT_DNS_DOMAIN, DEFAULT_EVICTION_HARD,
    DEFAULT_KUBERNETES_VERSION, DEFAULT_MAX_PODS, DEFAULT_NODE_CIDR_MASK_SIZE, DEFAULT_PROXY_MODE,
    DEFAULT_SERVICE_NODE_PORT_RANGE, KUBERNETES_TYPE_KUBEADM, SUPPORTED_CGROUP_DRIVERS,
    SUPPORTED_KUBERNETES_TYPES, SUPPORTED_PROXY_MODES,
};
use crate::defaults::{default_str, merge_missing, SetDefaults};
use crate::validation::format::{
    is_dns1123_label, is_valid_domain, is_valid_ip, is_valid_version, is_valid_wildcard_domain,
    parse_port_range,
};
use crate::validation::{check_one_of, FieldPath, Validate, ValidationErrors};

/// Smallest per-node pod CIDR mask accepted
const MIN_NODE_CIDR_MASK_SIZE: i32 = 16;
/// Largest per-node pod CIDR mask accepted
const MAX_NODE_CIDR_MASK_SIZE: i32 = 28;

/// Kubernetes cluster settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct KubernetesConfig {
    /// Deployment type: `kubeadm` or `binary`
    #[serde(rename = "type")]
    pub type_: String,

    /// Kubernetes version, e.g. `v1.30.2`
    pub version: String,

    /// Cluster name
    pub cluster_name: String,

    /// Cluster DNS domain
    pub dns_domain: String,

    /// kube-proxy mode
    pub proxy_mode: String,

    /// kube-apiserver settings
    pub api_server: ApiServerConfig,

    /// kubelet settings
    pub kubelet: KubeletConfig,

    /// kube-controller-manager settings
    pub controller_manager: ControllerManagerConfig,

    /// Feature gates passed to every component
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_gates: BTreeMap<String, bool>,

    /// Renew control plane certificates automatically
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_renew_certs: Option<bool>,
}

/// kube-apiserver settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiServerConfig {
    /// Extra subject alternative names for the serving certificate
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cert_extra_sans: Vec<String>,

    /// NodePort range as `low-high`
    pub service_node_port_range: String,

    /// Admission plugins to enable
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub admission_plugins: Vec<String>,

    /// Extra command line flags
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_args: BTreeMap<String, String>,
}

/// kubelet settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct KubeletConfig {
    /// cgroup driver: `systemd` or `cgroupfs`
    pub cgroup_driver: String,

    /// Maximum pods per node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pods: Option<i32>,

    /// Hard eviction thresholds; baseline signals are added when missing
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub eviction_hard: BTreeMap<String, String>,

    /// Extra command line flags
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_args: BTreeMap<String, String>,
}

/// kube-controller-manager settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerManagerConfig {
    /// Per-node pod CIDR mask size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_cidr_mask_size: Option<i32>,

    /// Extra command line flags
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_args: BTreeMap<String, String>,
}

impl SetDefaults for KubernetesConfig {
    fn set_defaults(&mut self) {
        default_str(&mut self.type_, KUBERNETES_TYPE_KUBEADM);
        default_str(&mut self.version, DEFAULT_KUBERNETES_VERSION);
        default_str(&mut self.cluster_name, DEFAULT_CLUSTER_NAME);
        default_str(&mut self.dns_domain, DEFAULT_DNS_DOMAIN);
        default_str(&mut self.proxy_mode, DEFAULT_PROXY_MODE);
        self.auto_renew_certs.get_or_insert(true);

        default_str(
            &mut self.api_server.service_node_port_range,
            DEFAULT_SERVICE_NODE_PORT_RANGE,
        );

        default_str(&mut self.kubelet.cgroup_driver, DEFAULT_CGROUP_DRIVER);
        self.kubelet.max_pods.get_or_insert(DEFAULT_MAX_PODS);
        merge_missing(&mut self.kubelet.eviction_hard, DEFAULT_EVICTION_HARD);

        self.controller_manager
            .node_cidr_mask_size
            .get_or_insert(DEFAULT_NODE_CIDR_MASK_SIZE);
    }
}

impl Validate for KubernetesConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        check_one_of(
            &self.type_,
            SUPPORTED_KUBERNETES_TYPES,
            "kubernetes type",
            &path.child("type"),
            errs,
        );

        if !is_valid_version(&self.version) {
            errs.add(
                &path.child("version"),
                format!("invalid kubernetes version \"{}\"", self.version),
            );
        }

        if !is_dns1123_label(&self.cluster_name) {
            errs.add(
                &path.child("clusterName"),
                format!(
                    "invalid cluster name \"{}\": must be a lowercase RFC 1123 label",
                    self.cluster_name
                ),
            );
        }

        if !is_valid_domain(&self.dns_domain) {
            errs.add(
                &path.child("dnsDomain"),
                format!("invalid DNS domain \"{}\"", self.dns_domain),
            );
        }

        check_one_of(
            &self.proxy_mode,
            SUPPORTED_PROXY_MODES,
            "proxy mode",
            &path.child("proxyMode"),
            errs,
        );

        self.api_server.validate(&path.child("apiServer"), errs);
        self.kubelet.validate(&path.child("kubelet"), errs);
        self.controller_manager
            .validate(&path.child("controllerManager"), errs);

        for gate in self.feature_gates.keys() {
            if gate.trim().is_empty() {
                errs.add(&path.child("featureGates"), "feature gate name cannot be empty");
            }
        }
    }
}

impl Validate for ApiServerConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        for (i, san) in self.cert_extra_sans.iter().enumerate() {
            if !is_valid_ip(san) && !is_valid_wildcard_domain(san) {
                errs.add(
                    &path.child("certExtraSans").index(i),
                    format!("invalid certificate SAN \"{san}\": must be an IP or domain"),
                );
            }
        }

        if parse_port_range(&self.service_node_port_range).is_none() {
            errs.add(
                &path.child("serviceNodePortRange"),
                format!(
                    "invalid node port range \"{}\": expected low-high with 1 <= low < high <= 65535",
                    self.service_node_port_range
                ),
            );
        }

        for (i, plugin) in self.admission_plugins.iter().enumerate() {
            if plugin.trim().is_empty() {
                errs.add(
                    &path.child("admissionPlugins").index(i),
                    "admission plugin name cannot be empty",
                );
            }
        }

        validate_extra_args(&self.extra_args, path, errs);
    }
}

impl Validate for KubeletConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        check_one_of(
            &self.cgroup_driver,
            SUPPORTED_CGROUP_DRIVERS,
            "cgroup driver",
            &path.child("cgroupDriver"),
            errs,
        );

        if let Some(max_pods) = self.max_pods {
            if max_pods <= 0 {
                errs.add(
                    &path.child("maxPods"),
                    format!("must be greater than 0, got {max_pods}"),
                );
            }
        }

        for (signal, threshold) in &self.eviction_hard {
            if threshold.trim().is_empty() {
                errs.add(
                    &path.child("evictionHard").key(signal),
                    "eviction threshold cannot be empty",
                );
            }
        }

        validate_extra_args(&self.extra_args, path, errs);
    }
}

impl Validate for ControllerManagerConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        if let Some(mask) = self.node_cidr_mask_size {
            if !(MIN_NODE_CIDR_MASK_SIZE..=MAX_NODE_CIDR_MASK_SIZE).contains(&mask) {
                errs.add(
                    &path.child("nodeCidrMaskSize"),
                    format!(
                        "node CIDR mask size {mask} must be between {MIN_NODE_CIDR_MASK_SIZE} and {MAX_NODE_CIDR_MASK_SIZE}"
                    ),
                );
            }
        }
        validate_extra_args(&self.extra_args, path, errs);
    }
}

fn validate_extra_args(
    args: &BTreeMap<String, String>,
    path: &FieldPath,
    errs: &mut ValidationErrors,
) {
    if args.keys().any(|k| k.trim().is_empty()) {
        errs.add(&path.child("extraArgs"), "argument name cannot be empty");
    }
}
