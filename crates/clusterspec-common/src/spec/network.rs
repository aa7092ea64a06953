//! Pod networking: CNI plugin selection and plugin-specific settings

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{
    CALICO_ENCAPSULATION_MODES, CALICO_LOG_SEVERITIES, CALICO_POOL_ENCAPSULATIONS,
    DEFAULT_CALICO_BLOCK_SIZE, DEFAULT_CALICO_IPIP_MODE, DEFAULT_CALICO_LOG_SEVERITY,
    DEFAULT_CALICO_TYPHA_REPLICAS, DEFAULT_CALICO_VETH_MTU, DEFAULT_CALICO_VXLAN_MODE,
    DEFAULT_FLANNEL_BACKEND, DEFAULT_KUBE_PODS_CIDR, DEFAULT_KUBE_SERVICE_CIDR,
    DEFAULT_MULTUS_VERSION, PLUGIN_CALICO, PLUGIN_FLANNEL, SUPPORTED_FLANNEL_BACKENDS,
    SUPPORTED_NETWORK_PLUGINS,
};
use crate::defaults::{default_str, SetDefaults};
use crate::validation::format::{cidrs_overlap, is_dns1123_label, is_valid_version, parse_cidr};
use crate::validation::{
    check_non_negative, check_one_of, FieldPath, Validate, ValidationErrors,
};

/// A dual-stack CIDR list holds at most one block per address family
const MAX_CIDRS: usize = 2;
/// Smallest veth MTU accepted
const MIN_VETH_MTU: i32 = 576;
/// Largest veth MTU accepted (jumbo frames)
const MAX_VETH_MTU: i32 = 9000;
/// Calico encapsulation mode that disables the tunnel
const ENCAPSULATION_NEVER: &str = "Never";

/// Cluster networking settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkConfig {
    /// CNI plugin: `calico`, `flannel`, `cilium` or `none`
    pub plugin: String,

    /// Pod CIDR; two comma-separated blocks for dual stack
    pub kube_pods_cidr: String,

    /// Service CIDR; two comma-separated blocks for dual stack
    pub kube_service_cidr: String,

    /// Calico settings, only valid with the calico plugin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calico: Option<CalicoConfig>,

    /// Flannel settings, only valid with the flannel plugin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flannel: Option<FlannelConfig>,

    /// Multus meta-plugin, usable with any primary CNI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multus: Option<MultusConfig>,
}

/// Calico settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CalicoConfig {
    /// IP-in-IP mode: `Always`, `CrossSubnet` or `Never`
    pub ipip_mode: String,
    /// VXLAN mode: `Always`, `CrossSubnet` or `Never`
    pub vxlan_mode: String,
    /// veth MTU
    #[serde(skip_serializing_if = "Option::is_none")]
    pub veth_mtu: Option<i32>,
    /// Masquerade traffic leaving the pod network
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_nat_outgoing: Option<bool>,
    /// Create the default IP pool from the pod CIDR
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_ip_pool: Option<bool>,
    /// Deploy typha
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typha_enabled: Option<bool>,
    /// typha replicas
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typha_replicas: Option<i32>,
    /// Felix log severity
    pub log_severity_screen: String,
    /// Additional IP pools
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ip_pools: Vec<CalicoIpPool>,
}

/// One Calico IP pool
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CalicoIpPool {
    /// Pool name
    pub name: String,
    /// Pool CIDR
    pub cidr: String,
    /// Encapsulation for this pool
    #[serde(skip_serializing_if = "String::is_empty")]
    pub encapsulation: String,
    /// Masquerade traffic leaving this pool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nat_outgoing: Option<bool>,
    /// Per-node block size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_size: Option<i32>,
}

/// Flannel settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FlannelConfig {
    /// Backend: `vxlan`, `host-gw`, `udp` or `wireguard`
    pub backend_mode: String,
    /// Route directly between hosts on the same subnet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_routing: Option<bool>,
}

/// Multus settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MultusConfig {
    /// Deploy multus
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// multus version
    pub version: String,
}

/// Split a comma-separated CIDR list, ignoring blanks around entries
fn split_cidrs(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

impl SetDefaults for NetworkConfig {
    fn set_defaults(&mut self) {
        default_str(&mut self.plugin, PLUGIN_CALICO);
        default_str(&mut self.kube_pods_cidr, DEFAULT_KUBE_PODS_CIDR);
        default_str(&mut self.kube_service_cidr, DEFAULT_KUBE_SERVICE_CIDR);

        match self.plugin.as_str() {
            PLUGIN_CALICO => self.calico.get_or_insert_with(Default::default).set_defaults(),
            PLUGIN_FLANNEL => self.flannel.get_or_insert_with(Default::default).set_defaults(),
            _ => {}
        }
        self.multus.set_defaults();
    }
}

impl SetDefaults for CalicoConfig {
    fn set_defaults(&mut self) {
        default_str(&mut self.ipip_mode, DEFAULT_CALICO_IPIP_MODE);
        default_str(&mut self.vxlan_mode, DEFAULT_CALICO_VXLAN_MODE);
        self.veth_mtu.get_or_insert(DEFAULT_CALICO_VETH_MTU);
        self.ipv4_nat_outgoing.get_or_insert(true);
        self.default_ip_pool.get_or_insert(true);
        self.typha_enabled.get_or_insert(false);
        self.typha_replicas.get_or_insert(DEFAULT_CALICO_TYPHA_REPLICAS);
        default_str(&mut self.log_severity_screen, DEFAULT_CALICO_LOG_SEVERITY);
        for pool in &mut self.ip_pools {
            pool.nat_outgoing.get_or_insert(true);
            pool.block_size.get_or_insert(DEFAULT_CALICO_BLOCK_SIZE);
        }
    }
}

impl SetDefaults for FlannelConfig {
    fn set_defaults(&mut self) {
        default_str(&mut self.backend_mode, DEFAULT_FLANNEL_BACKEND);
        self.direct_routing.get_or_insert(false);
    }
}

impl SetDefaults for MultusConfig {
    fn set_defaults(&mut self) {
        self.enabled.get_or_insert(false);
        default_str(&mut self.version, DEFAULT_MULTUS_VERSION);
    }
}

impl NetworkConfig {
    fn validate_cidr_list(
        value: &str,
        field: &str,
        path: &FieldPath,
        errs: &mut ValidationErrors,
    ) {
        let cidr_path = path.child(field);
        let blocks = split_cidrs(value);
        if blocks.is_empty() {
            errs.add(&cidr_path, "CIDR is required");
            return;
        }
        if blocks.len() > MAX_CIDRS {
            errs.add(
                &cidr_path,
                format!("at most {MAX_CIDRS} CIDR blocks are allowed, got {}", blocks.len()),
            );
        }
        let mut families = BTreeSet::new();
        for block in &blocks {
            match parse_cidr(block) {
                Some((addr, _)) => {
                    if !families.insert(addr.is_ipv4()) {
                        errs.add(
                            &cidr_path,
                            format!("dual-stack CIDR list has two blocks of the same family: \"{value}\""),
                        );
                    }
                }
                None => errs.add(&cidr_path, format!("invalid CIDR \"{block}\"")),
            }
        }
    }
}

impl Validate for NetworkConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        check_one_of(
            &self.plugin,
            SUPPORTED_NETWORK_PLUGINS,
            "network plugin",
            &path.child("plugin"),
            errs,
        );

        Self::validate_cidr_list(&self.kube_pods_cidr, "kubePodsCidr", path, errs);
        Self::validate_cidr_list(&self.kube_service_cidr, "kubeServiceCidr", path, errs);

        for pod in split_cidrs(&self.kube_pods_cidr) {
            for svc in split_cidrs(&self.kube_service_cidr) {
                if cidrs_overlap(pod, svc) {
                    errs.add(
                        &path.child("kubeServiceCidr"),
                        format!("service CIDR \"{svc}\" overlaps pod CIDR \"{pod}\""),
                    );
                }
            }
        }

        let sub_configs = [
            (PLUGIN_CALICO, self.calico.is_some()),
            (PLUGIN_FLANNEL, self.flannel.is_some()),
        ];
        for (plugin, present) in sub_configs {
            if present && self.plugin != plugin {
                errs.add(
                    &path.child(plugin),
                    format!(
                        "{plugin} configuration is set but the selected plugin is \"{}\"",
                        self.plugin
                    ),
                );
            }
        }

        self.calico.validate(&path.child("calico"), errs);
        self.flannel.validate(&path.child("flannel"), errs);
        self.multus.validate(&path.child("multus"), errs);
    }
}

impl Validate for CalicoConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        check_one_of(
            &self.ipip_mode,
            CALICO_ENCAPSULATION_MODES,
            "IPIP mode",
            &path.child("ipipMode"),
            errs,
        );
        check_one_of(
            &self.vxlan_mode,
            CALICO_ENCAPSULATION_MODES,
            "VXLAN mode",
            &path.child("vxlanMode"),
            errs,
        );
        if self.ipip_mode != ENCAPSULATION_NEVER && self.vxlan_mode != ENCAPSULATION_NEVER {
            errs.add(path, "ipipMode and vxlanMode cannot both be enabled");
        }

        if let Some(mtu) = self.veth_mtu {
            if !(MIN_VETH_MTU..=MAX_VETH_MTU).contains(&mtu) {
                errs.add(
                    &path.child("vethMtu"),
                    format!("MTU {mtu} must be between {MIN_VETH_MTU} and {MAX_VETH_MTU}"),
                );
            }
        }

        if let Some(replicas) = self.typha_replicas {
            check_non_negative(replicas.into(), &path.child("typhaReplicas"), errs);
        }

        check_one_of(
            &self.log_severity_screen,
            CALICO_LOG_SEVERITIES,
            "log severity",
            &path.child("logSeverityScreen"),
            errs,
        );

        let mut names = BTreeSet::new();
        for (i, pool) in self.ip_pools.iter().enumerate() {
            let pool_path = path.child("ipPools").keyed(i, &pool.name);
            if pool.name.is_empty() {
                errs.add(&pool_path.child("name"), "pool name is required");
            } else if !is_dns1123_label(&pool.name) {
                errs.add(
                    &pool_path.child("name"),
                    format!("invalid pool name \"{}\"", pool.name),
                );
            } else if !names.insert(pool.name.as_str()) {
                errs.add(
                    &pool_path.child("name"),
                    format!("duplicate pool name \"{}\"", pool.name),
                );
            }
            pool.validate(&pool_path, errs);
        }
    }
}

impl Validate for CalicoIpPool {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        let parsed = parse_cidr(&self.cidr);
        if parsed.is_none() {
            errs.add(
                &path.child("cidr"),
                format!("invalid CIDR \"{}\"", self.cidr),
            );
        }

        if !self.encapsulation.is_empty() {
            check_one_of(
                &self.encapsulation,
                CALICO_POOL_ENCAPSULATIONS,
                "pool encapsulation",
                &path.child("encapsulation"),
                errs,
            );
        }

        if let Some(size) = self.block_size {
            let (min, max) = match parsed {
                Some((addr, _)) if addr.is_ipv6() => (116, 128),
                _ => (20, 32),
            };
            if !(min..=max).contains(&size) {
                errs.add(
                    &path.child("blockSize"),
                    format!("block size {size} must be between {min} and {max}"),
                );
            }
        }
    }
}

impl Validate for FlannelConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        check_one_of(
            &self.backend_mode,
            SUPPORTED_FLANNEL_BACKENDS,
            "flannel backend",
            &path.child("backendMode"),
            errs,
        );
    }
}

impl Validate for MultusConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        if !self.version.is_empty() && !is_valid_version(&self.version) {
            errs.add(
                &path.child("version"),
                format!("invalid multus version \"{}\"", self.version),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(config: &NetworkConfig) -> ValidationErrors {
        let mut errs = ValidationErrors::new();
        config.validate(&FieldPath::root("spec").child("network"), &mut errs);
        errs
    }

    #[test]
    fn calico_sub_config_created_for_calico_only() {
        let mut calico = NetworkConfig::default();
        calico.set_defaults();
        assert_eq!(calico.plugin, "calico");
        assert_eq!(calico.calico.as_ref().and_then(|c| c.veth_mtu), Some(1440));
        assert!(calico.flannel.is_none());
        assert!(!validate(&calico).has_errors());

        let mut flannel = NetworkConfig {
            plugin: "flannel".to_string(),
            ..Default::default()
        };
        flannel.set_defaults();
        assert!(flannel.calico.is_none());
        assert_eq!(
            flannel.flannel.as_ref().map(|f| f.backend_mode.as_str()),
            Some("vxlan")
        );
        assert!(!validate(&flannel).has_errors());

        let mut cilium = NetworkConfig {
            plugin: "cilium".to_string(),
            ..Default::default()
        };
        cilium.set_defaults();
        assert!(cilium.calico.is_none() && cilium.flannel.is_none());
    }

    /// Story: A leftover calico block after switching to flannel is flagged
    #[test]
    fn story_sub_config_must_match_plugin() {
        let mut config = NetworkConfig {
            plugin: "flannel".to_string(),
            calico: Some(CalicoConfig::default()),
            ..Default::default()
        };
        config.set_defaults();

        let errs = validate(&config);
        assert!(errs
            .render()
            .contains("spec.network.calico: calico configuration is set but the selected plugin is \"flannel\""));
    }

    #[test]
    fn overlapping_pod_and_service_cidrs() {
        let mut config = NetworkConfig {
            kube_pods_cidr: "10.0.0.0/16".to_string(),
            kube_service_cidr: "10.0.128.0/20".to_string(),
            ..Default::default()
        };
        config.set_defaults();
        let errs = validate(&config);
        assert_eq!(errs.len(), 1);
        assert!(errs.render().contains("overlaps pod CIDR"));
    }

    #[test]
    fn dual_stack_cidrs_are_accepted() {
        let mut config = NetworkConfig {
            kube_pods_cidr: "10.233.64.0/18, fd85:ee78:d8a6:8607::1:0000/112".to_string(),
            kube_service_cidr: "10.233.0.0/18,fd85:ee78:d8a6:8607::1000/116".to_string(),
            ..Default::default()
        };
        config.set_defaults();
        let errs = validate(&config);
        assert!(!errs.has_errors(), "{errs}");
    }

    #[test]
    fn reports_invalid_cidrs_and_calico_fields() {
        let mut config = NetworkConfig {
            kube_pods_cidr: "10.0.0.0/33".to_string(),
            calico: Some(CalicoConfig {
                ipip_mode: "Always".to_string(),
                vxlan_mode: "CrossSubnet".to_string(),
                veth_mtu: Some(100),
                ip_pools: vec![
                    CalicoIpPool {
                        name: "pool-a".to_string(),
                        cidr: "10.1.0.0/16".to_string(),
                        block_size: Some(33),
                        ..Default::default()
                    },
                    CalicoIpPool {
                        name: "pool-a".to_string(),
                        cidr: "10.2.0.0/16".to_string(),
                        encapsulation: "GRE".to_string(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }),
            ..Default::default()
        };
        config.set_defaults();

        let errs = validate(&config);
        let rendered = errs.render();
        assert_eq!(errs.len(), 6, "{rendered}");
        assert!(rendered.contains("spec.network.kubePodsCidr: invalid CIDR \"10.0.0.0/33\""));
        assert!(rendered.contains("spec.network.calico: ipipMode and vxlanMode cannot both be enabled"));
        assert!(rendered.contains("spec.network.calico.vethMtu"));
        assert!(rendered.contains("spec.network.calico.ipPools[0:pool-a].blockSize"));
        assert!(rendered.contains("spec.network.calico.ipPools[1:pool-a].name: duplicate pool name"));
        assert!(rendered.contains("spec.network.calico.ipPools[1:pool-a].encapsulation"));
    }
}
