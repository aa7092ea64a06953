//! Control plane high availability: external VIP or per-node proxies

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_APISERVER_PORT, DEFAULT_HAPROXY_BALANCE, DEFAULT_KEEPALIVED_AUTH_PASS,
    DEFAULT_KEEPALIVED_AUTH_TYPE, DEFAULT_KEEPALIVED_VRID, DEFAULT_LB_BIND_ADDRESS,
    DEFAULT_LB_INTERFACE, DEFAULT_LB_MODE, DEFAULT_NGINX_BALANCE, HAPROXY_BALANCE_ALGORITHMS,
    INTERNAL_LB_HAPROXY, INTERNAL_LB_KUBE_VIP, KEEPALIVED_AUTH_TYPES, LB_TYPE_KEEPALIVED_HAPROXY,
    LB_TYPE_KEEPALIVED_NGINX, MAX_KEEPALIVED_AUTH_PASS_LEN, NGINX_BALANCE_ALGORITHMS,
    SUPPORTED_EXTERNAL_LB_TYPES, SUPPORTED_INTERNAL_LB_TYPES, SUPPORTED_LB_MODES,
};
use crate::defaults::{default_str, default_zero, SetDefaults};
use crate::validation::format::is_valid_ip;
use crate::validation::{check_one_of, check_port, FieldPath, Validate, ValidationErrors};

/// Valid keepalived virtual router ids
const VRID_RANGE: std::ops::RangeInclusive<i32> = 1..=255;

/// High availability settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct HighAvailabilityConfig {
    /// Enable a highly available control plane
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Load balancer in front of the masters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalLoadBalancerConfig>,

    /// Per-node proxy to the masters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal: Option<InternalLoadBalancerConfig>,
}

/// Load balancer in front of the masters
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalLoadBalancerConfig {
    /// Enable the external load balancer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// `keepalived-haproxy`, `keepalived-nginx` or `external`
    #[serde(rename = "type")]
    pub type_: String,

    /// Keepalived settings for self-managed types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keepalived: Option<KeepalivedConfig>,

    /// HAProxy settings for `keepalived-haproxy`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub haproxy: Option<HAProxyConfig>,

    /// nginx settings for `keepalived-nginx`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nginx: Option<NginxLbConfig>,
}

/// Keepalived VRRP settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct KeepalivedConfig {
    /// Virtual router id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrid: Option<i32>,
    /// Interface carrying the VIP
    pub interface: String,
    /// `PASS` or `AH`
    pub auth_type: String,
    /// Shared VRRP secret
    pub auth_pass: String,
}

/// HAProxy frontend settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct HAProxyConfig {
    /// Frontend bind address
    pub frontend_bind_address: String,
    /// Frontend port (0 = unset)
    pub frontend_port: i32,
    /// `tcp` or `http`
    pub mode: String,
    /// Balance algorithm
    pub balance_algorithm: String,
}

/// nginx stream proxy settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NginxLbConfig {
    /// Listen address
    pub listen_address: String,
    /// Listen port (0 = unset)
    pub listen_port: i32,
    /// `tcp` or `http`
    pub mode: String,
    /// Balance algorithm
    pub balance_algorithm: String,
}

/// Per-node proxy to the masters
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InternalLoadBalancerConfig {
    /// Enable the internal load balancer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// `haproxy`, `nginx` or `kube-vip`
    #[serde(rename = "type")]
    pub type_: String,

    /// kube-vip settings for type `kube-vip`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kube_vip: Option<KubeVipConfig>,
}

/// kube-vip settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct KubeVipConfig {
    /// Announced VIP
    pub vip: String,
    /// Interface carrying the VIP
    pub interface: String,
}

impl HighAvailabilityConfig {
    /// True if HA is on and a keepalived-fronted load balancer runs on our own hosts
    pub fn uses_self_managed_external_lb(&self) -> bool {
        self.enabled == Some(true)
            && self
                .external
                .as_ref()
                .is_some_and(|e| e.enabled == Some(true) && e.is_self_managed())
    }
}

impl ExternalLoadBalancerConfig {
    /// True for the keepalived-based types that run on loadbalancer hosts
    pub fn is_self_managed(&self) -> bool {
        matches!(
            self.type_.as_str(),
            LB_TYPE_KEEPALIVED_HAPROXY | LB_TYPE_KEEPALIVED_NGINX
        )
    }
}

impl SetDefaults for HighAvailabilityConfig {
    fn set_defaults(&mut self) {
        self.enabled.get_or_insert(false);
        self.external.set_defaults();
        self.internal.set_defaults();
    }
}

impl SetDefaults for ExternalLoadBalancerConfig {
    fn set_defaults(&mut self) {
        self.enabled.get_or_insert(false);
        default_str(&mut self.type_, LB_TYPE_KEEPALIVED_HAPROXY);
        if self.is_self_managed() {
            self.keepalived
                .get_or_insert_with(Default::default)
                .set_defaults();
        }
        match self.type_.as_str() {
            LB_TYPE_KEEPALIVED_HAPROXY => {
                self.haproxy.get_or_insert_with(Default::default).set_defaults()
            }
            LB_TYPE_KEEPALIVED_NGINX => {
                self.nginx.get_or_insert_with(Default::default).set_defaults()
            }
            _ => {}
        }
    }
}

impl SetDefaults for KeepalivedConfig {
    fn set_defaults(&mut self) {
        self.vrid.get_or_insert(DEFAULT_KEEPALIVED_VRID);
        default_str(&mut self.interface, DEFAULT_LB_INTERFACE);
        default_str(&mut self.auth_type, DEFAULT_KEEPALIVED_AUTH_TYPE);
        default_str(&mut self.auth_pass, DEFAULT_KEEPALIVED_AUTH_PASS);
    }
}

impl SetDefaults for HAProxyConfig {
    fn set_defaults(&mut self) {
        default_str(&mut self.frontend_bind_address, DEFAULT_LB_BIND_ADDRESS);
        default_zero(&mut self.frontend_port, DEFAULT_APISERVER_PORT);
        default_str(&mut self.mode, DEFAULT_LB_MODE);
        default_str(&mut self.balance_algorithm, DEFAULT_HAPROXY_BALANCE);
    }
}

impl SetDefaults for NginxLbConfig {
    fn set_defaults(&mut self) {
        default_str(&mut self.listen_address, DEFAULT_LB_BIND_ADDRESS);
        default_zero(&mut self.listen_port, DEFAULT_APISERVER_PORT);
        default_str(&mut self.mode, DEFAULT_LB_MODE);
        default_str(&mut self.balance_algorithm, DEFAULT_NGINX_BALANCE);
    }
}

impl SetDefaults for InternalLoadBalancerConfig {
    fn set_defaults(&mut self) {
        self.enabled.get_or_insert(false);
        default_str(&mut self.type_, INTERNAL_LB_HAPROXY);
        if self.type_ == INTERNAL_LB_KUBE_VIP {
            self.kube_vip
                .get_or_insert_with(Default::default)
                .set_defaults();
        }
    }
}

impl SetDefaults for KubeVipConfig {
    fn set_defaults(&mut self) {
        default_str(&mut self.interface, DEFAULT_LB_INTERFACE);
    }
}

impl Validate for HighAvailabilityConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        let external_on = self
            .external
            .as_ref()
            .is_some_and(|e| e.enabled == Some(true));
        let internal_on = self
            .internal
            .as_ref()
            .is_some_and(|i| i.enabled == Some(true));
        if external_on && internal_on {
            errs.add(
                path,
                "external and internal load balancers cannot both be enabled",
            );
        }

        self.external.validate(&path.child("external"), errs);
        self.internal.validate(&path.child("internal"), errs);
    }
}

impl Validate for ExternalLoadBalancerConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        check_one_of(
            &self.type_,
            SUPPORTED_EXTERNAL_LB_TYPES,
            "load balancer type",
            &path.child("type"),
            errs,
        );

        let sub_configs = [
            ("keepalived", self.keepalived.is_some(), self.is_self_managed()),
            (
                "haproxy",
                self.haproxy.is_some(),
                self.type_ == LB_TYPE_KEEPALIVED_HAPROXY,
            ),
            (
                "nginx",
                self.nginx.is_some(),
                self.type_ == LB_TYPE_KEEPALIVED_NGINX,
            ),
        ];
        for (field, present, allowed) in sub_configs {
            if present && !allowed {
                errs.add(
                    &path.child(field),
                    format!(
                        "{field} configuration is not used by load balancer type \"{}\"",
                        self.type_
                    ),
                );
            }
        }

        self.keepalived.validate(&path.child("keepalived"), errs);
        self.haproxy.validate(&path.child("haproxy"), errs);
        self.nginx.validate(&path.child("nginx"), errs);
    }
}

impl Validate for KeepalivedConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        if let Some(vrid) = self.vrid {
            if !VRID_RANGE.contains(&vrid) {
                errs.add(
                    &path.child("vrid"),
                    format!(
                        "virtual router id {vrid} must be between {} and {}",
                        VRID_RANGE.start(),
                        VRID_RANGE.end()
                    ),
                );
            }
        }
        if self.interface.trim().is_empty() {
            errs.add(&path.child("interface"), "interface is required");
        }
        check_one_of(
            &self.auth_type,
            KEEPALIVED_AUTH_TYPES,
            "keepalived auth type",
            &path.child("authType"),
            errs,
        );
        let len = self.auth_pass.chars().count();
        if len == 0 || len > MAX_KEEPALIVED_AUTH_PASS_LEN {
            errs.add(
                &path.child("authPass"),
                format!("authPass must be 1 to {MAX_KEEPALIVED_AUTH_PASS_LEN} characters, got {len}"),
            );
        }
    }
}

/// Checks shared by the HAProxy and nginx frontends
fn validate_proxy(
    address: (&str, &str),
    port: (&str, i32),
    mode: &str,
    algorithm: &str,
    algorithms: &[&str],
    path: &FieldPath,
    errs: &mut ValidationErrors,
) {
    let (address_field, address) = address;
    if !is_valid_ip(address) {
        errs.add(
            &path.child(address_field),
            format!("invalid bind address \"{address}\""),
        );
    }
    let (port_field, port) = port;
    check_port(port.into(), &path.child(port_field), errs);
    check_one_of(mode, SUPPORTED_LB_MODES, "proxy mode", &path.child("mode"), errs);
    check_one_of(
        algorithm,
        algorithms,
        "balance algorithm",
        &path.child("balanceAlgorithm"),
        errs,
    );
}

impl Validate for HAProxyConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        validate_proxy(
            ("frontendBindAddress", &self.frontend_bind_address),
            ("frontendPort", self.frontend_port),
            &self.mode,
            &self.balance_algorithm,
            HAPROXY_BALANCE_ALGORITHMS,
            path,
            errs,
        );
    }
}

impl Validate for NginxLbConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        validate_proxy(
            ("listenAddress", &self.listen_address),
            ("listenPort", self.listen_port),
            &self.mode,
            &self.balance_algorithm,
            NGINX_BALANCE_ALGORITHMS,
            path,
            errs,
        );
    }
}

impl Validate for InternalLoadBalancerConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        check_one_of(
            &self.type_,
            SUPPORTED_INTERNAL_LB_TYPES,
            "internal load balancer type",
            &path.child("type"),
            errs,
        );

        let kube_vip_path = path.child("kubeVip");
        match &self.kube_vip {
            Some(_) if self.type_ != INTERNAL_LB_KUBE_VIP => errs.add(
                &kube_vip_path,
                format!(
                    "kubeVip configuration is not used by internal load balancer type \"{}\"",
                    self.type_
                ),
            ),
            Some(kube_vip) => kube_vip.validate(&kube_vip_path, errs),
            None if self.type_ == INTERNAL_LB_KUBE_VIP && self.enabled == Some(true) => {
                errs.add(&kube_vip_path, "kubeVip configuration is required for type \"kube-vip\"")
            }
            None => {}
        }
    }
}

impl Validate for KubeVipConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        if !is_valid_ip(&self.vip) {
            errs.add(
                &path.child("vip"),
                format!("invalid VIP \"{}\": must be an IP", self.vip),
            );
        }
        if self.interface.trim().is_empty() {
            errs.add(&path.child("interface"), "interface is required");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(config: &HighAvailabilityConfig) -> ValidationErrors {
        let mut errs = ValidationErrors::new();
        config.validate(&FieldPath::root("spec").child("highAvailability"), &mut errs);
        errs
    }

    fn external(type_: &str) -> HighAvailabilityConfig {
        HighAvailabilityConfig {
            enabled: Some(true),
            external: Some(ExternalLoadBalancerConfig {
                enabled: Some(true),
                type_: type_.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn keepalived_haproxy_gets_matching_sub_configs() {
        let mut config = external("");
        config.set_defaults();

        let lb = config.external.as_ref().unwrap();
        assert_eq!(lb.type_, "keepalived-haproxy");
        assert_eq!(lb.keepalived.as_ref().and_then(|k| k.vrid), Some(51));
        assert_eq!(lb.haproxy.as_ref().map(|h| h.frontend_port), Some(6443));
        assert!(lb.nginx.is_none());
        assert!(config.uses_self_managed_external_lb());
        assert!(!validate(&config).has_errors());
    }

    #[test]
    fn external_type_needs_no_sub_configs() {
        let mut config = external("external");
        config.set_defaults();

        let lb = config.external.as_ref().unwrap();
        assert!(lb.keepalived.is_none() && lb.haproxy.is_none() && lb.nginx.is_none());
        assert!(!config.uses_self_managed_external_lb());
        assert!(!validate(&config).has_errors());
    }

    #[test]
    fn mismatched_sub_config_is_reported() {
        let mut config = external("keepalived-nginx");
        if let Some(lb) = config.external.as_mut() {
            lb.haproxy = Some(HAProxyConfig::default());
        }
        config.set_defaults();

        let errs = validate(&config);
        assert_eq!(errs.len(), 1, "{errs}");
        assert!(errs.render().contains(
            "spec.highAvailability.external.haproxy: haproxy configuration is not used by load balancer type \"keepalived-nginx\""
        ));
    }

    #[test]
    fn external_and_internal_cannot_both_be_enabled() {
        let mut config = external("external");
        config.internal = Some(InternalLoadBalancerConfig {
            enabled: Some(true),
            ..Default::default()
        });
        config.set_defaults();

        let errs = validate(&config);
        assert_eq!(errs.len(), 1);
        assert!(errs.render().starts_with("spec.highAvailability: external and internal"));
    }

    #[test]
    fn reports_keepalived_and_kube_vip_fields() {
        let mut config = HighAvailabilityConfig {
            external: Some(ExternalLoadBalancerConfig {
                keepalived: Some(KeepalivedConfig {
                    vrid: Some(300),
                    auth_type: "MD5".to_string(),
                    auth_pass: "much-too-long".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            internal: Some(InternalLoadBalancerConfig {
                type_: "kube-vip".to_string(),
                kube_vip: Some(KubeVipConfig {
                    vip: "not-an-ip".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        config.set_defaults();

        let errs = validate(&config);
        let rendered = errs.render();
        assert_eq!(errs.len(), 4, "{rendered}");
        assert!(rendered.contains("spec.highAvailability.external.keepalived.vrid"));
        assert!(rendered.contains("spec.highAvailability.external.keepalived.authType"));
        assert!(rendered.contains("authPass must be 1 to 8 characters, got 13"));
        assert!(rendered.contains("spec.highAvailability.internal.kubeVip.vip"));
    }
}
