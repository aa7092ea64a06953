//! Address clients use to reach the Kubernetes API

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_APISERVER_PORT, DEFAULT_CONTROL_PLANE_DOMAIN};
use crate::defaults::{default_str, default_zero, SetDefaults};
use crate::validation::format::{is_valid_domain, is_valid_ip};
use crate::validation::{check_port, FieldPath, Validate, ValidationErrors};

/// Control plane endpoint
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlPlaneEndpointSpec {
    /// DNS name written into kubeconfigs and certificates
    pub domain: String,

    /// VIP or load balancer address; empty uses the first master
    #[serde(skip_serializing_if = "String::is_empty")]
    pub address: String,

    /// API server port (0 = unset)
    pub port: i32,

    /// The domain resolves through external DNS instead of `/etc/hosts`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_dns: Option<bool>,
}

impl SetDefaults for ControlPlaneEndpointSpec {
    fn set_defaults(&mut self) {
        default_str(&mut self.domain, DEFAULT_CONTROL_PLANE_DOMAIN);
        default_zero(&mut self.port, DEFAULT_APISERVER_PORT);
        self.external_dns.get_or_insert(false);
    }
}

impl Validate for ControlPlaneEndpointSpec {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        if !self.domain.is_empty() && !is_valid_domain(&self.domain) {
            errs.add(
                &path.child("domain"),
                format!("invalid domain \"{}\"", self.domain),
            );
        }
        if !self.address.is_empty() && !is_valid_ip(&self.address) {
            errs.add(
                &path.child("address"),
                format!("invalid address \"{}\": must be an IP", self.address),
            );
        }
        check_port(self.port.into(), &path.child("port"), errs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(endpoint: &ControlPlaneEndpointSpec) -> ValidationErrors {
        let mut errs = ValidationErrors::new();
        endpoint.validate(
            &FieldPath::root("spec").child("controlPlaneEndpoint"),
            &mut errs,
        );
        errs
    }

    /// Story: An unset port means "use the API server default"
    #[test]
    fn story_zero_port_defaults_to_apiserver_port() {
        let mut endpoint = ControlPlaneEndpointSpec::default();
        endpoint.set_defaults();
        assert_eq!(endpoint.port, 6443);
        assert_eq!(endpoint.domain, "lb.clusterspec.internal");
        assert!(!validate(&endpoint).has_errors());
    }

    /// Story: A negative port is reported instead of silently replaced
    #[test]
    fn story_negative_port_is_reported() {
        let mut endpoint = ControlPlaneEndpointSpec {
            port: -1,
            ..Default::default()
        };
        endpoint.set_defaults();
        assert_eq!(endpoint.port, -1);

        let errs = validate(&endpoint);
        assert_eq!(errs.len(), 1);
        assert!(errs.render().contains("invalid port -1"));
    }

    #[test]
    fn reports_bad_domain_and_address() {
        let endpoint = ControlPlaneEndpointSpec {
            domain: "lb_internal".to_string(),
            address: "lb.example.com".to_string(),
            port: 443,
            ..Default::default()
        };
        let errs = validate(&endpoint);
        let rendered = errs.render();
        assert_eq!(errs.len(), 2, "{rendered}");
        assert!(rendered.contains("spec.controlPlaneEndpoint.domain"));
        assert!(rendered.contains("spec.controlPlaneEndpoint.address"));
    }
}
