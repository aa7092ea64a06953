//! Default-then-validate pipeline
//!
//! Defaulting mutates the tree and must not run concurrently on the same
//! spec. Validation afterwards is read-only.

use tracing::{info, instrument, warn};

use crate::defaults::SetDefaults;
use crate::spec::ClusterSpec;
use crate::validation::{FieldPath, Validate, ValidationErrors};
use crate::{Result, SPEC_ROOT};

/// Fill defaults in place, then validate the whole tree.
///
/// On success the spec is fully defaulted and free of violations. On
/// failure the spec is still defaulted and the returned
/// [`Error::Validation`](crate::Error::Validation) carries every violation.
#[instrument(skip(spec), fields(hosts = spec.hosts.len()))]
pub fn process(spec: &mut ClusterSpec) -> Result<()> {
    spec.set_defaults();

    let errors = validate(spec);
    if errors.has_errors() {
        warn!(errors = errors.len(), "cluster spec rejected");
    } else {
        info!("cluster spec accepted");
    }
    errors.into_result()
}

/// Validate an already defaulted spec under the `spec` root path
pub fn validate(spec: &ClusterSpec) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    spec.validate(&FieldPath::root(SPEC_ROOT), &mut errors);
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{EtcdConfig, HostSpec, KubernetesConfig, NetworkConfig};
    use crate::Error;

    fn minimal() -> ClusterSpec {
        ClusterSpec {
            hosts: vec![HostSpec {
                name: "n1".to_string(),
                address: "10.0.0.1".to_string(),
                ..Default::default()
            }],
            kubernetes: Some(KubernetesConfig::default()),
            etcd: Some(EtcdConfig::default()),
            network: Some(NetworkConfig::default()),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_minimal_spec_and_leaves_it_defaulted() {
        let mut spec = minimal();
        process(&mut spec).unwrap();

        assert_eq!(spec.hosts[0].port, 22);
        assert_eq!(spec.hosts[0].user, "root");
        assert!(spec.dns.is_some());
    }

    #[test]
    fn rejection_carries_every_error() {
        let mut spec = minimal();
        spec.kubernetes = None;
        spec.network = None;

        let err = process(&mut spec).unwrap_err();
        let Error::Validation { errors } = &err;
        assert_eq!(errors.len(), 2);
        assert!(err.to_string().contains("spec.kubernetes: kubernetes section is required"));
        assert!(err.to_string().contains("spec.network: network section is required"));
        assert!(spec.global.is_some(), "defaults are applied even on rejection");
    }

    #[test]
    fn rerunning_after_a_fix_succeeds() {
        let mut spec = minimal();
        spec.etcd = None;
        assert!(process(&mut spec).is_err());

        spec.etcd = Some(EtcdConfig::default());
        assert!(process(&mut spec).is_ok());
    }
}
