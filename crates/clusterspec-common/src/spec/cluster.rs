//! Cluster Custom Resource Definition
//!
//! The `Cluster` resource is the root of the specification tree. Its spec
//! owns every section; defaulting and validation start here and fan out.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::addon::validate_addons;
use super::{
    Addon, ContainerRuntimeConfig, ControlPlaneEndpointSpec, DnsConfig, EtcdConfig, GlobalSpec,
    HighAvailabilityConfig, HostSpec, KubernetesConfig, NetworkConfig, PreflightConfig,
    RegistryConfig, RoleGroupsSpec, StorageConfig, SystemSpec,
};
use crate::constants::{
    ETCD_TYPE_BINARY, ROLE_ETCD, ROLE_LOADBALANCER, ROLE_MASTER, ROLE_REGISTRY,
};
use crate::defaults::SetDefaults;
use crate::validation::{CrossRefIndex, FieldPath, Validate, ValidationErrors};

/// cgroup driver that corresponds to `useSystemdCgroup: true`
const SYSTEMD_CGROUP_DRIVER: &str = "systemd";

/// Specification for a Cluster
///
/// Hosts and the `kubernetes`, `etcd` and `network` sections are required;
/// every other section is optional and filled with defaults where that
/// makes sense.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "clusterspec.io",
    version = "v1alpha1",
    kind = "Cluster",
    plural = "clusters",
    shortname = "cs",
    namespaced = false,
    derive = "PartialEq",
    printcolumn = r#"{"name":"K8s","type":"string","jsonPath":".spec.kubernetes.version"}"#,
    printcolumn = r#"{"name":"CNI","type":"string","jsonPath":".spec.network.plugin"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterSpec {
    /// Machines taking part in the cluster
    pub hosts: Vec<HostSpec>,

    /// Connection defaults inherited by hosts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global: Option<GlobalSpec>,

    /// Role assignments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_groups: Option<RoleGroupsSpec>,

    /// OS preparation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemSpec>,

    /// Kubernetes settings (required)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<KubernetesConfig>,

    /// Etcd settings (required)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etcd: Option<EtcdConfig>,

    /// Pod networking (required)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkConfig>,

    /// Cluster DNS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsConfig>,

    /// Container runtime
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_runtime: Option<ContainerRuntimeConfig>,

    /// API endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_plane_endpoint: Option<ControlPlaneEndpointSpec>,

    /// Control plane load balancing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_availability: Option<HighAvailabilityConfig>,

    /// Volume provisioners
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    /// Image registry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryConfig>,

    /// Node requirements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preflight: Option<PreflightConfig>,

    /// Add-ons installed after the cluster is up
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub addons: Vec<Addon>,
}

impl SetDefaults for ClusterSpec {
    fn set_defaults(&mut self) {
        // Hosts inherit from global, so global must be complete first
        self.global
            .get_or_insert_with(Default::default)
            .set_defaults();
        self.system
            .get_or_insert_with(Default::default)
            .set_defaults();

        let global = self.global.as_ref();
        for host in &mut self.hosts {
            host.set_defaults_with(global);
        }

        self.role_groups.set_defaults();
        self.kubernetes.set_defaults();
        self.etcd.set_defaults();
        self.network.set_defaults();

        self.dns.get_or_insert_with(Default::default).set_defaults();
        self.container_runtime
            .get_or_insert_with(Default::default)
            .set_defaults();
        self.control_plane_endpoint
            .get_or_insert_with(Default::default)
            .set_defaults();
        self.preflight
            .get_or_insert_with(Default::default)
            .set_defaults();

        self.high_availability.set_defaults();
        self.storage.set_defaults();
        self.registry.set_defaults();
        self.addons.set_defaults();

        debug!(hosts = self.hosts.len(), addons = self.addons.len(), "defaulted cluster spec");
    }
}

impl Validate for ClusterSpec {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        let index = CrossRefIndex::build(self);

        let hosts_path = path.child("hosts");
        if self.hosts.is_empty() {
            errs.add(&hosts_path, "must contain at least one host");
        }
        for (i, host) in self.hosts.iter().enumerate() {
            host.validate_with(&hosts_path.keyed(i, &host.name), i, &index, errs);
        }

        self.global.validate(&path.child("global"), errs);
        if let Some(groups) = &self.role_groups {
            groups.validate_with(&path.child("roleGroups"), &index, errs);
        }
        self.system.validate(&path.child("system"), errs);

        require(&self.kubernetes, "kubernetes", path, errs);
        require(&self.etcd, "etcd", path, errs);
        require(&self.network, "network", path, errs);

        self.dns.validate(&path.child("dns"), errs);
        self.container_runtime
            .validate(&path.child("containerRuntime"), errs);
        self.control_plane_endpoint
            .validate(&path.child("controlPlaneEndpoint"), errs);
        self.high_availability
            .validate(&path.child("highAvailability"), errs);
        self.storage.validate(&path.child("storage"), errs);
        self.registry.validate(&path.child("registry"), errs);
        self.preflight.validate(&path.child("preflight"), errs);
        validate_addons(&self.addons, &path.child("addons"), errs);

        self.validate_cross_section(path, &index, errs);

        debug!(
            hosts = index.host_count(),
            errors = errs.len(),
            "validated cluster spec"
        );
    }
}

/// Report a missing required section, or validate it when present
fn require<T: Validate>(
    section: &Option<T>,
    field: &str,
    path: &FieldPath,
    errs: &mut ValidationErrors,
) {
    let section_path = path.child(field);
    match section {
        Some(inner) => inner.validate(&section_path, errs),
        None => errs.add(&section_path, format!("{field} section is required")),
    }
}

impl ClusterSpec {
    /// Checks that span more than one section
    fn validate_cross_section(
        &self,
        path: &FieldPath,
        index: &CrossRefIndex,
        errs: &mut ValidationErrors,
    ) {
        if self.role_groups.is_some() && !index.has_role_members(ROLE_MASTER) {
            errs.add(
                &path.child("roleGroups").child(ROLE_MASTER).child("hosts"),
                "at least one master host is required",
            );
        }

        if let Some(etcd) = &self.etcd {
            if etcd.type_ == ETCD_TYPE_BINARY && !index.has_role_members(ROLE_ETCD) {
                errs.add(
                    &path.child("etcd").child("type"),
                    format!(
                        "etcd type \"{ETCD_TYPE_BINARY}\" requires at least one host with the etcd role"
                    ),
                );
            }
        }

        if let Some(ha) = &self.high_availability {
            if ha.uses_self_managed_external_lb() {
                let lb_type = ha
                    .external
                    .as_ref()
                    .map(|e| e.type_.as_str())
                    .unwrap_or_default();
                if !index.has_role_members(ROLE_LOADBALANCER) {
                    errs.add(
                        &path.child("highAvailability").child("external").child("type"),
                        format!(
                            "load balancer type \"{lb_type}\" requires at least one host with the loadbalancer role"
                        ),
                    );
                }
                let has_address = self
                    .control_plane_endpoint
                    .as_ref()
                    .is_some_and(|e| !e.address.is_empty());
                if !has_address {
                    errs.add(
                        &path.child("controlPlaneEndpoint").child("address"),
                        format!("address is required when load balancer type \"{lb_type}\" is enabled"),
                    );
                }
            }
        }

        if let Some(registry) = &self.registry {
            if registry.deploys_local_registry() && !index.has_role_members(ROLE_REGISTRY) {
                errs.add(
                    &path.child("registry").child("type"),
                    format!(
                        "registry type \"{}\" requires at least one host with the registry role",
                        registry.type_
                    ),
                );
            }
        }

        let systemd_cgroup = self
            .container_runtime
            .as_ref()
            .and_then(|r| r.containerd.as_ref())
            .and_then(|c| c.use_systemd_cgroup);
        let driver = self
            .kubernetes
            .as_ref()
            .map(|k| k.kubelet.cgroup_driver.as_str())
            .filter(|d| !d.is_empty());
        if let (Some(systemd_cgroup), Some(driver)) = (systemd_cgroup, driver) {
            if systemd_cgroup != (driver == SYSTEMD_CGROUP_DRIVER) {
                errs.add(
                    &path
                        .child("containerRuntime")
                        .child("containerd")
                        .child("useSystemdCgroup"),
                    format!(
                        "useSystemdCgroup={systemd_cgroup} does not match kubelet cgroup driver \"{driver}\""
                    ),
                );
            }
        }
    }
}
