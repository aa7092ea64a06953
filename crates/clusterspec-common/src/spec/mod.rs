//! The cluster specification tree
//!
//! One module per top-level section. Each section type implements
//! [`SetDefaults`](crate::SetDefaults) and [`Validate`](crate::Validate);
//! hosts and role groups need the cross-reference index and expose
//! `validate_with` instead.

mod addon;
mod cluster;
mod dns;
mod endpoint;
mod etcd;
mod global;
mod ha;
mod host;
mod kubernetes;
mod network;
mod preflight;
mod registry;
mod role_groups;
mod runtime;
mod storage;
mod system;

pub use addon::{validate_addons, Addon, AddonSource, ChartSource, YamlSource};
pub use cluster::{Cluster, ClusterSpec};
pub use dns::{CoreDns, DnsConfig, ExternalZone, NodeLocalDns, RewriteRule};
pub use endpoint::ControlPlaneEndpointSpec;
pub use etcd::{EtcdConfig, ExternalEtcdConfig};
pub use global::GlobalSpec;
pub use ha::{
    ExternalLoadBalancerConfig, HAProxyConfig, HighAvailabilityConfig,
    InternalLoadBalancerConfig, KeepalivedConfig, KubeVipConfig, NginxLbConfig,
};
pub use host::{HostSpec, TaintSpec};
pub use kubernetes::{ApiServerConfig, ControllerManagerConfig, KubeletConfig, KubernetesConfig};
pub use network::{CalicoConfig, CalicoIpPool, FlannelConfig, MultusConfig, NetworkConfig};
pub use preflight::PreflightConfig;
pub use registry::{RegistryAuth, RegistryConfig};
pub use role_groups::{CustomRoleSpec, RoleGroupsSpec, RoleSpec};
pub use runtime::{ContainerRuntimeConfig, ContainerdConfig};
pub use storage::{NfsConfig, OpenEbsConfig, StorageConfig};
pub use system::SystemSpec;
