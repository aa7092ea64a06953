//! Default values and allowed-value tables
//!
//! Everything here is immutable data consumed by the defaulting and
//! validation passes.

// =============================================================================
// Hosts and connections
// =============================================================================

/// SSH port used when neither the host nor `global` sets one
pub const DEFAULT_SSH_PORT: i32 = 22;

/// Remote user used when neither the host nor `global` sets one
pub const DEFAULT_USER: &str = "root";

/// Host architecture used when unset
pub const DEFAULT_ARCH: &str = "amd64";

/// Connection type for remote hosts
pub const CONNECTION_TYPE_SSH: &str = "ssh";

/// Connection type for the machine running the deployment
pub const CONNECTION_TYPE_LOCAL: &str = "local";

/// Private key used when a host has no other authentication method
pub const DEFAULT_PRIVATE_KEY_PATH: &str = "~/.ssh/id_rsa";

/// SSH connection timeout in seconds
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: i64 = 30;

/// Working directory on the deployment machine
pub const DEFAULT_WORK_DIR: &str = "/tmp/clusterspec";

/// Supported host architectures
pub const SUPPORTED_ARCHES: &[&str] = &["amd64", "arm64"];

/// Supported connection types
pub const SUPPORTED_CONNECTION_TYPES: &[&str] = &[CONNECTION_TYPE_SSH, CONNECTION_TYPE_LOCAL];

/// Allowed Kubernetes taint effects
pub const TAINT_EFFECTS: &[&str] = &["NoSchedule", "PreferNoSchedule", "NoExecute"];

// =============================================================================
// Roles
// =============================================================================

/// Control plane role
pub const ROLE_MASTER: &str = "master";
/// Worker role
pub const ROLE_WORKER: &str = "worker";
/// Etcd member role
pub const ROLE_ETCD: &str = "etcd";
/// Self-managed load balancer role
pub const ROLE_LOADBALANCER: &str = "loadbalancer";
/// Storage node role
pub const ROLE_STORAGE: &str = "storage";
/// Local image registry role
pub const ROLE_REGISTRY: &str = "registry";

/// The six predefined role names; custom roles may not reuse them
pub const PREDEFINED_ROLES: &[&str] = &[
    ROLE_MASTER,
    ROLE_WORKER,
    ROLE_ETCD,
    ROLE_LOADBALANCER,
    ROLE_STORAGE,
    ROLE_REGISTRY,
];

/// Upper bound on names produced by a single bracket-range pattern
pub const MAX_HOST_RANGE_EXPANSION: u64 = 10_000;

// =============================================================================
// System
// =============================================================================

/// Kernel modules loaded on every node when `system.modules` is unset
pub const DEFAULT_KERNEL_MODULES: &[&str] = &[
    "br_netfilter",
    "overlay",
    "ip_vs",
    "ip_vs_rr",
    "ip_vs_wrr",
    "ip_vs_sh",
    "nf_conntrack",
];

/// Baseline sysctl parameters; user-supplied keys always win
pub const DEFAULT_SYSCTL_PARAMS: &[(&str, &str)] = &[
    ("net.ipv4.ip_forward", "1"),
    ("net.bridge.bridge-nf-call-iptables", "1"),
    ("net.bridge.bridge-nf-call-ip6tables", "1"),
    ("net.ipv4.conf.all.rp_filter", "0"),
    ("vm.max_map_count", "262144"),
    ("vm.swappiness", "0"),
    ("fs.inotify.max_user_watches", "524288"),
    ("fs.inotify.max_user_instances", "8192"),
];

/// Package managers the OS preparation step understands
pub const SUPPORTED_PACKAGE_MANAGERS: &[&str] = &["apt", "yum", "dnf"];

// =============================================================================
// Kubernetes
// =============================================================================

/// kubeadm-driven control plane
pub const KUBERNETES_TYPE_KUBEADM: &str = "kubeadm";
/// Control plane components run as systemd binaries
pub const KUBERNETES_TYPE_BINARY: &str = "binary";
/// Supported Kubernetes deployment types
pub const SUPPORTED_KUBERNETES_TYPES: &[&str] = &[KUBERNETES_TYPE_KUBEADM, KUBERNETES_TYPE_BINARY];

/// Kubernetes version deployed when unset
pub const DEFAULT_KUBERNETES_VERSION: &str = "v1.30.2";
/// Cluster name used when unset
pub const DEFAULT_CLUSTER_NAME: &str = "kubernetes";
/// Cluster DNS domain used when unset
pub const DEFAULT_DNS_DOMAIN: &str = "cluster.local";
/// kube-proxy mode used when unset
pub const DEFAULT_PROXY_MODE: &str = "ipvs";
/// Supported kube-proxy modes
pub const SUPPORTED_PROXY_MODES: &[&str] = &["ipvs", "iptables"];
/// NodePort range used when unset
pub const DEFAULT_SERVICE_NODE_PORT_RANGE: &str = "30000-32767";
/// Kubelet cgroup driver used when unset
pub const DEFAULT_CGROUP_DRIVER: &str = "systemd";
/// Supported kubelet cgroup drivers
pub const SUPPORTED_CGROUP_DRIVERS: &[&str] = &["systemd", "cgroupfs"];
/// Kubelet max pods used when unset
pub const DEFAULT_MAX_PODS: i32 = 110;
/// Per-node pod CIDR mask size used when unset
pub const DEFAULT_NODE_CIDR_MASK_SIZE: i32 = 24;
/// Baseline kubelet hard eviction thresholds; user-supplied keys always win
pub const DEFAULT_EVICTION_HARD: &[(&str, &str)] = &[
    ("memory.available", "5%"),
    ("nodefs.available", "10%"),
    ("imagefs.available", "15%"),
];

/// Default kube-apiserver secure port
pub const DEFAULT_APISERVER_PORT: i32 = 6443;
/// Control plane endpoint domain used when unset
pub const DEFAULT_CONTROL_PLANE_DOMAIN: &str = "lb.clusterspec.internal";

// =============================================================================
// Etcd
// =============================================================================

/// Etcd runs as systemd binaries on the etcd role hosts
pub const ETCD_TYPE_BINARY: &str = "binary";
/// Etcd runs as kubeadm static pods on the masters
pub const ETCD_TYPE_KUBEADM: &str = "kubeadm";
/// Etcd is managed outside the cluster
pub const ETCD_TYPE_EXTERNAL: &str = "external";
/// Supported etcd deployment types
pub const SUPPORTED_ETCD_TYPES: &[&str] = &[ETCD_TYPE_BINARY, ETCD_TYPE_KUBEADM, ETCD_TYPE_EXTERNAL];

/// Etcd version deployed when unset
pub const DEFAULT_ETCD_VERSION: &str = "v3.5.13";
/// Etcd client port
pub const DEFAULT_ETCD_CLIENT_PORT: i32 = 2379;
/// Etcd peer port
pub const DEFAULT_ETCD_PEER_PORT: i32 = 2380;
/// Etcd data directory
pub const DEFAULT_ETCD_DATA_DIR: &str = "/var/lib/etcd";
/// Etcd snapshot directory
pub const DEFAULT_ETCD_BACKUP_DIR: &str = "/var/backups/etcd";
/// Hours between scheduled etcd snapshots
pub const DEFAULT_ETCD_BACKUP_PERIOD_HOURS: i32 = 24;
/// Snapshots kept on disk
pub const DEFAULT_ETCD_KEEP_BACKUP_NUMBER: i32 = 7;
/// Committed transactions before an etcd snapshot
pub const DEFAULT_ETCD_SNAPSHOT_COUNT: i64 = 10_000;
/// Hours of history retained by auto compaction
pub const DEFAULT_ETCD_AUTO_COMPACTION_RETENTION_HOURS: i32 = 8;
/// Raft heartbeat interval in milliseconds
pub const DEFAULT_ETCD_HEARTBEAT_INTERVAL_MS: i32 = 250;
/// Raft election timeout in milliseconds
pub const DEFAULT_ETCD_ELECTION_TIMEOUT_MS: i32 = 5_000;
/// Backend quota in bytes (2 GiB)
pub const DEFAULT_ETCD_QUOTA_BACKEND_BYTES: i64 = 2 * 1024 * 1024 * 1024;
/// Upper bound etcd accepts for the backend quota (8 GiB)
pub const MAX_ETCD_QUOTA_BACKEND_BYTES: i64 = 8 * 1024 * 1024 * 1024;
/// Maximum client request size in bytes
pub const DEFAULT_ETCD_MAX_REQUEST_BYTES: i64 = 1_572_864;
/// Etcd log level
pub const DEFAULT_ETCD_LOG_LEVEL: &str = "info";
/// Supported etcd log levels
pub const SUPPORTED_ETCD_LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error", "panic", "fatal"];

// =============================================================================
// Network
// =============================================================================

/// Calico CNI
pub const PLUGIN_CALICO: &str = "calico";
/// Flannel CNI
pub const PLUGIN_FLANNEL: &str = "flannel";
/// Cilium CNI
pub const PLUGIN_CILIUM: &str = "cilium";
/// No CNI is installed
pub const PLUGIN_NONE: &str = "none";
/// Supported CNI plugins
pub const SUPPORTED_NETWORK_PLUGINS: &[&str] =
    &[PLUGIN_CALICO, PLUGIN_FLANNEL, PLUGIN_CILIUM, PLUGIN_NONE];

/// Pod network CIDR used when unset
pub const DEFAULT_KUBE_PODS_CIDR: &str = "10.233.64.0/18";
/// Service network CIDR used when unset
pub const DEFAULT_KUBE_SERVICE_CIDR: &str = "10.233.0.0/18";

/// Calico IP-in-IP mode used when unset
pub const DEFAULT_CALICO_IPIP_MODE: &str = "Always";
/// Calico VXLAN mode used when unset
pub const DEFAULT_CALICO_VXLAN_MODE: &str = "Never";
/// Calico encapsulation modes
pub const CALICO_ENCAPSULATION_MODES: &[&str] = &["Always", "CrossSubnet", "Never"];
/// Calico veth MTU used when unset
pub const DEFAULT_CALICO_VETH_MTU: i32 = 1440;
/// Calico typha replicas used when unset
pub const DEFAULT_CALICO_TYPHA_REPLICAS: i32 = 1;
/// Calico log severity used when unset
pub const DEFAULT_CALICO_LOG_SEVERITY: &str = "Info";
/// Calico log severities
pub const CALICO_LOG_SEVERITIES: &[&str] = &["Debug", "Info", "Warning", "Error", "Fatal"];
/// Calico pool block size used when unset
pub const DEFAULT_CALICO_BLOCK_SIZE: i32 = 26;
/// Calico IP pool encapsulations
pub const CALICO_POOL_ENCAPSULATIONS: &[&str] =
    &["IPIP", "VXLAN", "IPIPCrossSubnet", "VXLANCrossSubnet", "None"];

/// Flannel backend used when unset
pub const DEFAULT_FLANNEL_BACKEND: &str = "vxlan";
/// Flannel backends
pub const SUPPORTED_FLANNEL_BACKENDS: &[&str] = &["vxlan", "host-gw", "udp", "wireguard"];

/// Multus version used when unset
pub const DEFAULT_MULTUS_VERSION: &str = "v4.0.2";

// =============================================================================
// DNS
// =============================================================================

/// CoreDNS upstreams used when unset
pub const DEFAULT_UPSTREAM_DNS_SERVERS: &[&str] = &["/etc/resolv.conf"];
/// NodeLocal DNSCache link-local listen address
pub const DEFAULT_NODE_LOCAL_DNS_IP: &str = "169.254.25.10";
/// External zone cache TTL in seconds
pub const DEFAULT_EXTERNAL_ZONE_CACHE_SECS: i32 = 300;

// =============================================================================
// Container runtime
// =============================================================================

/// containerd runtime
pub const RUNTIME_CONTAINERD: &str = "containerd";
/// Docker runtime (via cri-dockerd)
pub const RUNTIME_DOCKER: &str = "docker";
/// CRI-O runtime
pub const RUNTIME_CRIO: &str = "crio";
/// iSulad runtime
pub const RUNTIME_ISULA: &str = "isula";
/// Supported container runtimes
pub const SUPPORTED_RUNTIMES: &[&str] = &[RUNTIME_CONTAINERD, RUNTIME_DOCKER, RUNTIME_CRIO, RUNTIME_ISULA];

/// containerd version deployed when unset
pub const DEFAULT_CONTAINERD_VERSION: &str = "1.7.13";
/// containerd configuration file
pub const DEFAULT_CONTAINERD_CONFIG_PATH: &str = "/etc/containerd/config.toml";
/// containerd persistent root
pub const DEFAULT_CONTAINERD_ROOT: &str = "/var/lib/containerd";
/// containerd state directory
pub const DEFAULT_CONTAINERD_STATE: &str = "/run/containerd";
/// Pause image used when unset
pub const DEFAULT_SANDBOX_IMAGE: &str = "registry.k8s.io/pause:3.9";
/// Plugins containerd must load
pub const DEFAULT_CONTAINERD_REQUIRED_PLUGINS: &[&str] = &["io.containerd.grpc.v1.cri"];

// =============================================================================
// High availability
// =============================================================================

/// Keepalived VIP in front of HAProxy on the loadbalancer hosts
pub const LB_TYPE_KEEPALIVED_HAPROXY: &str = "keepalived-haproxy";
/// Keepalived VIP in front of nginx on the loadbalancer hosts
pub const LB_TYPE_KEEPALIVED_NGINX: &str = "keepalived-nginx";
/// Load balancer managed outside the cluster
pub const LB_TYPE_EXTERNAL: &str = "external";
/// Supported external load balancer types
pub const SUPPORTED_EXTERNAL_LB_TYPES: &[&str] =
    &[LB_TYPE_KEEPALIVED_HAPROXY, LB_TYPE_KEEPALIVED_NGINX, LB_TYPE_EXTERNAL];

/// Per-node HAProxy proxying to the apiservers
pub const INTERNAL_LB_HAPROXY: &str = "haproxy";
/// Per-node nginx proxying to the apiservers
pub const INTERNAL_LB_NGINX: &str = "nginx";
/// kube-vip static pods announcing a VIP
pub const INTERNAL_LB_KUBE_VIP: &str = "kube-vip";
/// Supported internal load balancer types
pub const SUPPORTED_INTERNAL_LB_TYPES: &[&str] =
    &[INTERNAL_LB_HAPROXY, INTERNAL_LB_NGINX, INTERNAL_LB_KUBE_VIP];

/// Keepalived virtual router id used when unset
pub const DEFAULT_KEEPALIVED_VRID: i32 = 51;
/// Network interface carrying the VIP
pub const DEFAULT_LB_INTERFACE: &str = "eth0";
/// Keepalived authentication type used when unset
pub const DEFAULT_KEEPALIVED_AUTH_TYPE: &str = "PASS";
/// Keepalived authentication types
pub const KEEPALIVED_AUTH_TYPES: &[&str] = &["PASS", "AH"];
/// Keepalived authentication password used when unset
pub const DEFAULT_KEEPALIVED_AUTH_PASS: &str = "lbpass01";
/// Keepalived truncates PASS authentication beyond this length
pub const MAX_KEEPALIVED_AUTH_PASS_LEN: usize = 8;

/// Load balancer bind address used when unset
pub const DEFAULT_LB_BIND_ADDRESS: &str = "0.0.0.0";
/// Load balancer proxy mode used when unset
pub const DEFAULT_LB_MODE: &str = "tcp";
/// Load balancer proxy modes
pub const SUPPORTED_LB_MODES: &[&str] = &["tcp", "http"];
/// HAProxy balance algorithm used when unset
pub const DEFAULT_HAPROXY_BALANCE: &str = "roundrobin";
/// HAProxy balance algorithms
pub const HAPROXY_BALANCE_ALGORITHMS: &[&str] = &["roundrobin", "leastconn", "source"];
/// nginx balance algorithm used when unset
pub const DEFAULT_NGINX_BALANCE: &str = "round_robin";
/// nginx balance algorithms
pub const NGINX_BALANCE_ALGORITHMS: &[&str] = &["round_robin", "least_conn", "ip_hash"];

// =============================================================================
// Storage and registry
// =============================================================================

/// OpenEBS local PV base path
pub const DEFAULT_OPENEBS_BASE_PATH: &str = "/var/openebs/local";
/// NFS provisioner storage class name
pub const DEFAULT_NFS_STORAGE_CLASS: &str = "nfs-client";

/// Plain distribution registry
pub const REGISTRY_TYPE_REGISTRY: &str = "registry";
/// Harbor registry
pub const REGISTRY_TYPE_HARBOR: &str = "harbor";
/// Supported local registry types
pub const SUPPORTED_REGISTRY_TYPES: &[&str] = &[REGISTRY_TYPE_REGISTRY, REGISTRY_TYPE_HARBOR];
/// Local registry data directory
pub const DEFAULT_REGISTRY_DATA_ROOT: &str = "/mnt/registry";

// =============================================================================
// Preflight and addons
// =============================================================================

/// Minimum CPU cores per node
pub const DEFAULT_MIN_CPU_CORES: i32 = 2;
/// Minimum memory per node in MiB
pub const DEFAULT_MIN_MEMORY_MB: i64 = 2048;
/// Preflight checks that may be skipped by name
pub const KNOWN_PREFLIGHT_CHECKS: &[&str] = &[
    "cpu",
    "memory",
    "swap",
    "os",
    "hostname",
    "time-sync",
    "ports",
    "kernel-modules",
    "container-runtime",
];

/// Addon namespace used when unset
pub const DEFAULT_ADDON_NAMESPACE: &str = "kube-system";
/// Addon install retries
pub const DEFAULT_ADDON_RETRIES: i32 = 0;
/// Seconds between addon install retries
pub const DEFAULT_ADDON_DELAY_SECS: i32 = 5;
/// Addon install timeout in seconds
pub const DEFAULT_ADDON_TIMEOUT_SECS: i32 = 300;
/// URL schemes accepted for chart repositories
pub const CHART_REPO_SCHEMES: &[&str] = &["http", "https", "oci"];
