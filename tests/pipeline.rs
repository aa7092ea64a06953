//! End-to-end tests: parse a cluster document, default it and validate it

use rstest::rstest;

use clusterspec::loader::{self, Document};
use clusterspec_common::pipeline;
use clusterspec_common::{Error, SetDefaults};

const THREE_NODE: &str = r#"
apiVersion: clusterspec.io/v1alpha1
kind: Cluster
metadata:
  name: prod
spec:
  hosts:
    - name: cp1
      address: 10.0.0.11
    - name: node1
      address: 10.0.0.21
    - name: node2
      address: 10.0.0.22
  roleGroups:
    master:
      hosts: [cp1]
    worker:
      hosts: ["node[1:2]"]
    etcd:
      hosts: [cp1]
  kubernetes:
    version: v1.30.2
  etcd:
    type: binary
  network:
    plugin: calico
"#;

fn messages(err: &Error) -> Vec<String> {
    err.field_errors().iter().map(|e| e.to_string()).collect()
}

fn process(yaml: &str) -> (Document, clusterspec_common::Result<()>) {
    let mut document = loader::parse(yaml).unwrap();
    let result = pipeline::process(document.spec_mut());
    (document, result)
}

// =============================================================================
// Accepted documents
// =============================================================================

/// Story: an operator writes only what differs from the defaults and gets a
/// complete, valid spec back
#[test]
fn three_node_cluster_is_accepted_and_filled() {
    let (document, result) = process(THREE_NODE);
    result.unwrap();

    let spec = document.spec();
    assert!(spec.hosts.iter().all(|h| h.port == 22 && h.user == "root"));

    let network = spec.network.as_ref().unwrap();
    assert_eq!(network.kube_pods_cidr, "10.233.64.0/18");
    assert!(network.calico.is_some());
    assert!(network.flannel.is_none());

    let etcd = spec.etcd.as_ref().unwrap();
    assert_eq!(etcd.client_port, 2379);
    assert_eq!(etcd.peer_port, 2380);

    assert_eq!(spec.control_plane_endpoint.as_ref().unwrap().port, 6443);
    assert!(spec.high_availability.is_none(), "optional sections stay absent");
}

/// Story: defaulting the output of a previous run changes nothing
#[test]
fn defaulted_document_is_a_fixed_point() {
    let (document, result) = process(THREE_NODE);
    result.unwrap();

    let rendered = serde_yaml::to_string(&document).unwrap();
    let mut again = loader::parse(&rendered).unwrap();
    again.spec_mut().set_defaults();
    assert_eq!(again, document);
}

/// Story: explicitly written values survive defaulting untouched
#[test]
fn explicit_values_are_preserved() {
    let (document, result) = process(
        r#"
hosts:
  - name: n1
    address: 10.0.0.1
    port: 2222
    user: ops
kubernetes:
  kubelet:
    maxPods: 64
etcd:
  clientPort: 12379
network:
  plugin: flannel
  kubePodsCidr: 172.16.0.0/16
"#,
    );
    result.unwrap();

    let spec = document.spec();
    assert_eq!(spec.hosts[0].port, 2222);
    assert_eq!(spec.hosts[0].user, "ops");
    assert_eq!(spec.kubernetes.as_ref().unwrap().kubelet.max_pods, Some(64));
    assert_eq!(spec.etcd.as_ref().unwrap().client_port, 12379);

    let network = spec.network.as_ref().unwrap();
    assert_eq!(network.kube_pods_cidr, "172.16.0.0/16");
    assert!(network.flannel.is_some());
    assert!(network.calico.is_none());
}

const EVERY_SECTION: &str = r#"
hosts:
  - name: cp1
    address: 10.0.0.11
    roles: [master, etcd, loadbalancer, registry]
  - name: node1
    address: 10.0.0.21
global:
  user: ops
  password: gpw
system:
  ntpServers: [pool.ntp.org]
  modules: []
  sysctlParams:
    vm.swappiness: "10"
roleGroups:
  master:
    hosts: [cp1]
  worker:
    hosts: [node1]
  customRoles:
    - name: gpu
      hosts: [node1]
kubernetes:
  kubelet:
    evictionHard:
      memory.available: 500Mi
etcd:
  type: binary
  electionTimeoutMs: 6000
network:
  plugin: calico
  calico:
    vethMtu: 1400
    ipPools:
      - name: extra
        cidr: 10.244.0.0/16
  multus:
    enabled: true
dns:
  coreDns:
    upstreamDnsServers: []
    externalZones:
      - zones: [corp.example.com]
        nameservers: [10.0.0.53]
  nodeLocalDns:
    externalZones:
      - zones: [lab.example.com]
        nameservers: [10.0.0.54]
        cache: 60
containerRuntime:
  containerd:
    version: 1.6.0
    registryMirrors:
      docker.io: ["https://mirror.example.com"]
    requiredPlugins: []
controlPlaneEndpoint:
  address: 10.0.0.100
highAvailability:
  enabled: true
  external:
    enabled: true
    type: keepalived-nginx
    keepalived:
      vrid: 77
  internal:
    type: kube-vip
    kubeVip:
      vip: 10.0.0.101
storage:
  defaultStorageClass: nfs-client
  openebs:
    enabled: true
  nfs:
    enabled: true
    server: 10.0.0.5
    path: /exports/k8s
registry:
  type: registry
  auths:
    docker.io:
      username: bot
      password: token
preflight:
  minCpuCores: 4
addons:
  - name: metrics
    retries: 5
    sources:
      - chart:
          name: metrics-server
          repo: https://kubernetes-sigs.github.io/metrics-server
          version: 3.12.1
"#;

/// Story: conditional defaulting in every optional section settles after
/// one pass and survives a YAML round trip, keeping user values intact
#[test]
fn fully_populated_document_is_a_fixed_point() {
    let mut once = loader::parse(EVERY_SECTION).unwrap();
    once.spec_mut().set_defaults();

    let mut twice = once.clone();
    twice.spec_mut().set_defaults();
    assert_eq!(twice, once);

    let rendered = serde_yaml::to_string(&once).unwrap();
    let mut reparsed = loader::parse(&rendered).unwrap();
    assert_eq!(reparsed, once);
    reparsed.spec_mut().set_defaults();
    assert_eq!(reparsed, once);

    let spec = once.spec();
    let runtime = spec.container_runtime.as_ref().unwrap();
    let containerd = runtime.containerd.as_ref().unwrap();
    assert_eq!(containerd.version, "1.6.0");
    assert_eq!(runtime.version, "1.6.0");
    assert_eq!(containerd.required_plugins, Some(vec![]));

    let dns = spec.dns.as_ref().unwrap();
    let node_local = dns.node_local_dns.as_ref().unwrap();
    assert_eq!(node_local.external_zones[0].cache, Some(60));
    let core = dns.core_dns.as_ref().unwrap();
    assert_eq!(core.upstream_dns_servers, Some(vec![]));
    assert_eq!(core.external_zones[0].cache, Some(300));

    let system = spec.system.as_ref().unwrap();
    assert_eq!(system.modules, Some(vec![]));
    assert_eq!(system.sysctl_params["vm.swappiness"], "10");

    let kubelet = &spec.kubernetes.as_ref().unwrap().kubelet;
    assert_eq!(kubelet.eviction_hard["memory.available"], "500Mi");

    let etcd = spec.etcd.as_ref().unwrap();
    assert_eq!(etcd.election_timeout_ms, Some(6000));

    let calico = spec.network.as_ref().unwrap().calico.as_ref().unwrap();
    assert_eq!(calico.veth_mtu, Some(1400));
    assert_eq!(calico.ip_pools[0].name, "extra");

    let external = spec
        .high_availability
        .as_ref()
        .and_then(|ha| ha.external.as_ref())
        .unwrap();
    assert_eq!(external.keepalived.as_ref().unwrap().vrid, Some(77));
    assert!(external.nginx.is_some());
    assert!(external.haproxy.is_none());

    assert_eq!(spec.hosts[0].password, "gpw");
    assert_eq!(spec.addons[0].retries, Some(5));
}

// =============================================================================
// Rejected documents
// =============================================================================

/// Story: an empty document reports every missing required section at once
#[test]
fn empty_document_reports_all_required_sections() {
    let (_, result) = process("{}");
    let err = result.unwrap_err();
    assert_eq!(
        messages(&err),
        vec![
            "spec.hosts: must contain at least one host",
            "spec.kubernetes: kubernetes section is required",
            "spec.etcd: etcd section is required",
            "spec.network: network section is required",
        ]
    );
}

/// Story: independent mistakes across sections surface in one report
#[test]
fn unrelated_mistakes_are_reported_together() {
    let (_, result) = process(
        r#"
hosts:
  - name: n1
    address: 10.0.0.300
  - name: n1
    address: 10.0.0.2
kubernetes: {}
etcd:
  clientPort: 70000
network: {}
"#,
    );
    let msgs = messages(&result.unwrap_err());

    assert!(msgs.contains(&"spec.hosts[0:n1].address: invalid IP address \"10.0.0.300\"".to_string()));
    assert!(msgs
        .iter()
        .any(|m| m.starts_with("spec.hosts[1:n1].name: duplicate host name \"n1\"")));
    assert!(msgs.iter().any(|m| m.starts_with("spec.etcd.clientPort:")));
}

#[rstest]
#[case::undefined_role_member(
    r#"
roleGroups:
  master:
    hosts: [cp1, ghost]
"#,
    "spec.roleGroups.master.hosts[1]: host \"ghost\" is not defined in spec.hosts"
)]
#[case::range_member_missing(
    r#"
roleGroups:
  master:
    hosts: [cp1]
  worker:
    hosts: ["cp[1:2]"]
"#,
    "spec.roleGroups.worker.hosts[0]: host \"cp2\" (from \"cp[1:2]\") is not defined in spec.hosts"
)]
#[case::missing_master(
    r#"
roleGroups:
  worker:
    hosts: [cp1]
"#,
    "spec.roleGroups.master.hosts: at least one master host is required"
)]
#[case::local_registry_without_hosts(
    r#"
registry:
  type: registry
"#,
    "spec.registry.type: registry type \"registry\" requires at least one host with the registry role"
)]
#[case::cgroup_mismatch(
    r#"
kubernetes:
  kubelet:
    cgroupDriver: cgroupfs
"#,
    "spec.containerRuntime.containerd.useSystemdCgroup: useSystemdCgroup=true does not match kubelet cgroup driver \"cgroupfs\""
)]
fn cross_section_rules(#[case] overlay: &str, #[case] expected: &str) {
    let mut base: serde_yaml::Value = serde_yaml::from_str(
        r#"
hosts:
  - name: cp1
    address: 10.0.0.1
kubernetes: {}
etcd: {}
network: {}
"#,
    )
    .unwrap();
    let overlay: serde_yaml::Value = serde_yaml::from_str(overlay).unwrap();
    if let (Some(base), Some(overlay)) = (base.as_mapping_mut(), overlay.as_mapping()) {
        for (k, v) in overlay {
            base.insert(k.clone(), v.clone());
        }
    }

    let (_, result) = process(&serde_yaml::to_string(&base).unwrap());
    let msgs = messages(&result.unwrap_err());
    assert!(
        msgs.iter().any(|m| m == expected),
        "expected {expected:?} in {msgs:?}"
    );
}

/// Story: a self-managed external load balancer needs both its hosts and
/// the VIP it will serve
#[test]
fn self_managed_load_balancer_needs_hosts_and_address() {
    let (_, result) = process(
        r#"
hosts:
  - name: cp1
    address: 10.0.0.1
kubernetes: {}
etcd: {}
network: {}
highAvailability:
  enabled: true
  external:
    enabled: true
"#,
    );
    let msgs = messages(&result.unwrap_err());
    assert!(msgs.contains(
        &"spec.highAvailability.external.type: load balancer type \"keepalived-haproxy\" requires at least one host with the loadbalancer role"
            .to_string()
    ));
    assert!(msgs.contains(
        &"spec.controlPlaneEndpoint.address: address is required when load balancer type \"keepalived-haproxy\" is enabled"
            .to_string()
    ));
}

/// Story: roles granted directly on a host count for cross-section checks
#[test]
fn host_roles_satisfy_binary_etcd() {
    let (_, result) = process(
        r#"
hosts:
  - name: cp1
    address: 10.0.0.1
    roles: [master, etcd]
kubernetes: {}
etcd:
  type: binary
network: {}
"#,
    );
    result.unwrap();
}

/// Story: the JSON rendering of a rejection is stable for tooling
#[test]
fn field_errors_serialize_with_rendered_paths() {
    let (_, result) = process("hosts: []\nkubernetes: {}\netcd: {}\nnetwork: {}\n");
    let err = result.unwrap_err();
    let json = serde_json::to_value(err.field_errors()).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            {"path": "spec.hosts", "message": "must contain at least one host"}
        ])
    );
}
