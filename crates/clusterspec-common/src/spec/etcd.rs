//! Etcd deployment settings

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ETCD_AUTO_COMPACTION_RETENTION_HOURS, DEFAULT_ETCD_BACKUP_DIR,
    DEFAULT_ETCD_BACKUP_PERIOD_HOURS, DEFAULT_ETCD_CLIENT_PORT, DEFAULT_ETCD_DATA_DIR,
    DEFAULT_ETCD_ELECTION_TIMEOUT_MS, DEFAULT_ETCD_HEARTBEAT_INTERVAL_MS,
    DEFAULT_ETCD_KEEP_BACKUP_NUMBER, DEFAULT_ETCD_LOG_LEVEL, DEFAULT_ETCD_MAX_REQUEST_BYTES,
    DEFAULT_ETCD_PEER_PORT, DEFAULT_ETCD_QUOTA_BACKEND_BYTES, DEFAULT_ETCD_SNAPSHOT_COUNT,
    DEFAULT_ETCD_VERSION, ETCD_TYPE_EXTERNAL, ETCD_TYPE_KUBEADM, MAX_ETCD_QUOTA_BACKEND_BYTES,
    SUPPORTED_ETCD_LOG_LEVELS, SUPPORTED_ETCD_TYPES,
};
use crate::defaults::{default_str, default_zero, SetDefaults};
use crate::validation::format::{is_valid_url, is_valid_version};
use crate::validation::{
    check_absolute_path, check_non_negative, check_one_of, check_port, FieldPath, Validate,
    ValidationErrors,
};

/// Raft requires the election timeout to cover several heartbeats
const MIN_ELECTION_TO_HEARTBEAT_RATIO: i32 = 5;

/// Etcd settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EtcdConfig {
    /// Deployment type: `binary`, `kubeadm` or `external`
    #[serde(rename = "type")]
    pub type_: String,

    /// Etcd version
    pub version: String,

    /// Connection details for an externally managed cluster
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalEtcdConfig>,

    /// Client port (0 = unset)
    pub client_port: i32,

    /// Peer port (0 = unset)
    pub peer_port: i32,

    /// Data directory
    pub data_dir: String,

    /// Snapshot directory
    pub backup_dir: String,

    /// Hours between scheduled snapshots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_period_hours: Option<i32>,

    /// Snapshots retained on disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_backup_number: Option<i32>,

    /// Committed transactions that trigger a snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_count: Option<i64>,

    /// Hours of history kept by auto compaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_compaction_retention_hours: Option<i32>,

    /// Raft heartbeat interval in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval_ms: Option<i32>,

    /// Raft election timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub election_timeout_ms: Option<i32>,

    /// Backend database quota in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_backend_bytes: Option<i64>,

    /// Maximum client request size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_request_bytes: Option<i64>,

    /// Log level
    pub log_level: String,

    /// Extra command line flags
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_args: BTreeMap<String, String>,
}

/// An etcd cluster managed outside this deployment
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalEtcdConfig {
    /// Client URLs
    pub endpoints: Vec<String>,
    /// CA bundle path
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ca_file: String,
    /// Client certificate path
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cert_file: String,
    /// Client key path
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key_file: String,
}

impl EtcdConfig {
    /// True if the etcd cluster is not managed by this deployment
    pub fn is_external(&self) -> bool {
        self.type_ == ETCD_TYPE_EXTERNAL
    }
}

impl SetDefaults for EtcdConfig {
    fn set_defaults(&mut self) {
        default_str(&mut self.type_, ETCD_TYPE_KUBEADM);
        default_str(&mut self.version, DEFAULT_ETCD_VERSION);
        default_zero(&mut self.client_port, DEFAULT_ETCD_CLIENT_PORT);
        default_zero(&mut self.peer_port, DEFAULT_ETCD_PEER_PORT);
        default_str(&mut self.data_dir, DEFAULT_ETCD_DATA_DIR);
        default_str(&mut self.backup_dir, DEFAULT_ETCD_BACKUP_DIR);
        self.backup_period_hours
            .get_or_insert(DEFAULT_ETCD_BACKUP_PERIOD_HOURS);
        self.keep_backup_number
            .get_or_insert(DEFAULT_ETCD_KEEP_BACKUP_NUMBER);
        self.snapshot_count.get_or_insert(DEFAULT_ETCD_SNAPSHOT_COUNT);
        self.auto_compaction_retention_hours
            .get_or_insert(DEFAULT_ETCD_AUTO_COMPACTION_RETENTION_HOURS);
        self.heartbeat_interval_ms
            .get_or_insert(DEFAULT_ETCD_HEARTBEAT_INTERVAL_MS);
        self.election_timeout_ms
            .get_or_insert(DEFAULT_ETCD_ELECTION_TIMEOUT_MS);
        self.quota_backend_bytes
            .get_or_insert(DEFAULT_ETCD_QUOTA_BACKEND_BYTES);
        self.max_request_bytes
            .get_or_insert(DEFAULT_ETCD_MAX_REQUEST_BYTES);
        default_str(&mut self.log_level, DEFAULT_ETCD_LOG_LEVEL);
    }
}

impl Validate for EtcdConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        check_one_of(
            &self.type_,
            SUPPORTED_ETCD_TYPES,
            "etcd type",
            &path.child("type"),
            errs,
        );

        let external_path = path.child("external");
        match (&self.external, self.is_external()) {
            (None, true) => errs.add(
                &external_path,
                "external etcd configuration is required when type is \"external\"",
            ),
            (Some(_), false) => errs.add(
                &external_path,
                format!(
                    "external etcd configuration is only allowed when type is \"external\", got \"{}\"",
                    self.type_
                ),
            ),
            (Some(external), true) => external.validate(&external_path, errs),
            (None, false) => {}
        }

        if !self.version.is_empty() && !is_valid_version(&self.version) {
            errs.add(
                &path.child("version"),
                format!("invalid etcd version \"{}\"", self.version),
            );
        }

        check_port(self.client_port.into(), &path.child("clientPort"), errs);
        check_port(self.peer_port.into(), &path.child("peerPort"), errs);
        if self.client_port == self.peer_port {
            errs.add(
                &path.child("peerPort"),
                format!("peer port must differ from client port {}", self.client_port),
            );
        }

        check_absolute_path(&self.data_dir, &path.child("dataDir"), errs);
        check_absolute_path(&self.backup_dir, &path.child("backupDir"), errs);

        let counters: [(&str, Option<i64>); 7] = [
            ("backupPeriodHours", self.backup_period_hours.map(i64::from)),
            ("keepBackupNumber", self.keep_backup_number.map(i64::from)),
            ("snapshotCount", self.snapshot_count),
            (
                "autoCompactionRetentionHours",
                self.auto_compaction_retention_hours.map(i64::from),
            ),
            ("heartbeatIntervalMs", self.heartbeat_interval_ms.map(i64::from)),
            ("electionTimeoutMs", self.election_timeout_ms.map(i64::from)),
            ("maxRequestBytes", self.max_request_bytes),
        ];
        for (field, value) in counters {
            if let Some(value) = value {
                check_non_negative(value, &path.child(field), errs);
            }
        }

        if let (Some(heartbeat), Some(election)) =
            (self.heartbeat_interval_ms, self.election_timeout_ms)
        {
            if heartbeat > 0 && election < heartbeat.saturating_mul(MIN_ELECTION_TO_HEARTBEAT_RATIO) {
                errs.add(
                    &path.child("electionTimeoutMs"),
                    format!(
                        "election timeout {election}ms must be at least {MIN_ELECTION_TO_HEARTBEAT_RATIO} times the heartbeat interval {heartbeat}ms"
                    ),
                );
            }
        }

        if let Some(quota) = self.quota_backend_bytes {
            if !(0..=MAX_ETCD_QUOTA_BACKEND_BYTES).contains(&quota) {
                errs.add(
                    &path.child("quotaBackendBytes"),
                    format!(
                        "quota {quota} must be between 0 and {MAX_ETCD_QUOTA_BACKEND_BYTES} bytes"
                    ),
                );
            }
        }

        check_one_of(
            &self.log_level,
            SUPPORTED_ETCD_LOG_LEVELS,
            "etcd log level",
            &path.child("logLevel"),
            errs,
        );
    }
}

impl Validate for ExternalEtcdConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        if self.endpoints.is_empty() {
            errs.add(
                &path.child("endpoints"),
                "at least one endpoint is required for external etcd",
            );
        }
        for (i, endpoint) in self.endpoints.iter().enumerate() {
            if !is_valid_url(endpoint, &["http", "https"]) {
                errs.add(
                    &path.child("endpoints").index(i),
                    format!("invalid etcd endpoint \"{endpoint}\": must be an http(s) URL"),
                );
            }
        }
        check_absolute_path(&self.ca_file, &path.child("caFile"), errs);
        check_absolute_path(&self.cert_file, &path.child("certFile"), errs);
        check_absolute_path(&self.key_file, &path.child("keyFile"), errs);
        if self.cert_file.is_empty() != self.key_file.is_empty() {
            errs.add(path, "certFile and keyFile must be set together");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(config: &EtcdConfig) -> ValidationErrors {
        let mut errs = ValidationErrors::new();
        config.validate(&FieldPath::root("spec").child("etcd"), &mut errs);
        errs
    }

    #[test]
    fn defaulted_config_is_valid() {
        let mut config = EtcdConfig::default();
        config.set_defaults();

        assert_eq!(config.type_, "kubeadm");
        assert_eq!(config.client_port, 2379);
        assert_eq!(config.peer_port, 2380);
        assert_eq!(config.quota_backend_bytes, Some(2 * 1024 * 1024 * 1024));

        let errs = validate(&config);
        assert!(!errs.has_errors(), "{errs}");
    }

    #[test]
    fn set_defaults_is_idempotent() {
        let mut once = EtcdConfig::default();
        once.set_defaults();
        let mut twice = once.clone();
        twice.set_defaults();
        assert_eq!(once, twice);
    }

    /// Story: Choosing an external etcd requires telling us where it lives
    #[test]
    fn story_external_type_requires_endpoints() {
        let mut config = EtcdConfig {
            type_: "external".to_string(),
            ..Default::default()
        };
        config.set_defaults();
        let errs = validate(&config);
        assert_eq!(errs.len(), 1);
        assert!(errs.render().starts_with("spec.etcd.external: external etcd configuration is required"));

        config.external = Some(ExternalEtcdConfig {
            endpoints: vec!["https://10.0.0.9:2379".to_string(), "10.0.0.10".to_string()],
            cert_file: "/etc/etcd/client.crt".to_string(),
            ..Default::default()
        });
        let errs = validate(&config);
        let rendered = errs.render();
        assert_eq!(errs.len(), 2, "{rendered}");
        assert!(rendered.contains("spec.etcd.external.endpoints[1]"));
        assert!(rendered.contains("certFile and keyFile must be set together"));
    }

    #[test]
    fn external_block_rejected_for_managed_types() {
        let mut config = EtcdConfig {
            external: Some(ExternalEtcdConfig::default()),
            ..Default::default()
        };
        config.set_defaults();
        let errs = validate(&config);
        assert_eq!(errs.len(), 1);
        assert!(errs.render().contains("only allowed when type is \"external\""));
    }

    #[test]
    fn reports_timing_ports_and_quota() {
        let mut config = EtcdConfig {
            client_port: 2379,
            peer_port: 2379,
            heartbeat_interval_ms: Some(500),
            election_timeout_ms: Some(1000),
            quota_backend_bytes: Some(MAX_ETCD_QUOTA_BACKEND_BYTES + 1),
            snapshot_count: Some(-1),
            data_dir: "var/lib/etcd".to_string(),
            log_level: "trace".to_string(),
            ..Default::default()
        };
        config.set_defaults();

        let errs = validate(&config);
        let rendered = errs.render();
        assert_eq!(errs.len(), 6, "{rendered}");
        assert!(rendered.contains("spec.etcd.peerPort: peer port must differ"));
        assert!(rendered.contains("spec.etcd.electionTimeoutMs"));
        assert!(rendered.contains("spec.etcd.quotaBackendBytes"));
        assert!(rendered.contains("spec.etcd.snapshotCount: must be non-negative, got -1"));
        assert!(rendered.contains("spec.etcd.dataDir"));
        assert!(rendered.contains("spec.etcd.logLevel"));
    }
}
