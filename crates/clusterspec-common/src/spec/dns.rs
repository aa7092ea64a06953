//! Cluster DNS: CoreDNS, NodeLocal DNSCache and forwarded zones

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_EXTERNAL_ZONE_CACHE_SECS, DEFAULT_NODE_LOCAL_DNS_IP, DEFAULT_UPSTREAM_DNS_SERVERS,
};
use crate::defaults::{default_list, default_str, SetDefaults};
use crate::validation::format::{is_absolute_path, is_valid_domain, is_valid_ip, is_valid_nameserver};
use crate::validation::{check_non_negative, FieldPath, Validate, ValidationErrors};

/// DNS settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DnsConfig {
    /// Extra `/etc/hosts` style entries served by CoreDNS
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dns_etc_hosts: String,

    /// Extra entries appended to every node's `/etc/hosts`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub node_etc_hosts: String,

    /// CoreDNS settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_dns: Option<CoreDns>,

    /// NodeLocal DNSCache settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_local_dns: Option<NodeLocalDns>,
}

/// CoreDNS settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreDns {
    /// Upstream resolvers: IPs, `ip:port`, or a resolv.conf path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_dns_servers: Option<Vec<String>>,

    /// Raw Corefile snippet appended to the server block
    #[serde(skip_serializing_if = "String::is_empty")]
    pub additional_configs: String,

    /// Raw rewrite plugin block
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rewrite_block: String,

    /// Zones forwarded to dedicated nameservers
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub external_zones: Vec<ExternalZone>,
}

/// NodeLocal DNSCache settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeLocalDns {
    /// Deploy the node-local cache
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Link-local listen address
    pub ip: String,

    /// Zones forwarded to dedicated nameservers
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub external_zones: Vec<ExternalZone>,
}

/// A set of zones forwarded to specific nameservers
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalZone {
    /// Zone names
    pub zones: Vec<String>,
    /// Nameservers as IP or `ip:port`
    pub nameservers: Vec<String>,
    /// Cache TTL in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<i32>,
    /// Query rewrite rules applied before forwarding
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rewrite: Vec<RewriteRule>,
}

/// A single query-name rewrite
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RewriteRule {
    /// Regex matched against the query name
    pub from_pattern: String,
    /// Replacement template
    pub to_template: String,
}

impl SetDefaults for DnsConfig {
    fn set_defaults(&mut self) {
        self.core_dns
            .get_or_insert_with(Default::default)
            .set_defaults();
        self.node_local_dns
            .get_or_insert_with(Default::default)
            .set_defaults();
    }
}

impl SetDefaults for CoreDns {
    fn set_defaults(&mut self) {
        default_list(&mut self.upstream_dns_servers, DEFAULT_UPSTREAM_DNS_SERVERS);
        self.external_zones.set_defaults();
    }
}

impl SetDefaults for NodeLocalDns {
    fn set_defaults(&mut self) {
        self.enabled.get_or_insert(true);
        default_str(&mut self.ip, DEFAULT_NODE_LOCAL_DNS_IP);
        self.external_zones.set_defaults();
    }
}

impl SetDefaults for ExternalZone {
    fn set_defaults(&mut self) {
        self.cache.get_or_insert(DEFAULT_EXTERNAL_ZONE_CACHE_SECS);
    }
}

impl Validate for DnsConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        self.core_dns.validate(&path.child("coreDns"), errs);
        self.node_local_dns.validate(&path.child("nodeLocalDns"), errs);
    }
}

impl Validate for CoreDns {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        for (i, server) in self.upstream_dns_servers.iter().flatten().enumerate() {
            if !is_valid_nameserver(server) && !is_absolute_path(server) {
                errs.add(
                    &path.child("upstreamDnsServers").index(i),
                    format!(
                        "invalid upstream DNS server \"{server}\": must be an IP, ip:port or resolv.conf path"
                    ),
                );
            }
        }
        validate_zones(&self.external_zones, &path.child("externalZones"), errs);
    }
}

impl Validate for NodeLocalDns {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        if !is_valid_ip(&self.ip) {
            errs.add(
                &path.child("ip"),
                format!("invalid NodeLocal DNS address \"{}\"", self.ip),
            );
        }
        validate_zones(&self.external_zones, &path.child("externalZones"), errs);
    }
}

fn validate_zones(zones: &[ExternalZone], path: &FieldPath, errs: &mut ValidationErrors) {
    for (i, zone) in zones.iter().enumerate() {
        let key = zone.zones.first().map(String::as_str).unwrap_or_default();
        zone.validate(&path.keyed(i, key), errs);
    }
}

impl Validate for ExternalZone {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        if self.zones.is_empty() {
            errs.add(&path.child("zones"), "at least one zone is required");
        }
        for (i, zone) in self.zones.iter().enumerate() {
            if !is_valid_domain(zone) {
                errs.add(
                    &path.child("zones").index(i),
                    format!("invalid zone \"{zone}\""),
                );
            }
        }

        if self.nameservers.is_empty() {
            errs.add(&path.child("nameservers"), "at least one nameserver is required");
        }
        for (i, ns) in self.nameservers.iter().enumerate() {
            if !is_valid_nameserver(ns) {
                errs.add(
                    &path.child("nameservers").index(i),
                    format!("invalid nameserver \"{ns}\": must be an IP or ip:port"),
                );
            }
        }

        if let Some(cache) = self.cache {
            check_non_negative(cache.into(), &path.child("cache"), errs);
        }

        for (i, rule) in self.rewrite.iter().enumerate() {
            let rule_path = path.child("rewrite").index(i);
            if rule.from_pattern.trim().is_empty() {
                errs.add(&rule_path.child("fromPattern"), "fromPattern is required");
            }
            if rule.to_template.trim().is_empty() {
                errs.add(&rule_path.child("toTemplate"), "toTemplate is required");
            }
        }
    }
}
