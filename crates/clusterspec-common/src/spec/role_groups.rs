//! Role assignments: named lists of host references

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{
    PREDEFINED_ROLES, ROLE_ETCD, ROLE_LOADBALANCER, ROLE_MASTER, ROLE_REGISTRY, ROLE_STORAGE,
    ROLE_WORKER,
};
use crate::defaults::SetDefaults;
use crate::validation::format::is_dns1123_label;
use crate::validation::{expand_host_pattern, CrossRefIndex, FieldPath, ValidationErrors};

/// Hosts assigned to one predefined role
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleSpec {
    /// Host names or bracket-range patterns such as `node[1:3]`
    pub hosts: Vec<String>,
}

impl RoleSpec {
    /// Build a role from literal host entries
    pub fn with_hosts(hosts: &[&str]) -> Self {
        Self {
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
        }
    }
}

/// A user-defined role and its hosts
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomRoleSpec {
    /// Role name; must not reuse a predefined role name
    pub name: String,
    /// Host names or bracket-range patterns
    pub hosts: Vec<String>,
}

/// Role groups of the cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleGroupsSpec {
    /// Control plane hosts
    pub master: RoleSpec,
    /// Worker hosts
    pub worker: RoleSpec,
    /// Etcd members
    pub etcd: RoleSpec,
    /// Self-managed load balancer hosts
    pub loadbalancer: RoleSpec,
    /// Storage hosts
    pub storage: RoleSpec,
    /// Local registry hosts
    pub registry: RoleSpec,
    /// Additional named roles
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_roles: Vec<CustomRoleSpec>,
}

impl RoleGroupsSpec {
    /// The six predefined roles with their field names, in document order
    pub fn predefined(&self) -> [(&'static str, &RoleSpec); 6] {
        [
            (ROLE_MASTER, &self.master),
            (ROLE_WORKER, &self.worker),
            (ROLE_ETCD, &self.etcd),
            (ROLE_LOADBALANCER, &self.loadbalancer),
            (ROLE_STORAGE, &self.storage),
            (ROLE_REGISTRY, &self.registry),
        ]
    }

    /// Every (role name, host entries) pair, predefined roles first
    pub fn assignments(&self) -> Vec<(&str, &[String])> {
        let mut out: Vec<(&str, &[String])> = self
            .predefined()
            .into_iter()
            .map(|(name, role)| (name, role.hosts.as_slice()))
            .collect();
        out.extend(
            self.custom_roles
                .iter()
                .map(|c| (c.name.as_str(), c.hosts.as_slice())),
        );
        out
    }

    /// Validate role names and resolve every host entry against the index
    pub fn validate_with(
        &self,
        path: &FieldPath,
        index: &CrossRefIndex,
        errs: &mut ValidationErrors,
    ) {
        for (name, role) in self.predefined() {
            validate_host_entries(&role.hosts, &path.child(name).child("hosts"), index, errs);
        }

        let mut seen = BTreeSet::new();
        for (i, custom) in self.custom_roles.iter().enumerate() {
            let custom_path = path.child("customRoles").keyed(i, &custom.name);
            let name_path = custom_path.child("name");

            if custom.name.is_empty() {
                errs.add(&name_path, "custom role name is required");
            } else if PREDEFINED_ROLES.contains(&custom.name.as_str()) {
                errs.add(
                    &name_path,
                    format!(
                        "custom role name \"{}\" conflicts with a predefined role",
                        custom.name
                    ),
                );
            } else if !is_dns1123_label(&custom.name) {
                errs.add(
                    &name_path,
                    format!(
                        "invalid custom role name \"{}\": must be a lowercase RFC 1123 label",
                        custom.name
                    ),
                );
            }
            if !custom.name.is_empty() && !seen.insert(custom.name.as_str()) {
                errs.add(
                    &name_path,
                    format!("duplicate custom role name \"{}\"", custom.name),
                );
            }

            validate_host_entries(&custom.hosts, &custom_path.child("hosts"), index, errs);
        }
    }
}

/// Expand and resolve one role's host list, one error per unresolved name
fn validate_host_entries(
    entries: &[String],
    path: &FieldPath,
    index: &CrossRefIndex,
    errs: &mut ValidationErrors,
) {
    let mut seen = BTreeSet::new();
    for (i, entry) in entries.iter().enumerate() {
        let entry_path = path.index(i);
        if entry.trim().is_empty() {
            errs.add(&entry_path, "host entry cannot be empty");
            continue;
        }

        let names = match expand_host_pattern(entry) {
            Ok(names) => names,
            Err(msg) => {
                errs.add(&entry_path, msg);
                continue;
            }
        };

        let expanded = names.len() > 1 || names.first().is_some_and(|n| n != entry);
        for name in names {
            if !index.has_host(&name) {
                let msg = if expanded {
                    format!("host \"{name}\" (from \"{entry}\") is not defined in spec.hosts")
                } else {
                    format!("host \"{name}\" is not defined in spec.hosts")
                };
                errs.add(&entry_path, msg);
            } else if !seen.insert(name.clone()) {
                errs.add(
                    &entry_path,
                    format!("host \"{name}\" is listed more than once in this role"),
                );
            }
        }
    }
}

impl SetDefaults for RoleGroupsSpec {
    // Role lists are plain collections: an absent list is already an empty one
    fn set_defaults(&mut self) {}
}
