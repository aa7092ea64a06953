//! Cross-reference index
//!
//! Built once per top-level validation from the hosts list and role groups,
//! then passed by reference into the validators that resolve names. It is
//! never stored beyond the validation call that built it.

use std::collections::{BTreeMap, BTreeSet};

use crate::constants::{MAX_HOST_RANGE_EXPANSION, PREDEFINED_ROLES};
use crate::spec::ClusterSpec;

/// Lookup tables for referential-integrity checks
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CrossRefIndex {
    /// Declared host name -> position of its first declaration
    hosts: BTreeMap<String, usize>,
    /// Custom role names declared under `roleGroups.customRoles`
    custom_roles: BTreeSet<String>,
    /// Role name -> declared hosts holding it, from role groups and `host.roles`
    role_members: BTreeMap<String, BTreeSet<String>>,
}

impl CrossRefIndex {
    /// Build the index for one validation call
    pub fn build(spec: &ClusterSpec) -> Self {
        let mut index = Self::default();

        for (i, host) in spec.hosts.iter().enumerate() {
            if !host.name.is_empty() {
                index.hosts.entry(host.name.clone()).or_insert(i);
            }
        }

        if let Some(groups) = &spec.role_groups {
            for custom in &groups.custom_roles {
                if !custom.name.is_empty() {
                    index.custom_roles.insert(custom.name.clone());
                }
            }
            for (role, patterns) in groups.assignments() {
                for pattern in patterns {
                    // Malformed patterns are reported by the role group validator
                    let Ok(names) = expand_host_pattern(pattern) else {
                        continue;
                    };
                    for name in names {
                        if index.hosts.contains_key(&name) {
                            index.add_member(role, name);
                        }
                    }
                }
            }
        }

        for host in &spec.hosts {
            if host.name.is_empty() {
                continue;
            }
            for role in &host.roles {
                index.add_member(role, host.name.clone());
            }
        }

        index
    }

    fn add_member(&mut self, role: &str, host: String) {
        self.role_members
            .entry(role.to_string())
            .or_default()
            .insert(host);
    }

    /// True if a host with this name is declared in `spec.hosts`
    pub fn has_host(&self, name: &str) -> bool {
        self.hosts.contains_key(name)
    }

    /// Position of the first host declared with this name
    pub fn first_position(&self, name: &str) -> Option<usize> {
        self.hosts.get(name).copied()
    }

    /// Number of distinct declared host names
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// True if `role` is one of the predefined roles
    pub fn is_predefined_role(role: &str) -> bool {
        PREDEFINED_ROLES.contains(&role)
    }

    /// True if `role` is declared under `roleGroups.customRoles`
    pub fn is_custom_role(&self, role: &str) -> bool {
        self.custom_roles.contains(role)
    }

    /// True if `role` is predefined or a declared custom role
    pub fn is_known_role(&self, role: &str) -> bool {
        Self::is_predefined_role(role) || self.is_custom_role(role)
    }

    /// Declared hosts holding `role`
    pub fn role_members(&self, role: &str) -> impl Iterator<Item = &str> {
        self.role_members
            .get(role)
            .into_iter()
            .flat_map(|members| members.iter().map(String::as_str))
    }

    /// True if at least one declared host holds `role`
    pub fn has_role_members(&self, role: &str) -> bool {
        self.role_members
            .get(role)
            .is_some_and(|members| !members.is_empty())
    }
}

/// Expand a bracket-range host pattern.
///
/// `node[1:3]` yields `node1`, `node2`, `node3`; a zero-padded start such as
/// `node[01:10]` pads every generated number to the same width. A name with
/// no brackets expands to itself.
pub fn expand_host_pattern(pattern: &str) -> Result<Vec<String>, String> {
    let Some(open) = pattern.find('[') else {
        if pattern.contains(']') {
            return Err(format!("unbalanced ']' in host pattern \"{pattern}\""));
        }
        return Ok(vec![pattern.to_string()]);
    };

    let close = pattern[open..]
        .find(']')
        .map(|offset| open + offset)
        .ok_or_else(|| format!("unterminated '[' in host pattern \"{pattern}\""))?;

    let prefix = &pattern[..open];
    let range = &pattern[open + 1..close];
    let suffix = &pattern[close + 1..];

    if suffix.contains('[') || suffix.contains(']') {
        return Err(format!(
            "host pattern \"{pattern}\" may contain only one range"
        ));
    }

    let (start_str, end_str) = range.split_once(':').ok_or_else(|| {
        format!("host pattern \"{pattern}\" must use the form prefix[start:end]")
    })?;

    let is_number = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !is_number(start_str) || !is_number(end_str) {
        return Err(format!(
            "host pattern \"{pattern}\" range bounds must be non-negative integers"
        ));
    }

    let start: u64 = start_str
        .parse()
        .map_err(|_| format!("host pattern \"{pattern}\" start is out of range"))?;
    let end: u64 = end_str
        .parse()
        .map_err(|_| format!("host pattern \"{pattern}\" end is out of range"))?;

    if start > end {
        return Err(format!(
            "host pattern \"{pattern}\" start {start} is greater than end {end}"
        ));
    }
    if end - start + 1 > MAX_HOST_RANGE_EXPANSION {
        return Err(format!(
            "host pattern \"{pattern}\" expands to more than {MAX_HOST_RANGE_EXPANSION} hosts"
        ));
    }

    let width = if start_str.len() > 1 && start_str.starts_with('0') {
        start_str.len()
    } else {
        0
    };

    Ok((start..=end)
        .map(|n| format!("{prefix}{n:0width$}{suffix}"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{ClusterSpec, CustomRoleSpec, HostSpec, RoleGroupsSpec, RoleSpec};
    use rstest::rstest;

    fn host(name: &str) -> HostSpec {
        HostSpec {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[rstest]
    #[case("n1", vec!["n1"])]
    #[case("node[1:3]", vec!["node1", "node2", "node3"])]
    #[case("node[08:10]", vec!["node08", "node09", "node10"])]
    #[case("node[9:10].dc1", vec!["node9.dc1", "node10.dc1"])]
    #[case("[1:2]", vec!["1", "2"])]
    #[case("node[5:5]", vec!["node5"])]
    fn expands_patterns(#[case] pattern: &str, #[case] expected: Vec<&str>) {
        let names = expand_host_pattern(pattern).expect("pattern should expand");
        assert_eq!(names, expected);
    }

    #[rstest]
    #[case("node[3:1]")]
    #[case("node[1-3]")]
    #[case("node[a:c]")]
    #[case("node[1:3")]
    #[case("node1:3]")]
    #[case("node[1:2][3:4]")]
    #[case("node[:3]")]
    #[case("node[0:100000]")]
    fn rejects_malformed_patterns(#[case] pattern: &str) {
        assert!(expand_host_pattern(pattern).is_err(), "{pattern} should fail");
    }

    #[test]
    fn indexes_hosts_roles_and_first_positions() {
        let mut lb = host("lb1");
        lb.roles = vec!["loadbalancer".to_string()];

        let spec = ClusterSpec {
            hosts: vec![host("node1"), host("node2"), lb, host("node1")],
            role_groups: Some(RoleGroupsSpec {
                master: RoleSpec::with_hosts(&["node1"]),
                worker: RoleSpec::with_hosts(&["node[1:3]"]),
                custom_roles: vec![CustomRoleSpec {
                    name: "gpu".to_string(),
                    hosts: vec!["node2".to_string()],
                }],
                ..Default::default()
            }),
            ..Default::default()
        };

        let index = CrossRefIndex::build(&spec);

        assert_eq!(index.host_count(), 3);
        assert_eq!(index.first_position("node1"), Some(0));
        assert!(index.has_host("lb1"));
        assert!(!index.has_host("node3"));

        // node3 does not exist, so it never becomes a member
        let workers: Vec<_> = index.role_members("worker").collect();
        assert_eq!(workers, vec!["node1", "node2"]);

        assert!(index.has_role_members("loadbalancer"));
        assert!(index.has_role_members("gpu"));
        assert!(!index.has_role_members("etcd"));

        assert!(index.is_custom_role("gpu"));
        assert!(index.is_known_role("master"));
        assert!(index.is_known_role("gpu"));
        assert!(!index.is_known_role("database"));
    }

    #[test]
    fn empty_spec_builds_empty_index() {
        let index = CrossRefIndex::build(&ClusterSpec::default());
        assert_eq!(index, CrossRefIndex::default());
        assert_eq!(index.role_members("master").count(), 0);
    }
}
