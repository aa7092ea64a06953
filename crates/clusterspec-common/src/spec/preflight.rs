//! Node requirements verified before deployment

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MIN_CPU_CORES, DEFAULT_MIN_MEMORY_MB, KNOWN_PREFLIGHT_CHECKS};
use crate::defaults::{default_zero, SetDefaults};
use crate::validation::{check_non_negative, check_one_of, FieldPath, Validate, ValidationErrors};

/// Preflight settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PreflightConfig {
    /// Minimum CPU cores per node (0 = unset)
    pub min_cpu_cores: i32,

    /// Minimum memory per node in MiB (0 = unset)
    pub min_memory_mb: i64,

    /// Turn swap off on every node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_swap: Option<bool>,

    /// Checks to skip by name
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skip_checks: Vec<String>,
}

impl SetDefaults for PreflightConfig {
    fn set_defaults(&mut self) {
        default_zero(&mut self.min_cpu_cores, DEFAULT_MIN_CPU_CORES);
        default_zero(&mut self.min_memory_mb, DEFAULT_MIN_MEMORY_MB);
        self.disable_swap.get_or_insert(true);
    }
}

impl Validate for PreflightConfig {
    fn validate(&self, path: &FieldPath, errs: &mut ValidationErrors) {
        check_non_negative(self.min_cpu_cores.into(), &path.child("minCpuCores"), errs);
        check_non_negative(self.min_memory_mb, &path.child("minMemoryMb"), errs);
        for (i, check) in self.skip_checks.iter().enumerate() {
            check_one_of(
                check,
                KNOWN_PREFLIGHT_CHECKS,
                "preflight check",
                &path.child("skipChecks").index(i),
                errs,
            );
        }
    }
}
