//! CRD command

use clap::Args;
use kube::CustomResourceExt;

use clusterspec_common::spec::Cluster;

use crate::Result;

/// Print the `Cluster` CustomResourceDefinition as YAML
#[derive(Args, Debug)]
pub struct CrdArgs {}

pub fn run(_args: CrdArgs) -> Result<()> {
    print!("{}", serde_yaml::to_string(&Cluster::crd())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crd_names_the_cluster_kind() {
        let crd = Cluster::crd();
        assert_eq!(crd.spec.group, clusterspec_common::API_GROUP);
        assert_eq!(crd.spec.names.kind, "Cluster");
        assert_eq!(crd.spec.names.plural, "clusters");
        assert_eq!(crd.spec.scope, "Cluster");
    }
}
