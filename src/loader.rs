//! Cluster document loader
//!
//! Accepts either a full `Cluster` resource (`apiVersion`, `kind`,
//! `metadata`, `spec`) or a bare spec mapping, and remembers which shape
//! it saw so that output can mirror the input.

use std::path::Path;

use kube::Resource;
use serde::Serialize;
use tracing::debug;

use clusterspec_common::spec::{Cluster, ClusterSpec};

use crate::{Error, Result};

/// A parsed cluster document
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Document {
    /// A full `Cluster` resource
    Resource(Box<Cluster>),
    /// A bare `ClusterSpec` mapping
    Spec(ClusterSpec),
}

impl Document {
    /// The spec inside the document
    pub fn spec(&self) -> &ClusterSpec {
        match self {
            Document::Resource(cluster) => &cluster.spec,
            Document::Spec(spec) => spec,
        }
    }

    /// Mutable access to the spec inside the document
    pub fn spec_mut(&mut self) -> &mut ClusterSpec {
        match self {
            Document::Resource(cluster) => &mut cluster.spec,
            Document::Spec(spec) => spec,
        }
    }
}

/// Read and parse a cluster document from disk
pub fn load_file(path: &Path) -> Result<Document> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    debug!(path = %path.display(), bytes = content.len(), "read cluster document");
    parse(&content)
}

/// Parse a cluster document from YAML (JSON is accepted as a YAML subset)
pub fn parse(content: &str) -> Result<Document> {
    let value: serde_yaml::Value = serde_yaml::from_str(content)?;
    let mapping = value
        .as_mapping()
        .ok_or_else(|| Error::invalid_document("document root must be a mapping"))?;

    if !mapping.contains_key("kind") && !mapping.contains_key("apiVersion") {
        let spec: ClusterSpec = serde_yaml::from_value(value)?;
        return Ok(Document::Spec(spec));
    }

    let kind = mapping.get("kind").and_then(|k| k.as_str()).unwrap_or_default();
    let api_version = mapping
        .get("apiVersion")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let expected_kind = Cluster::kind(&());
    let expected_api_version = Cluster::api_version(&());
    if kind != expected_kind || api_version != expected_api_version {
        return Err(Error::invalid_document(format!(
            "expected {expected_api_version} {expected_kind}, got \"{api_version}\" \"{kind}\""
        )));
    }

    let cluster: Cluster = serde_yaml::from_value(value)?;
    Ok(Document::Resource(Box::new(cluster)))
}
