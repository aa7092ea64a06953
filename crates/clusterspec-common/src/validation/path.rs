//! Structured field paths
//!
//! Paths are built segment by segment while the validators descend the tree
//! and are only turned into text when an error is rendered, so every
//! validator produces the same shape: `spec.hosts[2:worker-1].port`.

use std::fmt;

use serde::{Serialize, Serializer};

/// One step of a [`FieldPath`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// A named struct field, rendered `.name`
    Field(String),
    /// A list position, rendered `[i]`
    Index(usize),
    /// A list position disambiguated by the entry's key, rendered `[i:key]`
    KeyedIndex(usize, String),
    /// A map key, rendered `[key]`
    Key(String),
}

/// Location of a value in the spec tree
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// An empty path
    pub fn new() -> Self {
        Self::default()
    }

    /// A path with a single field segment
    pub fn root(name: &str) -> Self {
        Self::new().child(name)
    }

    /// Extend with a struct field
    pub fn child(&self, name: &str) -> Self {
        self.push(PathSegment::Field(name.to_string()))
    }

    /// Extend with a list position
    pub fn index(&self, i: usize) -> Self {
        self.push(PathSegment::Index(i))
    }

    /// Extend with a list position tagged by the entry's name.
    ///
    /// Falls back to a bare index when the name is empty.
    pub fn keyed(&self, i: usize, key: &str) -> Self {
        if key.is_empty() {
            self.index(i)
        } else {
            self.push(PathSegment::KeyedIndex(i, key.to_string()))
        }
    }

    /// Extend with a map key
    pub fn key(&self, key: &str) -> Self {
        self.push(PathSegment::Key(key.to_string()))
    }

    /// The segments in order
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// True if the path has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn push(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }
}

impl From<&str> for FieldPath {
    /// Parse a dotted prefix such as `spec` or `cluster.spec`
    fn from(prefix: &str) -> Self {
        Self {
            segments: prefix
                .split('.')
                .filter(|s| !s.is_empty())
                .map(|s| PathSegment::Field(s.to_string()))
                .collect(),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => write!(f, "{name}")?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(idx) => write!(f, "[{idx}]")?,
                PathSegment::KeyedIndex(idx, key) => write!(f, "[{idx}:{key}]")?,
                PathSegment::Key(key) => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
