//! Defaulting pass plumbing
//!
//! Every section implements [`SetDefaults`]. Defaults only ever fill gaps:
//! a value the user set is never overwritten, and running the pass twice
//! yields the same tree as running it once.

use std::collections::BTreeMap;

/// In-place gap filling for one node of the spec tree
pub trait SetDefaults {
    /// Fill every unset field that has a documented default
    fn set_defaults(&mut self);
}

impl<T: SetDefaults> SetDefaults for Option<T> {
    fn set_defaults(&mut self) {
        if let Some(inner) = self.as_mut() {
            inner.set_defaults();
        }
    }
}

impl<T: SetDefaults> SetDefaults for Vec<T> {
    fn set_defaults(&mut self) {
        for item in self.iter_mut() {
            item.set_defaults();
        }
    }
}

/// Set `field` to `value` when it is empty
pub(crate) fn default_str(field: &mut String, value: &str) {
    if field.is_empty() {
        *field = value.to_string();
    }
}

/// Set `field` to `value` when it holds the zero value
pub(crate) fn default_zero<T: Default + PartialEq>(field: &mut T, value: T) {
    if *field == T::default() {
        *field = value;
    }
}

/// Set an optional list to `values` when it is unset; an explicit empty list is kept
pub(crate) fn default_list(field: &mut Option<Vec<String>>, values: &[&str]) {
    if field.is_none() {
        *field = Some(values.iter().map(|v| v.to_string()).collect());
    }
}

/// Add baseline entries for keys the map does not already contain
pub(crate) fn merge_missing(map: &mut BTreeMap<String, String>, baseline: &[(&str, &str)]) {
    for (key, value) in baseline {
        map.entry((*key).to_string())
            .or_insert_with(|| (*value).to_string());
    }
}
