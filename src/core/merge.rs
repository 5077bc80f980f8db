//! Version and variable map merging

use std::collections::BTreeMap;

/// Merge two flat maps, override wins.
///
/// Keys only in `base` pass through unchanged. Always builds a fresh map.
pub fn merge(
    base: &BTreeMap<String, String>,
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
