//! Automatic shorthand aliases
//!
//! Every dotted prefix of a tag name becomes an alias for the highest tag that
//! starts with it. "Highest" compares components as strings, so `"9"` ranks
//! above `"10"`.

use std::collections::BTreeMap;

use crate::core::model::Tag;

/// Generate aliases for a list of resolved tags
pub fn generate_semver_aliases(tags: &[Tag]) -> BTreeMap<String, String> {
    let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
    aliases_for_names(&names)
}

/// Generate aliases for a list of tag names.
///
/// For a name with N dot-separated components, prefixes of length 1..N-1
/// are candidates. A candidate maps to the matching tag whose component list
/// is greatest under string ordering.
pub fn aliases_for_names(names: &[&str]) -> BTreeMap<String, String> {
    let split: Vec<Vec<&str>> = names.iter().map(|n| n.split('.').collect()).collect();
    let mut aliases = BTreeMap::new();

    for parts in &split {
        for len in 1..parts.len() {
            let prefix = &parts[..len];
            let alias = prefix.join(".");
            if aliases.contains_key(&alias) {
                continue;
            }

            let best = split
                .iter()
                .filter(|candidate| candidate.len() >= len && &candidate[..len] == prefix)
                .max();

            if let Some(best) = best {
                aliases.insert(alias, best.join("."));
            }
        }
    }

    aliases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generators::tag_name;
    use proptest::prelude::*;

    #[test]
    fn test_semver_aliases_point_to_highest() {
        let aliases = aliases_for_names(&["3.13.7", "3.13.6", "3.12.0"]);

        assert_eq!(aliases["3"], "3.13.7");
        assert_eq!(aliases["3.13"], "3.13.7");
        assert_eq!(aliases["3.12"], "3.12.0");
        assert_eq!(aliases.len(), 3);
    }

    #[test]
    fn test_no_alias_equals_a_full_tag_name() {
        let aliases = aliases_for_names(&["3.13.7", "3.13.6", "3.12.0"]);
        for tag in ["3.13.7", "3.13.6", "3.12.0"] {
            assert!(!aliases.contains_key(tag));
        }
    }

    #[test]
    fn test_shorter_tag_can_be_an_alias_of_a_longer_one() {
        // "1.0" is a prefix of "1.0.5", so the shorter name becomes an alias.
        let aliases = aliases_for_names(&["1.0", "1.0.5"]);
        assert_eq!(aliases["1"], "1.0.5");
        assert_eq!(aliases["1.0"], "1.0.5");
    }

    #[test]
    fn test_components_compare_as_strings() {
        // String ordering: "9" > "10". Pinned on purpose.
        let aliases = aliases_for_names(&["1.9", "1.10"]);
        assert_eq!(aliases["1"], "1.9");

        let aliases = aliases_for_names(&["2.10.0", "2.9.1"]);
        assert_eq!(aliases["2"], "2.9.1");
        assert_eq!(aliases["2.10"], "2.10.0");
    }

    #[test]
    fn test_single_component_tags_produce_nothing() {
        assert!(aliases_for_names(&["latest", "stable"]).is_empty());
        assert!(aliases_for_names(&[]).is_empty());
    }

    #[test]
    fn test_suffix_stays_in_last_component() {
        let aliases = aliases_for_names(&["3.13.7-browser", "3.13.6-browser"]);
        assert_eq!(aliases["3"], "3.13.7-browser");
        assert_eq!(aliases["3.13"], "3.13.7-browser");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_every_target_is_a_matching_tag(
            names in prop::collection::vec(tag_name(), 1..8)
        ) {
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let aliases = aliases_for_names(&refs);

            for (alias, target) in &aliases {
                prop_assert!(names.contains(target));
                let prefix = format!("{alias}.");
                prop_assert!(target.starts_with(&prefix));
            }
        }
    }
}
