//! Test utilities for property-based testing
//!
//! This module provides generators shared by the proptest suites.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    /// Generate a dotted tag name such as `3.13.7`
    pub fn tag_name() -> impl Strategy<Value = String> {
        "[0-9]{1,2}(\\.[0-9]{1,2}){0,3}"
    }

    /// Generate an image name (lowercase alphanumeric with hyphens)
    pub fn image_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,15}[a-z0-9]"
    }

    /// Generate a Debian package name
    pub fn package_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9+.-]{1,20}"
    }

    /// Generate a content digest
    pub fn sha256_digest() -> impl Strategy<Value = String> {
        "[0-9a-f]{64}".prop_map(|hex| format!("sha256:{hex}"))
    }

    /// Generate a small version/variable map with overlapping keys
    pub fn string_map() -> impl Strategy<Value = BTreeMap<String, String>> {
        prop::collection::btree_map("[a-e]", "[0-9]{1,2}", 0..5)
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_tag_name_generator(name in tag_name()) {
            prop_assert!(name.split('.').count() <= 4);
            for part in name.split('.') {
                prop_assert!(part.parse::<u32>().is_ok());
            }
        }

        #[test]
        fn test_image_name_generator(name in image_name()) {
            prop_assert!(name.len() >= 2);
            prop_assert!(!name.ends_with('-'));
            prop_assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }

        #[test]
        fn test_package_name_generator(name in package_name()) {
            prop_assert!(name.chars().next().is_some_and(|c| c.is_ascii_lowercase()));
        }

        #[test]
        fn test_sha256_digest_generator(digest in sha256_digest()) {
            let hex = digest.strip_prefix("sha256:").unwrap_or_default();
            prop_assert_eq!(hex.len(), 64);
            prop_assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        }

        #[test]
        fn test_string_map_generator(map in string_map()) {
            prop_assert!(map.len() < 5 + 1);
        }
    }
}
