//! Variant tag generation

use std::collections::BTreeMap;

use crate::core::config::VariantConfig;
use crate::core::merge::merge;
use crate::core::model::Tag;

/// Expands a variant over the base tags of an image
#[derive(Debug, Default, Clone, Copy)]
pub struct TagGenerator;

impl TagGenerator {
    /// Generate one variant tag per base tag.
    ///
    /// Names are `base.name + tag_suffix`. Versions and variables layer as
    /// image → base tag → variant. Rootfs settings come from the variant when
    /// set, otherwise from the already-resolved base tag.
    pub fn generate_variant_tags(
        base_tags: &[Tag],
        variant: &VariantConfig,
        image_versions: &BTreeMap<String, String>,
        image_variables: &BTreeMap<String, String>,
    ) -> Vec<Tag> {
        base_tags
            .iter()
            .map(|base| Tag {
                name: format!("{}{}", base.name, variant.tag_suffix),
                versions: merge(&merge(image_versions, &base.versions), &variant.versions),
                variables: merge(&merge(image_variables, &base.variables), &variant.variables),
                rootfs_user: variant
                    .rootfs_user
                    .clone()
                    .unwrap_or_else(|| base.rootfs_user.clone()),
                rootfs_copy: variant.rootfs_copy.unwrap_or(base.rootfs_copy),
            })
            .collect()
    }
}
