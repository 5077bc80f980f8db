//! Template discovery
//!
//! Picks the build-file template for an image or variant by convention:
//! an explicit name wins, then `Dockerfile.<variant>.jinja2`, then
//! `Dockerfile.jinja2`.

use std::path::{Path, PathBuf};

use crate::config::defaults;
use crate::error::TemplateError;

/// Resolves template paths using convention and discovery
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateResolver;

impl TemplateResolver {
    /// Create a new resolver
    pub fn new() -> Self {
        Self
    }

    /// Resolve a template path.
    ///
    /// An explicit template that does not exist is an immediate error; it
    /// never falls through to the conventional names.
    pub fn resolve(
        &self,
        templates_dir: &Path,
        explicit: Option<&str>,
        variant_name: Option<&str>,
    ) -> Result<PathBuf, TemplateError> {
        if let Some(name) = explicit.filter(|n| !n.is_empty()) {
            let path = templates_dir.join(name);
            if path.exists() {
                return Ok(path);
            }
            return Err(TemplateError::ExplicitMissing {
                name: name.to_string(),
                dir: templates_dir.to_path_buf(),
            });
        }

        let mut searched = Vec::new();

        if let Some(variant) = variant_name.filter(|n| !n.is_empty()) {
            let file = defaults::variant_template(variant);
            let path = templates_dir.join(&file);
            if path.exists() {
                return Ok(path);
            }
            searched.push(file);
        }

        let default_path = templates_dir.join(defaults::DEFAULT_TEMPLATE);
        if default_path.exists() {
            return Ok(default_path);
        }
        searched.push(defaults::DEFAULT_TEMPLATE.to_string());

        Err(TemplateError::NotFound {
            dir: templates_dir.to_path_buf(),
            searched,
        })
    }
}
