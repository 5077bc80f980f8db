//! Image dependency graph
//!
//! Extracts build-order dependencies from template text and `extends`
//! fields, then computes a build order in which every managed dependency is
//! built before its dependents.
//!
//! Dependency names that are not managed images (registry bases) stay as
//! edges but are not nodes; they never block a node and never form cycles.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::OnceLock;

use crate::core::model::Image;
use crate::error::GraphError;

/// `{{ "name" | resolve_base_image }}`, either quote style, any spacing
fn base_image_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\{\{\s*["']([^"']+)["']\s*\|\s*resolve_base_image\s*\}\}"#)
            .expect("base image reference pattern is valid")
    })
}

/// Extract base image references from template text.
///
/// Only scans; nothing is rendered.
pub fn extract_base_image_refs(template: &str) -> BTreeSet<String> {
    base_image_ref_pattern()
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

fn refs_in_file(path: &Path) -> Result<BTreeSet<String>, GraphError> {
    if !path.exists() {
        return Ok(BTreeSet::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| GraphError::TemplateRead {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    Ok(extract_base_image_refs(&content))
}

/// Map every image name to the names it depends on.
///
/// Unions the references of the primary template, every variant template
/// and the `extends` field. Images sharing a name share one entry.
pub fn extract_dependencies<'a, I>(images: I) -> Result<BTreeMap<String, BTreeSet<String>>, GraphError>
where
    I: IntoIterator<Item = &'a Image>,
{
    let mut dependencies: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for image in images {
        let mut deps = refs_in_file(&image.template_path)?;
        for variant in &image.variants {
            deps.extend(refs_in_file(&variant.template_path)?);
        }
        if let Some(extends) = &image.extends {
            deps.insert(extends.clone());
        }

        dependencies
            .entry(image.name.clone())
            .or_default()
            .extend(deps);
    }

    Ok(dependencies)
}

/// Dependency graph for images
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Adjacency list: image -> dependencies
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a dependency map
    pub fn from_dependencies(dependencies: BTreeMap<String, BTreeSet<String>>) -> Self {
        Self {
            edges: dependencies,
        }
    }

    /// Add an image to the graph, merging with any existing entry
    pub fn add_image(&mut self, name: &str, dependencies: impl IntoIterator<Item = String>) {
        self.edges
            .entry(name.to_string())
            .or_default()
            .extend(dependencies);
    }

    /// Managed nodes
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// Dependencies of one node, managed or not
    pub fn dependencies_of(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(name)
    }

    /// Compute a build order.
    ///
    /// Each round emits every node whose managed dependencies are already
    /// emitted, in name order. If a round emits nothing while nodes remain,
    /// the remainder contains a cycle and nothing is returned.
    pub fn topological_sort(&self) -> Result<Vec<String>, GraphError> {
        let mut pending: BTreeMap<&str, BTreeSet<&str>> = self
            .edges
            .iter()
            .map(|(name, deps)| {
                let managed = deps
                    .iter()
                    .map(String::as_str)
                    .filter(|dep| self.edges.contains_key(*dep))
                    .collect();
                (name.as_str(), managed)
            })
            .collect();

        let mut order = Vec::with_capacity(pending.len());

        while !pending.is_empty() {
            let ready: Vec<&str> = pending
                .iter()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(name, _)| *name)
                .collect();

            if ready.is_empty() {
                return Err(GraphError::CyclicDependency {
                    remaining: pending.keys().map(|n| (*n).to_string()).collect(),
                });
            }

            for name in &ready {
                pending.remove(name);
            }
            for deps in pending.values_mut() {
                for name in &ready {
                    deps.remove(name);
                }
            }
            order.extend(ready.into_iter().map(str::to_string));
        }

        Ok(order)
    }

    /// Check if the graph has any cycles
    pub fn has_cycle(&self) -> bool {
        self.topological_sort().is_err()
    }
}

/// Sort a dependency map into build order
pub fn topological_sort(
    dependencies: &BTreeMap<String, BTreeSet<String>>,
) -> Result<Vec<String>, GraphError> {
    DependencyGraph::from_dependencies(dependencies.clone()).topological_sort()
}

/// Sort images into build order.
///
/// Every image sharing a name is kept; each name group keeps its input
/// order. Fails on cycles before anything is returned.
pub fn sort_images(images: &[Image]) -> Result<Vec<&Image>, GraphError> {
    let dependencies = extract_dependencies(images)?;
    order_images(images, &dependencies)
}

/// Sort images into build order using an already extracted dependency map
pub fn order_images<'a>(
    images: &'a [Image],
    dependencies: &BTreeMap<String, BTreeSet<String>>,
) -> Result<Vec<&'a Image>, GraphError> {
    let order = topological_sort(dependencies)?;

    let mut by_name: BTreeMap<&str, Vec<&Image>> = BTreeMap::new();
    for image in images {
        by_name.entry(image.name.as_str()).or_default().push(image);
    }

    let mut sorted = Vec::with_capacity(images.len());
    for name in &order {
        if let Some(group) = by_name.remove(name.as_str()) {
            sorted.extend(group);
        }
    }

    tracing::debug!("Build order: {}", order.join(" -> "));
    Ok(sorted)
}
