//! Read-only projection of the model for narrative consumers.
//!
//! Downstream commentary generators get a bounded view of the classes and an
//! import-derived dependency summary. Nothing they return feeds back into the
//! model.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::LanguageClass;
use crate::classify::Language;
use crate::graph::external_dependencies;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDigest {
    pub name: String,
    pub package: String,
    pub language: Language,
    pub method_count: usize,
    pub complexity_score: f64,
    pub is_used: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DependencySummary {
    /// Imports that resolve to no known class, sorted and unique.
    pub external_dependencies: Vec<String>,
    /// package -> class names in that package
    pub package_coupling: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArchitectureProjection {
    pub total_classes: usize,
    /// The first `limit` classes of the model.
    pub classes: Vec<ClassDigest>,
    pub dependencies: DependencySummary,
}

impl ArchitectureProjection {
    pub fn build(classes: &[LanguageClass], limit: usize) -> Self {
        let digests = classes
            .iter()
            .take(limit)
            .map(|c| ClassDigest {
                name: c.name.clone(),
                package: c.package.clone(),
                language: c.language,
                method_count: c.methods.len(),
                complexity_score: c.complexity_score,
                is_used: c.is_used,
            })
            .collect();

        let mut package_coupling: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for class in classes {
            let package = if class.package.is_empty() {
                "(default)".to_string()
            } else {
                class.package.clone()
            };
            package_coupling.entry(package).or_default().push(class.name.clone());
        }
        for names in package_coupling.values_mut() {
            names.sort();
            names.dedup();
        }

        Self {
            total_classes: classes.len(),
            classes: digests,
            dependencies: DependencySummary {
                external_dependencies: external_dependencies(classes),
                package_coupling,
            },
        }
    }
}
