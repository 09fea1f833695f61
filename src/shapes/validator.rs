//! Shape validation with graceful degradation.
//!
//! A [`ShapeValidator`] carries an explicit [`ValidatorCapability`]. When the
//! capability is not both available and enabled, every call returns a
//! skipped, conforming outcome without touching the graph. When active, every
//! shape is evaluated and every violation is reported.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::graph::{FactGraph, Term};
use crate::vocab;

use super::model::{NodeKind, NodeShape, PropertyShape, ShapeSet};

// ── Capability ──────────────────────────────────────────────────────────

/// Whether constraint checking can run (`available`) and may run (`enabled`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidatorCapability {
    pub available: bool,
    pub enabled: bool,
}

impl ValidatorCapability {
    pub fn is_active(self) -> bool {
        self.available && self.enabled
    }
}

// ── Outcome types ───────────────────────────────────────────────────────

/// Which constraint a violation broke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintKind {
    MinCount { min: usize, actual: usize },
    MaxCount { max: usize, actual: usize },
    Class { expected: String, value: String },
    NodeKind { expected: NodeKind, value: String },
}

/// A single failed constraint on a focus entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub focus: String,
    pub shape: String,
    pub path: String,
    pub constraint: ConstraintKind,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} {}]: {}",
            vocab::compact(&self.focus),
            self.shape,
            vocab::compact(&self.path),
            self.message
        )
    }
}

/// Result of one validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub conforms: bool,
    pub violations: Vec<Violation>,
    pub skipped: bool,
}

impl ValidationOutcome {
    /// The synthetic outcome returned when the validator does not run.
    pub fn skipped() -> Self {
        Self {
            conforms: true,
            violations: Vec::new(),
            skipped: true,
        }
    }

    fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            conforms: violations.is_empty(),
            violations,
            skipped: false,
        }
    }

    /// One line per violation, for result messages.
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(Violation::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ── Validator ───────────────────────────────────────────────────────────

/// Evaluates a shared, immutable shape set against fact graphs.
#[derive(Debug, Clone)]
pub struct ShapeValidator {
    capability: ValidatorCapability,
    shapes: Arc<ShapeSet>,
}

impl ShapeValidator {
    /// An available validator over the given shapes.
    pub fn new(shapes: Arc<ShapeSet>, enabled: bool) -> Self {
        Self {
            capability: ValidatorCapability {
                available: true,
                enabled,
            },
            shapes,
        }
    }

    /// A validator whose constraint checking could not be loaded.
    pub fn unavailable(enabled: bool) -> Self {
        Self {
            capability: ValidatorCapability {
                available: false,
                enabled,
            },
            shapes: Arc::new(ShapeSet::default()),
        }
    }

    /// Load shapes from `path`, or the bundled shapes when `path` is `None`.
    /// A missing or unparseable shape file yields an unavailable validator.
    pub fn load(enabled: bool, path: Option<&Path>) -> Self {
        let loaded = match path {
            Some(path) => ShapeSet::from_file(path),
            None => ShapeSet::bundled(),
        };
        match loaded {
            Ok(shapes) => {
                tracing::info!(
                    source = %shapes.source,
                    shapes = shapes.shapes.len(),
                    constraints = shapes.property_count(),
                    enabled,
                    "shape validator loaded"
                );
                Self::new(Arc::new(shapes), enabled)
            }
            Err(e) => {
                tracing::warn!(error = %e, "shape validation unavailable, continuing in skip mode");
                Self::unavailable(enabled)
            }
        }
    }

    pub fn capability(&self) -> ValidatorCapability {
        self.capability
    }

    pub fn shapes(&self) -> &ShapeSet {
        &self.shapes
    }

    /// Check `data` against every shape. Class membership is resolved over
    /// `data ∪ ontology`.
    pub fn validate(&self, data: &FactGraph, ontology: &FactGraph) -> ValidationOutcome {
        if !self.capability.is_active() {
            tracing::info!(
                available = self.capability.available,
                enabled = self.capability.enabled,
                "shape validation skipped"
            );
            return ValidationOutcome::skipped();
        }

        let mut violations = Vec::new();
        for shape in &self.shapes.shapes {
            for focus in data.instances_of(&shape.target_class) {
                for property in &shape.properties {
                    check_property(shape, property, focus, data, ontology, &mut violations);
                }
            }
        }

        tracing::debug!(violations = violations.len(), "shape validation finished");
        ValidationOutcome::from_violations(violations)
    }
}

fn check_property(
    shape: &NodeShape,
    property: &PropertyShape,
    focus: &str,
    data: &FactGraph,
    ontology: &FactGraph,
    violations: &mut Vec<Violation>,
) {
    let values: Vec<&Term> = data.objects(focus, &property.path).collect();
    let path = vocab::compact(&property.path);
    let violation = |constraint: ConstraintKind, default_message: String| Violation {
        focus: focus.to_string(),
        shape: shape.name.clone(),
        path: property.path.clone(),
        constraint,
        message: property.message.clone().unwrap_or(default_message),
    };

    if let Some(min) = property.min_count {
        if values.len() < min {
            violations.push(violation(
                ConstraintKind::MinCount {
                    min,
                    actual: values.len(),
                },
                format!("expected at least {min} {path} value(s), found {}", values.len()),
            ));
        }
    }
    if let Some(max) = property.max_count {
        if values.len() > max {
            violations.push(violation(
                ConstraintKind::MaxCount {
                    max,
                    actual: values.len(),
                },
                format!("expected at most {max} {path} value(s), found {}", values.len()),
            ));
        }
    }

    for value in values {
        if let Some(kind) = property.node_kind {
            let ok = match kind {
                NodeKind::Iri => !value.is_literal(),
                NodeKind::Literal => value.is_literal(),
            };
            if !ok {
                violations.push(violation(
                    ConstraintKind::NodeKind {
                        expected: kind,
                        value: value.to_string(),
                    },
                    format!("{path} value {value} is not {}", node_kind_name(kind)),
                ));
            }
        }
        if let Some(class) = &property.class {
            let member = value
                .as_iri()
                .is_some_and(|iri| is_instance_of(iri, class, data, ontology));
            if !member {
                violations.push(violation(
                    ConstraintKind::Class {
                        expected: class.clone(),
                        value: value.to_string(),
                    },
                    format!(
                        "{path} value {value} is not an instance of {}",
                        vocab::compact(class)
                    ),
                ));
            }
        }
    }
}

fn node_kind_name(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Iri => "an IRI",
        NodeKind::Literal => "a literal",
    }
}

/// `rdf:type/rdfs:subClassOf*` membership over both graphs.
fn is_instance_of(iri: &str, class: &str, data: &FactGraph, ontology: &FactGraph) -> bool {
    let mut queue: VecDeque<&str> = data.types_of(iri).chain(ontology.types_of(iri)).collect();
    let mut visited: HashSet<&str> = HashSet::new();
    while let Some(current) = queue.pop_front() {
        if current == class {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        queue.extend(data.superclasses_of(current));
        queue.extend(ontology.superclasses_of(current));
    }
    false
}
