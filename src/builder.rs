//! Fact graph builder: system description → typed fact graph.
//!
//! The builder is a pure function of its input. It synthesizes one
//! `IntelligentSystem` entity, emits one fact per recognized attribute value
//! and ignores attributes it does not know. Absent attributes are never
//! defaulted, so pre-validation sees exactly what the caller supplied.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use miette::Diagnostic;
use oxigraph::model::NamedNode;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::GraphError;
use crate::graph::{Fact, FactGraph, Term};
use crate::vocab::{self, EntityClass, InputPredicate, Prefixes};

// ── Errors ──────────────────────────────────────────────────────────────

#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("malformed value for \"{attribute}\": {message}")]
    #[diagnostic(
        code(comply::builder::malformed_input),
        help(
            "hasName and hasVersion take a single string or number. hasPurpose, \
             hasDeploymentContext and hasTrainingDataOrigin take a string or a list of \
             identifiers such as \"HealthCare\", \"ai:HealthCare\" or a full IRI."
        )
    )]
    MalformedInput { attribute: String, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;

static LOCAL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").unwrap());

// ── Description ─────────────────────────────────────────────────────────

/// A structured AI system description: attribute name → literal or sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemDescription {
    attributes: BTreeMap<String, Value>,
}

impl SystemDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, returning `self` for chaining.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }
}

impl From<BTreeMap<String, Value>> for SystemDescription {
    fn from(attributes: BTreeMap<String, Value>) -> Self {
        Self { attributes }
    }
}

// ── Builder ─────────────────────────────────────────────────────────────

/// Output of [`build`]: the graph and the IRI of its system entity.
#[derive(Debug, Clone)]
pub struct BuiltGraph {
    pub system: String,
    pub graph: FactGraph,
}

/// Convert a description into a fact graph rooted at a synthesized system.
pub fn build(description: &SystemDescription) -> BuildResult<BuiltGraph> {
    for name in description.attribute_names() {
        if InputPredicate::from_name(name).is_none() {
            tracing::debug!(attribute = name, "ignoring unrecognized attribute");
        }
    }

    let name = match description.get(InputPredicate::HasName.name()) {
        Some(value) => Some(coerce_literal(InputPredicate::HasName, value)?),
        None => None,
    };
    let system = system_iri(name.as_deref());

    let mut graph = FactGraph::new();
    graph.add_entity(system.clone(), EntityClass::IntelligentSystem);
    let system_class = vocab::ai("IntelligentSystem");
    graph.add_entity(system_class.clone(), EntityClass::Resource);
    graph.insert(Fact::new(
        system.clone(),
        vocab::RDF_TYPE,
        Term::Iri(system_class),
    ))?;

    for predicate in InputPredicate::ALL {
        let Some(value) = description.get(predicate.name()) else {
            continue;
        };
        match predicate.range() {
            None => {
                let literal = coerce_literal(predicate, value)?;
                graph.insert(Fact::new(
                    system.clone(),
                    predicate.iri(),
                    Term::Literal(literal),
                ))?;
            }
            Some(class) => {
                for identifier in coerce_identifiers(predicate, value)? {
                    graph.add_entity(identifier.clone(), class);
                    graph.insert(Fact::new(
                        system.clone(),
                        predicate.iri(),
                        Term::Iri(identifier),
                    ))?;
                }
            }
        }
    }

    Ok(BuiltGraph { system, graph })
}

/// Deterministic system IRI derived from its name.
pub fn system_iri(name: Option<&str>) -> String {
    let slug = name.map(slugify).filter(|s| !s.is_empty());
    vocab::ai(&format!("system/{}", slug.as_deref().unwrap_or("unnamed")))
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

fn malformed(predicate: InputPredicate, message: impl Into<String>) -> BuildError {
    BuildError::MalformedInput {
        attribute: predicate.name().to_string(),
        message: message.into(),
    }
}

/// Literal-range attributes: strings pass, numbers and booleans stringify.
fn coerce_literal(predicate: InputPredicate, value: &Value) -> BuildResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err(malformed(predicate, "null is not a value")),
        Value::Array(_) => Err(malformed(predicate, "expected a single value, got a list")),
        Value::Object(_) => Err(malformed(predicate, "expected a single value, got a map")),
    }
}

/// Entity-range attributes: one identifier or a list, resolved to IRIs in
/// caller order with repeats dropped.
fn coerce_identifiers(predicate: InputPredicate, value: &Value) -> BuildResult<Vec<String>> {
    let items: Vec<&Value> = match value {
        Value::Array(items) if predicate.is_multi_valued() => items.iter().collect(),
        Value::Array(_) => {
            return Err(malformed(predicate, "expected a single identifier, got a list"));
        }
        single => vec![single],
    };

    let mut resolved: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let Value::String(raw) = item else {
            return Err(malformed(
                predicate,
                format!("expected an identifier string, got {item}"),
            ));
        };
        let iri = resolve_identifier(raw.trim())
            .ok_or_else(|| malformed(predicate, format!("\"{raw}\" is not a valid identifier")))?;
        if !resolved.contains(&iri) {
            resolved.push(iri);
        }
    }
    Ok(resolved)
}

fn resolve_identifier(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    if Prefixes::is_absolute(raw) {
        return NamedNode::new(raw).ok().map(NamedNode::into_string);
    }
    if LOCAL_NAME.is_match(raw) {
        return Some(vocab::ai(raw));
    }
    Prefixes::standard()
        .expand(raw)
        .filter(|iri| LOCAL_NAME.is_match(iri.rsplit(['#', '/']).next().unwrap_or("")))
}
