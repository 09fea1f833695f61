//! Ontology vocabulary: namespaces, prefix expansion, known predicates and the
//! fixed set of entity classes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespace of the compliance ontology.
pub const AI_NS: &str = "https://w3id.org/ai-compliance#";
/// RDF namespace.
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
/// RDFS namespace.
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";

/// Build an IRI in the ontology namespace.
pub fn ai(local: &str) -> String {
    format!("{AI_NS}{local}")
}

/// Strip the ontology namespace from an IRI, leaving other IRIs untouched.
pub fn compact(iri: &str) -> &str {
    iri.strip_prefix(AI_NS).unwrap_or(iri)
}

// ---------------------------------------------------------------------------
// Prefixes
// ---------------------------------------------------------------------------

/// Prefix table used to expand CURIEs (`ai:hasPurpose`) in rules and shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefixes {
    map: BTreeMap<String, String>,
}

impl Prefixes {
    /// The `ai`, `rdf` and `rdfs` prefixes.
    pub fn standard() -> Self {
        let mut map = BTreeMap::new();
        map.insert("ai".to_string(), AI_NS.to_string());
        map.insert("rdf".to_string(), RDF_NS.to_string());
        map.insert("rdfs".to_string(), RDFS_NS.to_string());
        Self { map }
    }

    /// Declare (or redeclare) a prefix.
    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.map.insert(prefix.into(), namespace.into());
    }

    /// Expand `prefix:local` into a full IRI. Returns `None` for unknown
    /// prefixes or tokens without a colon.
    pub fn expand(&self, curie: &str) -> Option<String> {
        let (prefix, local) = curie.split_once(':')?;
        self.map.get(prefix).map(|ns| format!("{ns}{local}"))
    }

    /// True for absolute IRIs that should not go through prefix expansion.
    pub fn is_absolute(token: &str) -> bool {
        token.starts_with("http://") || token.starts_with("https://") || token.starts_with("urn:")
    }
}

impl Default for Prefixes {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Predicates the fact graph builder recognizes in a system description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputPredicate {
    HasName,
    HasVersion,
    HasPurpose,
    HasDeploymentContext,
    HasTrainingDataOrigin,
}

impl InputPredicate {
    pub const ALL: [InputPredicate; 5] = [
        Self::HasName,
        Self::HasVersion,
        Self::HasPurpose,
        Self::HasDeploymentContext,
        Self::HasTrainingDataOrigin,
    ];

    /// Attribute name as it appears in a description.
    pub fn name(self) -> &'static str {
        match self {
            Self::HasName => "hasName",
            Self::HasVersion => "hasVersion",
            Self::HasPurpose => "hasPurpose",
            Self::HasDeploymentContext => "hasDeploymentContext",
            Self::HasTrainingDataOrigin => "hasTrainingDataOrigin",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn iri(self) -> String {
        ai(self.name())
    }

    /// Whether the attribute accepts a sequence of values.
    pub fn is_multi_valued(self) -> bool {
        matches!(
            self,
            Self::HasPurpose | Self::HasDeploymentContext | Self::HasTrainingDataOrigin
        )
    }

    /// Class of entity the predicate points at; `None` for literal ranges.
    pub fn range(self) -> Option<EntityClass> {
        match self {
            Self::HasName | Self::HasVersion => None,
            Self::HasPurpose => Some(EntityClass::Purpose),
            Self::HasDeploymentContext => Some(EntityClass::DeploymentContext),
            Self::HasTrainingDataOrigin => Some(EntityClass::TrainingDataOrigin),
        }
    }
}

/// Predicates produced by inference and reported in results, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DerivedPredicate {
    #[serde(rename = "hasNormativeCriterion")]
    HasNormativeCriterion,
    #[serde(rename = "hasTechnicalCriterion")]
    HasTechnicalCriterion,
    #[serde(rename = "hasContextualCriterion")]
    HasContextualCriterion,
    #[serde(rename = "hasRequirement")]
    HasRequirement,
    #[serde(rename = "hasTechnicalRequirement")]
    HasTechnicalRequirement,
}

impl DerivedPredicate {
    pub const ALL: [DerivedPredicate; 5] = [
        Self::HasNormativeCriterion,
        Self::HasTechnicalCriterion,
        Self::HasContextualCriterion,
        Self::HasRequirement,
        Self::HasTechnicalRequirement,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::HasNormativeCriterion => "hasNormativeCriterion",
            Self::HasTechnicalCriterion => "hasTechnicalCriterion",
            Self::HasContextualCriterion => "hasContextualCriterion",
            Self::HasRequirement => "hasRequirement",
            Self::HasTechnicalRequirement => "hasTechnicalRequirement",
        }
    }

    pub fn iri(self) -> String {
        ai(self.name())
    }

    pub fn from_iri(iri: &str) -> Option<Self> {
        let local = iri.strip_prefix(AI_NS)?;
        Self::ALL.into_iter().find(|p| p.name() == local)
    }

    pub fn range(self) -> EntityClass {
        match self {
            Self::HasNormativeCriterion => EntityClass::NormativeCriterion,
            Self::HasTechnicalCriterion => EntityClass::TechnicalCriterion,
            Self::HasContextualCriterion => EntityClass::ContextualCriterion,
            Self::HasRequirement => EntityClass::Requirement,
            Self::HasTechnicalRequirement => EntityClass::TechnicalRequirement,
        }
    }
}

impl fmt::Display for DerivedPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Entity classes
// ---------------------------------------------------------------------------

/// Type tag carried by every entity in a fact graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityClass {
    IntelligentSystem,
    Purpose,
    DeploymentContext,
    TrainingDataOrigin,
    NormativeCriterion,
    TechnicalCriterion,
    ContextualCriterion,
    Requirement,
    TechnicalRequirement,
    /// Ontology node without one of the classes above (classes, properties).
    Resource,
}

impl EntityClass {
    const TYPED: [EntityClass; 9] = [
        Self::IntelligentSystem,
        Self::Purpose,
        Self::DeploymentContext,
        Self::TrainingDataOrigin,
        Self::NormativeCriterion,
        Self::TechnicalCriterion,
        Self::ContextualCriterion,
        Self::Requirement,
        Self::TechnicalRequirement,
    ];

    /// Ontology class IRI, `None` for `Resource`.
    pub fn class_iri(self) -> Option<String> {
        match self {
            Self::Resource => None,
            other => Some(ai(&format!("{other:?}"))),
        }
    }

    /// Map an `rdf:type` object to a class tag.
    pub fn from_class_iri(iri: &str) -> Option<Self> {
        let local = iri.strip_prefix(AI_NS)?;
        Self::TYPED
            .into_iter()
            .find(|class| format!("{class:?}") == local)
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
