//! Fact graph: an insertion-ordered set of triples plus the entity table.
//!
//! Every IRI in subject or object position must name an entity registered in
//! the same graph. Facts are immutable once inserted and the graph only ever
//! grows, which is what lets the rule engine treat a graph as a monotone
//! accumulator.

pub mod turtle;

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::vocab::{self, EntityClass};

pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Object of a fact: an entity reference or a literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Term {
    Iri(String),
    Literal(String),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Iri(iri.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(iri) => Some(iri),
            Self::Literal(_) => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => f.write_str(vocab::compact(iri)),
            Self::Literal(value) => write!(f, "\"{value}\""),
        }
    }
}

/// A directed labeled edge (subject, predicate, object).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fact {
    pub subject: String,
    pub predicate: String,
    pub object: Term,
}

impl Fact {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} {} {})",
            vocab::compact(&self.subject),
            vocab::compact(&self.predicate),
            self.object
        )
    }
}

/// Insertion-ordered fact set with a predicate index and entity table.
#[derive(Debug, Clone, Default)]
pub struct FactGraph {
    facts: Vec<Fact>,
    seen: HashSet<Fact>,
    by_predicate: HashMap<String, Vec<usize>>,
    entities: HashMap<String, EntityClass>,
}

impl FactGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity. A `Resource` entry is upgraded when a more
    /// specific class is supplied later; a specific class is never replaced.
    pub fn add_entity(&mut self, iri: impl Into<String>, class: EntityClass) {
        let iri = iri.into();
        match self.entities.get_mut(&iri) {
            Some(existing) => {
                if *existing == EntityClass::Resource {
                    *existing = class;
                }
            }
            None => {
                self.entities.insert(iri, class);
            }
        }
    }

    pub fn has_entity(&self, iri: &str) -> bool {
        self.entities.contains_key(iri)
    }

    pub fn entity_class(&self, iri: &str) -> Option<EntityClass> {
        self.entities.get(iri).copied()
    }

    /// Insert a fact. Returns `Ok(false)` if the fact was already present.
    pub fn insert(&mut self, fact: Fact) -> GraphResult<bool> {
        if !self.has_entity(&fact.subject) {
            return Err(GraphError::DanglingReference {
                iri: fact.subject.clone(),
                fact: fact.to_string(),
            });
        }
        if let Term::Iri(object) = &fact.object {
            if !self.has_entity(object) {
                return Err(GraphError::DanglingReference {
                    iri: object.clone(),
                    fact: fact.to_string(),
                });
            }
        }
        if self.seen.contains(&fact) {
            return Ok(false);
        }
        let index = self.facts.len();
        self.by_predicate
            .entry(fact.predicate.clone())
            .or_default()
            .push(index);
        self.seen.insert(fact.clone());
        self.facts.push(fact);
        Ok(true)
    }

    pub fn contains(&self, fact: &Fact) -> bool {
        self.seen.contains(fact)
    }

    /// All facts in insertion order.
    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Facts with the given predicate, in insertion order.
    pub fn with_predicate<'a>(
        &'a self,
        predicate: &str,
    ) -> impl Iterator<Item = &'a Fact> + use<'a> {
        self.by_predicate
            .get(predicate)
            .into_iter()
            .flatten()
            .map(|&i| &self.facts[i])
    }

    /// Objects of `(subject, predicate, ?)`.
    pub fn objects<'a, 's>(
        &'a self,
        subject: &'s str,
        predicate: &str,
    ) -> impl Iterator<Item = &'a Term> + use<'a, 's> {
        self.with_predicate(predicate)
            .filter(move |f| f.subject == subject)
            .map(|f| &f.object)
    }

    /// Subjects carrying `rdf:type class_iri`, in first-seen order.
    pub fn instances_of(&self, class_iri: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.with_predicate(vocab::RDF_TYPE)
            .filter(|f| f.object.as_iri() == Some(class_iri))
            .map(|f| f.subject.as_str())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Direct `rdf:type` classes of an entity.
    pub fn types_of<'a, 's>(&'a self, iri: &'s str) -> impl Iterator<Item = &'a str> + use<'a, 's> {
        self.objects(iri, vocab::RDF_TYPE).filter_map(Term::as_iri)
    }

    /// Direct `rdfs:subClassOf` parents of a class.
    pub fn superclasses_of<'a, 's>(
        &'a self,
        iri: &'s str,
    ) -> impl Iterator<Item = &'a str> + use<'a, 's> {
        self.objects(iri, vocab::RDFS_SUBCLASS_OF)
            .filter_map(Term::as_iri)
    }
}
