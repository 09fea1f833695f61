//! Base ontology loading from Turtle via oxigraph's RDF parser.
//!
//! Only the default graph is kept. Every IRI subject and object becomes an
//! entity; entities with an `rdf:type` in the compliance namespace get the
//! matching [`EntityClass`], everything else is a `Resource`.

use std::path::Path;

use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::Term as RdfTerm;

use crate::error::GraphError;
use crate::vocab::{self, EntityClass};

use super::{Fact, FactGraph, GraphResult, Term};

/// The ontology bundled with the binary.
pub const BUNDLED_ONTOLOGY: &str = include_str!("../../data/ontology/core.ttl");

impl FactGraph {
    /// Load the bundled base ontology.
    pub fn bundled_ontology() -> GraphResult<Self> {
        Self::from_turtle(BUNDLED_ONTOLOGY, "bundled ontology")
    }

    /// Parse a Turtle document into a fact graph.
    pub fn from_turtle(text: &str, source_name: &str) -> GraphResult<Self> {
        let mut facts = Vec::new();
        for quad in RdfParser::from_format(RdfFormat::Turtle).for_reader(text.as_bytes()) {
            let quad = quad.map_err(|e| GraphError::Turtle {
                source_name: source_name.to_string(),
                message: e.to_string(),
            })?;
            let subject = node_to_string(&quad.subject.to_string());
            let object = match quad.object {
                RdfTerm::NamedNode(node) => Term::Iri(node.into_string()),
                RdfTerm::BlankNode(node) => Term::Iri(format!("_:{}", node.as_str())),
                RdfTerm::Literal(literal) => Term::Literal(literal.value().to_string()),
                #[allow(unreachable_patterns)]
                _ => continue,
            };
            facts.push(Fact::new(subject, quad.predicate.into_string(), object));
        }

        let mut graph = FactGraph::new();
        for fact in &facts {
            graph.add_entity(fact.subject.clone(), EntityClass::Resource);
            if let Term::Iri(object) = &fact.object {
                graph.add_entity(object.clone(), EntityClass::Resource);
            }
        }
        for fact in &facts {
            if fact.predicate == vocab::RDF_TYPE {
                if let Some(class) = fact.object.as_iri().and_then(EntityClass::from_class_iri) {
                    graph.add_entity(fact.subject.clone(), class);
                }
            }
        }
        for fact in facts {
            graph.insert(fact)?;
        }

        tracing::debug!(
            source = source_name,
            facts = graph.len(),
            "loaded ontology"
        );
        Ok(graph)
    }

    /// Read and parse a Turtle file.
    pub fn from_turtle_file(path: &Path) -> GraphResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_turtle(&text, &path.display().to_string())
    }
}

/// Render an N-Triples style subject (`<iri>` or `_:id`) as an entity key.
fn node_to_string(rendered: &str) -> String {
    rendered
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(rendered)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::ai;

    #[test]
    fn bundled_ontology_parses() {
        let g = FactGraph::bundled_ontology().unwrap();
        assert!(g.len() > 50);
        assert_eq!(
            g.entity_class(&ai("HighVolumeProcessing")),
            Some(EntityClass::DeploymentContext)
        );
        assert_eq!(
            g.entity_class(&ai("ScalabilityRequirements")),
            Some(EntityClass::TechnicalCriterion)
        );
        assert_eq!(g.entity_class(&ai("Purpose")), Some(EntityClass::Resource));
    }

    #[test]
    fn literals_and_prefixes() {
        let ttl = r#"
            @prefix ai: <https://w3id.org/ai-compliance#> .
            @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
            ai:Education a ai:Purpose ; rdfs:label "Education" .
        "#;
        let g = FactGraph::from_turtle(ttl, "inline").unwrap();
        assert_eq!(g.len(), 2);
        assert_eq!(g.entity_class(&ai("Education")), Some(EntityClass::Purpose));
        let label: Vec<_> = g
            .objects(&ai("Education"), &format!("{}label", vocab::RDFS_NS))
            .collect();
        assert_eq!(label, vec![&Term::literal("Education")]);
    }

    #[test]
    fn malformed_turtle_is_an_error() {
        let err = FactGraph::from_turtle("ai:X a ", "broken").unwrap_err();
        assert!(matches!(err, GraphError::Turtle { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = FactGraph::from_turtle_file(Path::new("/nonexistent/onto.ttl")).unwrap_err();
        assert!(matches!(err, GraphError::Io { .. }));
    }
}
