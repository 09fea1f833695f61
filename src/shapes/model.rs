//! Shape definitions parsed from TOML.
//!
//! ```toml
//! [prefixes]
//! ex = "https://example.org/"
//!
//! [[shapes]]
//! name = "IntelligentSystemShape"
//! target_class = "ai:IntelligentSystem"
//!
//! [[shapes.properties]]
//! path = "ai:hasPurpose"
//! min_count = 1
//! class = "ai:Purpose"
//! message = "optional human-readable explanation"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::vocab::Prefixes;

use super::{ShapeError, ShapeResult};

/// The shape file bundled with the binary.
pub const BUNDLED_SHAPES: &str = include_str!("../../data/shapes/system.toml");

/// Required kind of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Iri,
    Literal,
}

/// Constraints on the values of one property of a focus entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyShape {
    /// Expanded predicate IRI.
    pub path: String,
    pub min_count: Option<usize>,
    pub max_count: Option<usize>,
    /// Every value must be an instance of this class (expanded IRI).
    pub class: Option<String>,
    pub node_kind: Option<NodeKind>,
    pub message: Option<String>,
}

/// A set of property constraints applied to every instance of a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeShape {
    pub name: String,
    pub target_class: String,
    pub properties: Vec<PropertyShape>,
}

/// All shapes loaded from one source.
#[derive(Debug, Clone, Default)]
pub struct ShapeSet {
    pub shapes: Vec<NodeShape>,
    pub source: String,
}

#[derive(Debug, Deserialize)]
struct ShapeFile {
    #[serde(default)]
    prefixes: BTreeMap<String, String>,
    #[serde(default)]
    shapes: Vec<NodeShapeToml>,
}

#[derive(Debug, Deserialize)]
struct NodeShapeToml {
    name: String,
    target_class: String,
    #[serde(default)]
    properties: Vec<PropertyShapeToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PropertyShapeToml {
    path: String,
    min_count: Option<usize>,
    max_count: Option<usize>,
    class: Option<String>,
    node_kind: Option<NodeKind>,
    message: Option<String>,
}

impl ShapeSet {
    /// The bundled system shapes.
    pub fn bundled() -> ShapeResult<Self> {
        Self::from_toml(BUNDLED_SHAPES, "bundled")
    }

    /// Read and parse a shape file.
    pub fn from_file(path: &Path) -> ShapeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ShapeError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text, &path.display().to_string())
    }

    /// Parse shapes from TOML, expanding CURIEs.
    pub fn from_toml(text: &str, source: &str) -> ShapeResult<Self> {
        let parse_err = |message: String| ShapeError::Parse {
            source_name: source.to_string(),
            message,
        };

        let file: ShapeFile = toml::from_str(text).map_err(|e| parse_err(e.to_string()))?;

        let mut prefixes = Prefixes::standard();
        for (prefix, ns) in file.prefixes {
            prefixes.insert(prefix, ns);
        }
        let expand = |term: &str| -> ShapeResult<String> {
            if Prefixes::is_absolute(term) {
                return Ok(term.to_string());
            }
            prefixes
                .expand(term)
                .ok_or_else(|| parse_err(format!("unknown prefix in '{term}'")))
        };

        let mut shapes = Vec::with_capacity(file.shapes.len());
        for shape in file.shapes {
            let mut properties = Vec::with_capacity(shape.properties.len());
            for prop in shape.properties {
                if let (Some(min), Some(max)) = (prop.min_count, prop.max_count) {
                    if min > max {
                        return Err(parse_err(format!(
                            "shape {}: min_count {min} exceeds max_count {max} on {}",
                            shape.name, prop.path
                        )));
                    }
                }
                properties.push(PropertyShape {
                    path: expand(&prop.path)?,
                    min_count: prop.min_count,
                    max_count: prop.max_count,
                    class: prop.class.as_deref().map(expand).transpose()?,
                    node_kind: prop.node_kind,
                    message: prop.message,
                });
            }
            shapes.push(NodeShape {
                target_class: expand(&shape.target_class)?,
                name: shape.name,
                properties,
            });
        }

        Ok(Self {
            shapes,
            source: source.to_string(),
        })
    }

    /// Total number of property constraints.
    pub fn property_count(&self) -> usize {
        self.shapes.iter().map(|s| s.properties.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::ai;

    #[test]
    fn bundled_shapes_parse() {
        let set = ShapeSet::bundled().unwrap();
        assert_eq!(set.shapes.len(), 2);
        let system = &set.shapes[0];
        assert_eq!(system.target_class, ai("IntelligentSystem"));
        let purpose = system
            .properties
            .iter()
            .find(|p| p.path == ai("hasPurpose"))
            .unwrap();
        assert_eq!(purpose.min_count, Some(1));
        assert_eq!(purpose.class.as_deref(), Some(ai("Purpose").as_str()));
    }

    #[test]
    fn custom_prefixes_expand() {
        let toml = r#"
            [prefixes]
            ex = "https://example.org/"

            [[shapes]]
            name = "S"
            target_class = "ex:Thing"

            [[shapes.properties]]
            path = "ex:label"
            node_kind = "literal"
        "#;
        let set = ShapeSet::from_toml(toml, "inline").unwrap();
        assert_eq!(set.shapes[0].target_class, "https://example.org/Thing");
        assert_eq!(set.shapes[0].properties[0].node_kind, Some(NodeKind::Literal));
    }

    #[test]
    fn unknown_prefix_is_a_parse_error() {
        let toml = "[[shapes]]\nname = \"S\"\ntarget_class = \"owl:Thing\"\n";
        assert!(matches!(
            ShapeSet::from_toml(toml, "inline").unwrap_err(),
            ShapeError::Parse { .. }
        ));
    }

    #[test]
    fn inverted_cardinality_is_rejected() {
        let toml = r#"
            [[shapes]]
            name = "S"
            target_class = "ai:IntelligentSystem"
            [[shapes.properties]]
            path = "ai:hasPurpose"
            min_count = 2
            max_count = 1
        "#;
        assert!(ShapeSet::from_toml(toml, "inline").is_err());
    }

    #[test]
    fn unknown_constraint_key_is_rejected() {
        let toml = r#"
            [[shapes]]
            name = "S"
            target_class = "ai:IntelligentSystem"
            [[shapes.properties]]
            path = "ai:hasPurpose"
            pattern = "^x"
        "#;
        assert!(ShapeSet::from_toml(toml, "inline").is_err());
    }
}
