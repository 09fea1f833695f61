//! Declarative structural constraints over fact graphs.
//!
//! Shapes target every instance of a class and constrain the values of its
//! properties by cardinality, class membership and node kind.

pub mod model;
pub mod validator;

use miette::Diagnostic;
use thiserror::Error;

pub use model::{NodeKind, NodeShape, PropertyShape, ShapeSet};
pub use validator::{
    ConstraintKind, ShapeValidator, ValidationOutcome, ValidatorCapability, Violation,
};

/// Errors from loading shape definitions.
#[derive(Debug, Error, Diagnostic)]
pub enum ShapeError {
    #[error("failed to parse shapes {source_name}: {message}")]
    #[diagnostic(
        code(comply::shapes::parse),
        help(
            "Shape files are TOML with [[shapes]] tables and [[shapes.properties]] entries. \
             Allowed constraint keys: path, min_count, max_count, class, node_kind, message."
        )
    )]
    Parse { source_name: String, message: String },

    #[error("failed to read shape file: {path}")]
    #[diagnostic(
        code(comply::shapes::io),
        help("Ensure the shape file exists and is readable, or unset shapes_path to use the bundled shapes.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ShapeResult<T> = std::result::Result<T, ShapeError>;
