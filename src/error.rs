//! Rich diagnostic error types for the compliance reasoner.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. [`ComplyError`] wraps them all so the
//! binary can render any failure with its full diagnostic chain.

use miette::Diagnostic;
use thiserror::Error;

use crate::builder::BuildError;
use crate::pipeline::PipelineError;
use crate::rules::RuleEngineError;
use crate::shapes::ShapeError;

/// Top-level error type for the reasoner.
#[derive(Debug, Error, Diagnostic)]
pub enum ComplyError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Rules(#[from] RuleEngineError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("dangling reference to <{iri}> in {fact}")]
    #[diagnostic(
        code(comply::graph::dangling_reference),
        help(
            "Every entity referenced by a fact must be registered in the same graph. \
             Register the entity with `add_entity` before inserting the fact."
        )
    )]
    DanglingReference { iri: String, fact: String },

    #[error("failed to parse ontology {source_name}: {message}")]
    #[diagnostic(
        code(comply::graph::turtle),
        help("The ontology must be valid Turtle. Check prefixes and statement terminators.")
    )]
    Turtle { source_name: String, message: String },

    #[error("failed to read ontology file: {path}")]
    #[diagnostic(
        code(comply::graph::io),
        help("Ensure the ontology file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(comply::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(comply::config::parse),
        help("Check the TOML syntax. Every key is optional; see data/config/comply.toml.")
    )]
    Parse { path: String, message: String },

    #[error("invalid value for {variable}: \"{value}\"")]
    #[diagnostic(
        code(comply::config::env),
        help("Boolean environment overrides accept true, false, 1 or 0.")
    )]
    Env { variable: String, value: String },

    #[error("invalid config value for {key}: {message}")]
    #[diagnostic(
        code(comply::config::invalid_value),
        help("max_passes must be at least 1. Remove the key to derive it from the rule count.")
    )]
    InvalidValue { key: String, message: String },
}

pub type ComplyResult<T> = std::result::Result<T, ComplyError>;
