//! Error types for rule loading and forward-chaining inference.

use miette::Diagnostic;
use thiserror::Error;

use crate::error::GraphError;

/// Errors from the rule subsystem.
#[derive(Debug, Error, Diagnostic)]
pub enum RuleEngineError {
    #[error("rule parse error in rule '{rule_name}': {message}")]
    #[diagnostic(
        code(comply::rules::parse),
        help(
            "Rules must use declared prefixes, '?' for variables and exactly three \
             terms per pattern. Every variable in `produce:` must appear in `match:`."
        )
    )]
    RuleParse { rule_name: String, message: String },

    #[error("failed to read rules file: {path}")]
    #[diagnostic(
        code(comply::rules::io),
        help("Ensure the rules file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "inference did not reach a fixpoint within {max_passes} passes ({derived} facts derived)"
    )]
    #[diagnostic(
        code(comply::rules::inference_inconsistency),
        help(
            "The rule set or ontology keeps producing new facts. Review rules for \
             unbounded chains, or raise reasoning.max_passes if the closure is legitimately deep."
        )
    )]
    InferenceInconsistency { max_passes: usize, derived: usize },

    #[error(transparent)]
    #[diagnostic(
        code(comply::rules::graph),
        help("A graph-level error occurred while committing derived facts.")
    )]
    Graph(Box<GraphError>),
}

impl From<GraphError> for RuleEngineError {
    fn from(e: GraphError) -> Self {
        Self::Graph(Box::new(e))
    }
}

impl RuleEngineError {
    pub(crate) fn parse(rule_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleParse {
            rule_name: rule_name.into(),
            message: message.into(),
        }
    }
}

/// Result type for rule operations.
pub type RulesResult<T> = std::result::Result<T, RuleEngineError>;
