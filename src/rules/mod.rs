//! Rule-based forward-chaining inference over the ontology graph.
//!
//! Inference rules are data: antecedent pattern conjunctions with consequent
//! templates, loaded once and shared read-only between requests. The engine
//! is generic over whatever rule set it is handed.

pub mod error;
pub mod rule_engine;
pub mod rule_set;

pub use error::{RuleEngineError, RulesResult};
pub use rule_engine::{DerivedFact, Inference, RuleEngine, RuleEngineConfig};
pub use rule_set::{InferenceRule, RuleKind, RuleSet, RuleTerm, TriplePattern};
