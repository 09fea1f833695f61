//! The validate → reason → validate pipeline.
//!
//! A request moves through `Built → PreValidated → Reasoned → PostValidated
//! → Done`. Failing pre-validation ends it in `Rejected` without running the
//! engine; failing post-validation ends it in `Flagged` with the result still
//! returned. Rule set, shapes and default ontology are shared read-only
//! between requests.

use std::collections::BTreeMap;
use std::sync::Arc;

use miette::Diagnostic;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::builder::{self, BuildError, SystemDescription};
use crate::config::ReasonerConfig;
use crate::error::ComplyResult;
use crate::graph::FactGraph;
use crate::rules::{DerivedFact, RuleEngine, RuleEngineConfig, RuleEngineError, RuleSet};
use crate::shapes::{ShapeValidator, ValidationOutcome, ValidatorCapability, Violation};
use crate::vocab::{self, DerivedPredicate};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Internal failures of a pipeline request. Rejection is not an error.
#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Build(#[from] BuildError),

    #[error("inference failed: {0}")]
    #[diagnostic(
        code(comply::pipeline::inference),
        help("The rule set did not reach a fixpoint on this input. No partial result is returned.")
    )]
    Inference(#[from] RuleEngineError),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Where a request ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Built,
    PreValidated,
    Reasoned,
    PostValidated,
    Done,
    Rejected,
    Flagged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Passed,
    Failed,
    Skipped,
}

/// One validation stage as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationRecord {
    pub status: ValidationStatus,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub outcome: ValidationOutcome,
}

impl ValidationRecord {
    fn new(outcome: ValidationOutcome, capability: ValidatorCapability) -> Self {
        let (status, message) = if outcome.skipped {
            let reason = if !capability.enabled {
                "shape validation disabled"
            } else {
                "shape validation unavailable"
            };
            (ValidationStatus::Skipped, Some(reason.to_string()))
        } else if outcome.conforms {
            (ValidationStatus::Passed, None)
        } else {
            (ValidationStatus::Failed, Some(outcome.summary()))
        };
        Self {
            status,
            enabled: capability.enabled,
            message,
            outcome,
        }
    }

    pub fn conforms(&self) -> bool {
        self.outcome.conforms
    }

    pub fn skipped(&self) -> bool {
        self.outcome.skipped
    }

    pub fn violations(&self) -> &[Violation] {
        &self.outcome.violations
    }
}

/// Provenance of one derived fact, compacted for display.
#[derive(Debug, Clone, Serialize)]
pub struct DerivationRecord {
    pub fact: String,
    pub rule: String,
    pub pass: usize,
    pub antecedents: Vec<String>,
}

impl From<&DerivedFact> for DerivationRecord {
    fn from(derived: &DerivedFact) -> Self {
        Self {
            fact: derived.fact.to_string(),
            rule: derived.rule_name.clone(),
            pass: derived.pass,
            antecedents: derived.antecedents.iter().map(ToString::to_string).collect(),
        }
    }
}

/// The result of one pipeline request.
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningRecord {
    /// The description passed pre-validation.
    pub valid: bool,
    pub reasoning_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// System entity, compacted.
    pub system: String,
    pub input_facts: usize,
    /// Every derived predicate, with objects compacted to local names.
    pub inferred_relationships: BTreeMap<DerivedPredicate, Vec<String>>,
    pub rules_applied: usize,
    pub passes: usize,
    pub pre_validation: ValidationRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_validation: Option<ValidationRecord>,
    pub state: PipelineState,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rule_stats: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub derivations: Vec<DerivationRecord>,
}

impl ReasoningRecord {
    /// Compacted objects of one derived predicate.
    pub fn relationships(&self, predicate: DerivedPredicate) -> &[String] {
        self.inferred_relationships
            .get(&predicate)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn empty_relationships() -> BTreeMap<DerivedPredicate, Vec<String>> {
    DerivedPredicate::ALL
        .into_iter()
        .map(|p| (p, Vec::new()))
        .collect()
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Orchestrates builder, validator and rule engine for each request.
#[derive(Debug, Clone)]
pub struct Pipeline {
    validator: ShapeValidator,
    engine: RuleEngine,
    ontology: Arc<FactGraph>,
    explain: bool,
}

impl Pipeline {
    pub fn new(validator: ShapeValidator, engine: RuleEngine, ontology: Arc<FactGraph>) -> Self {
        Self {
            validator,
            engine,
            ontology,
            explain: false,
        }
    }

    /// Load rules, shapes and the default ontology as configured. Rule and
    /// ontology failures are fatal; shape failures degrade to skip mode.
    pub fn from_config(config: &ReasonerConfig) -> ComplyResult<Self> {
        config.validate()?;
        let rules = match &config.reasoning.rules_path {
            Some(path) => RuleSet::from_file(path)?,
            None => RuleSet::bundled()?,
        };
        let ontology = match &config.reasoning.ontology_path {
            Some(path) => FactGraph::from_turtle_file(path)?,
            None => FactGraph::bundled_ontology()?,
        };
        let validator = ShapeValidator::load(
            config.validation.enabled,
            config.validation.shapes_path.as_deref(),
        );
        let engine = RuleEngine::new(
            Arc::new(rules),
            RuleEngineConfig {
                max_passes: config.reasoning.max_passes,
            },
        );

        tracing::info!(
            rules = engine.rules().rules.len(),
            enabled_rules = engine.rules().enabled_count(),
            max_passes = engine.max_passes(),
            ontology_facts = ontology.len(),
            validation_available = validator.capability().available,
            validation_enabled = validator.capability().enabled,
            "pipeline ready"
        );

        Ok(Self::new(validator, engine, Arc::new(ontology)))
    }

    /// Include derivation provenance and rule statistics in results.
    pub fn with_explanations(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    pub fn validator(&self) -> &ShapeValidator {
        &self.validator
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// The default base ontology.
    pub fn ontology(&self) -> &FactGraph {
        &self.ontology
    }

    /// Run the pipeline against the default ontology.
    pub fn run(&self, description: &SystemDescription) -> PipelineResult<ReasoningRecord> {
        self.run_pipeline(description, &self.ontology)
    }

    /// Build, pre-validate, reason over `ontology`, post-validate.
    pub fn run_pipeline(
        &self,
        description: &SystemDescription,
        ontology: &FactGraph,
    ) -> PipelineResult<ReasoningRecord> {
        let built = builder::build(description)?;
        let system = built.system;
        let input = built.graph;
        let mut state = PipelineState::Built;
        tracing::debug!(system = %system, facts = input.len(), ?state, "input graph built");

        let capability = self.validator.capability();
        let pre = ValidationRecord::new(self.validator.validate(&input, ontology), capability);
        if !pre.conforms() {
            state = PipelineState::Rejected;
            tracing::info!(
                system = %system,
                violations = pre.violations().len(),
                ?state,
                "description rejected by pre-validation"
            );
            return Ok(ReasoningRecord {
                valid: false,
                reasoning_completed: false,
                message: pre.message.clone(),
                system: vocab::compact(&system).to_string(),
                input_facts: input.len(),
                inferred_relationships: empty_relationships(),
                rules_applied: 0,
                passes: 0,
                pre_validation: pre,
                post_validation: None,
                state,
                rule_stats: BTreeMap::new(),
                derivations: Vec::new(),
            });
        }
        state = PipelineState::PreValidated;
        tracing::debug!(status = ?pre.status, ?state, "pre-validation finished");

        let inference = self.engine.infer(ontology, &input)?;
        state = PipelineState::Reasoned;
        tracing::info!(
            system = %system,
            derived = inference.derived.len(),
            rules_applied = inference.rules_applied,
            passes = inference.passes,
            ?state,
            "reasoning finished"
        );

        let post = ValidationRecord::new(
            self.validator.validate(&inference.graph, ontology),
            capability,
        );
        let message = if post.conforms() {
            state = PipelineState::PostValidated;
            None
        } else {
            state = PipelineState::Flagged;
            tracing::warn!(
                system = %system,
                violations = post.violations().len(),
                "derived graph flagged by post-validation"
            );
            Some(format!(
                "post-validation flagged derived facts: {}",
                post.outcome.summary()
            ))
        };
        tracing::debug!(status = ?post.status, ?state, "post-validation finished");
        if state == PipelineState::PostValidated {
            state = PipelineState::Done;
        }

        let inferred_relationships = inference
            .relationships_of(&system)
            .into_iter()
            .map(|(predicate, values)| {
                let values = values
                    .iter()
                    .map(|iri| vocab::compact(iri).to_string())
                    .collect();
                (predicate, values)
            })
            .collect();

        let (rule_stats, derivations) = if self.explain {
            (
                inference.rule_stats.clone(),
                inference.derived.iter().map(DerivationRecord::from).collect(),
            )
        } else {
            (BTreeMap::new(), Vec::new())
        };

        Ok(ReasoningRecord {
            valid: true,
            reasoning_completed: true,
            message,
            system: vocab::compact(&system).to_string(),
            input_facts: input.len(),
            inferred_relationships,
            rules_applied: inference.rules_applied,
            passes: inference.passes,
            pre_validation: pre,
            post_validation: Some(post),
            state,
            rule_stats,
            derivations,
        })
    }

    /// Build and pre-validate only, against the default ontology.
    pub fn run_pre_validation_only(
        &self,
        description: &SystemDescription,
    ) -> PipelineResult<ValidationRecord> {
        let built = builder::build(description)?;
        let outcome = self.validator.validate(&built.graph, &self.ontology);
        Ok(ValidationRecord::new(outcome, self.validator.capability()))
    }

    /// Run independent requests in parallel. Results keep input order.
    pub fn run_batch(
        &self,
        descriptions: &[SystemDescription],
    ) -> Vec<PipelineResult<ReasoningRecord>> {
        descriptions.par_iter().map(|d| self.run(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pipeline() -> Pipeline {
        Pipeline::from_config(&ReasonerConfig::default()).unwrap()
    }

    fn healthcare() -> SystemDescription {
        SystemDescription::new()
            .with("hasName", "Healthcare AI")
            .with("hasPurpose", json!(["HealthCare"]))
            .with("hasDeploymentContext", json!(["HighVolumeProcessing"]))
            .with("hasTrainingDataOrigin", json!(["PublicData"]))
    }

    #[test]
    fn successful_run_ends_done() {
        let record = pipeline().run(&healthcare()).unwrap();
        assert!(record.valid);
        assert!(record.reasoning_completed);
        assert_eq!(record.state, PipelineState::Done);
        assert_eq!(record.system, "system/healthcare-ai");
        assert_eq!(record.pre_validation.status, ValidationStatus::Passed);
        assert_eq!(
            record.post_validation.as_ref().map(|p| p.status),
            Some(ValidationStatus::Passed)
        );
        assert!(record.message.is_none());
    }

    #[test]
    fn every_derived_predicate_is_reported() {
        let record = pipeline().run(&healthcare()).unwrap();
        assert_eq!(record.inferred_relationships.len(), DerivedPredicate::ALL.len());
        let rejected = pipeline()
            .run(&SystemDescription::new().with("hasName", "Incomplete System"))
            .unwrap();
        assert_eq!(
            rejected.inferred_relationships.len(),
            DerivedPredicate::ALL.len()
        );
        assert!(rejected.inferred_relationships.values().all(Vec::is_empty));
    }

    #[test]
    fn rejection_carries_violation_summary() {
        let record = pipeline()
            .run(&SystemDescription::new().with("hasName", "Incomplete System"))
            .unwrap();
        assert_eq!(record.state, PipelineState::Rejected);
        assert!(!record.valid);
        assert!(record.post_validation.is_none());
        let message = record.message.unwrap();
        assert!(message.contains("purpose"), "{message}");
    }

    #[test]
    fn explanations_are_opt_in() {
        let plain = pipeline().run(&healthcare()).unwrap();
        assert!(plain.derivations.is_empty());
        assert!(plain.rule_stats.is_empty());

        let explained = pipeline()
            .with_explanations(true)
            .run(&healthcare())
            .unwrap();
        assert!(!explained.derivations.is_empty());
        assert!(explained
            .derivations
            .iter()
            .any(|d| d.rule == "technical-criterion"
                && d.fact.contains("ScalabilityRequirements")));
        assert!(explained.rule_stats.contains_key("technical-criterion"));
    }

    #[test]
    fn disabled_validation_reports_skipped() {
        let mut config = ReasonerConfig::default();
        config.validation.enabled = false;
        let pipeline = Pipeline::from_config(&config).unwrap();
        let record = pipeline
            .run(&SystemDescription::new().with("hasName", "Incomplete System"))
            .unwrap();
        assert!(record.valid);
        assert_eq!(record.pre_validation.status, ValidationStatus::Skipped);
        assert!(!record.pre_validation.enabled);
        assert_eq!(
            record.pre_validation.message.as_deref(),
            Some("shape validation disabled")
        );
        assert_eq!(record.rules_applied, 0);
    }

    #[test]
    fn record_serializes_with_predicate_names() {
        let record = pipeline().run(&healthcare()).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["state"], "done");
        assert_eq!(value["pre_validation"]["status"], "passed");
        assert_eq!(value["pre_validation"]["conforms"], true);
        assert!(value["inferred_relationships"]["hasTechnicalCriterion"]
            .as_array()
            .unwrap()
            .contains(&json!("ScalabilityRequirements")));
    }

    #[test]
    fn batch_keeps_input_order() {
        let descriptions = vec![
            healthcare(),
            SystemDescription::new().with("hasName", "Incomplete System"),
            healthcare().with("hasName", "Second"),
        ];
        let results = pipeline().run_batch(&descriptions);
        let states: Vec<PipelineState> = results
            .into_iter()
            .map(|r| r.unwrap().state)
            .collect();
        assert_eq!(
            states,
            vec![
                PipelineState::Done,
                PipelineState::Rejected,
                PipelineState::Done
            ]
        );
    }
}
