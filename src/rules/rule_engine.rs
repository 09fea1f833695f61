//! Forward-chaining rule engine with pattern matching.
//!
//! Runs inference rules over the union of a read-only base ontology and a
//! working copy of the input graph until a pass derives nothing new. Facts
//! derived during a pass become visible to matching from the next pass on.
//! A pass budget bounds the run; exhausting it is an inconsistency in the
//! rule set or ontology, never a silent truncation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::graph::{Fact, FactGraph, Term};
use crate::vocab::{DerivedPredicate, EntityClass};

use super::error::{RuleEngineError, RulesResult};
use super::rule_set::{InferenceRule, RuleSet, RuleTerm, TriplePattern};

type Bindings = HashMap<String, Term>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the forward-chaining rule engine.
#[derive(Debug, Clone, Default)]
pub struct RuleEngineConfig {
    /// Maximum passes before the run is declared inconsistent. `None` derives
    /// the bound from the rule count.
    pub max_passes: Option<usize>,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// A single derived fact with provenance.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedFact {
    pub fact: Fact,
    pub rule_name: String,
    pub antecedents: Vec<Fact>,
    pub pass: usize,
}

/// Result of running the rule engine.
#[derive(Debug, Clone)]
pub struct Inference {
    /// Input facts plus every derived fact.
    pub graph: FactGraph,
    /// Derived facts in derivation order.
    pub derived: Vec<DerivedFact>,
    /// Firings (rule × binding) that produced at least one new fact.
    pub rules_applied: usize,
    /// Passes run, including the final pass that derived nothing.
    pub passes: usize,
    /// Per-rule firing counts.
    pub rule_stats: BTreeMap<String, usize>,
}

impl Inference {
    /// Objects of derived facts about `subject`, grouped by derived predicate.
    /// Every derived predicate has an entry; values keep first-derived order.
    pub fn relationships_of(&self, subject: &str) -> BTreeMap<DerivedPredicate, Vec<String>> {
        let mut grouped: BTreeMap<DerivedPredicate, Vec<String>> = DerivedPredicate::ALL
            .into_iter()
            .map(|p| (p, Vec::new()))
            .collect();
        for derived in &self.derived {
            let fact = &derived.fact;
            if fact.subject != subject {
                continue;
            }
            let (Some(predicate), Some(object)) =
                (DerivedPredicate::from_iri(&fact.predicate), fact.object.as_iri())
            else {
                continue;
            };
            let values = grouped.entry(predicate).or_default();
            if !values.iter().any(|v| v == object) {
                values.push(object.to_string());
            }
        }
        grouped
    }

    /// The derived facts only, as a set-comparable slice.
    pub fn derived_facts(&self) -> impl Iterator<Item = &Fact> {
        self.derived.iter().map(|d| &d.fact)
    }
}

// ---------------------------------------------------------------------------
// Rule engine
// ---------------------------------------------------------------------------

/// Forward-chaining rule engine over an immutable, shared rule set.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    config: RuleEngineConfig,
    rules: Arc<RuleSet>,
}

impl RuleEngine {
    pub fn new(rules: Arc<RuleSet>, config: RuleEngineConfig) -> Self {
        Self { config, rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Pass budget: the configured value, or `max(8, 4 × enabled rules)`.
    pub fn max_passes(&self) -> usize {
        self.config
            .max_passes
            .unwrap_or_else(|| (self.rules.enabled_count() * 4).max(8))
    }

    /// Compute the fixpoint closure of the rules over `ontology ∪ input`.
    ///
    /// Neither argument is modified; the returned graph is a copy of `input`
    /// extended with the derived facts.
    pub fn infer(&self, ontology: &FactGraph, input: &FactGraph) -> RulesResult<Inference> {
        let mut working = input.clone();
        let mut derived: Vec<DerivedFact> = Vec::new();
        let mut rule_stats: BTreeMap<String, usize> = BTreeMap::new();
        let mut rules_applied = 0;

        let all_rules: Vec<&InferenceRule> = self.rules.enabled().collect();
        let max_passes = self.max_passes();

        for pass in 1..=max_passes {
            let mut new_this_pass: Vec<DerivedFact> = Vec::new();
            let mut pending: HashSet<Fact> = HashSet::new();

            for rule in &all_rules {
                let bindings_list = self.match_antecedents(rule, ontology, &working);

                let mut rule_firings = 0;
                for (bindings, matched) in &bindings_list {
                    let mut fired = false;
                    for consequent in &rule.consequents {
                        let Some(fact) = instantiate_pattern(consequent, bindings) else {
                            tracing::debug!(
                                rule = %rule.name,
                                pass,
                                "binding puts a literal in subject position, consequent skipped"
                            );
                            continue;
                        };
                        // Skip if already known or already derived this pass.
                        if ontology.contains(&fact)
                            || working.contains(&fact)
                            || pending.contains(&fact)
                        {
                            continue;
                        }
                        pending.insert(fact.clone());
                        new_this_pass.push(DerivedFact {
                            fact,
                            rule_name: rule.name.clone(),
                            antecedents: matched.clone(),
                            pass,
                        });
                        fired = true;
                    }
                    if fired {
                        rule_firings += 1;
                    }
                }

                if rule_firings > 0 {
                    tracing::debug!(rule = %rule.name, pass, firings = rule_firings, "rule fired");
                    *rule_stats.entry(rule.name.clone()).or_insert(0) += rule_firings;
                    rules_applied += rule_firings;
                }
            }

            if new_this_pass.is_empty() {
                tracing::debug!(
                    passes = pass,
                    derived = derived.len(),
                    rules_applied,
                    "fixpoint reached"
                );
                return Ok(Inference {
                    graph: working,
                    derived,
                    rules_applied,
                    passes: pass,
                    rule_stats,
                });
            }

            for dt in &new_this_pass {
                register_entities(&mut working, ontology, &dt.fact);
                working.insert(dt.fact.clone())?;
            }
            derived.extend(new_this_pass);
        }

        Err(RuleEngineError::InferenceInconsistency {
            max_passes,
            derived: derived.len(),
        })
    }

    // -----------------------------------------------------------------------
    // Pattern matching
    // -----------------------------------------------------------------------

    /// Match all antecedents of a rule against `ontology ∪ working`.
    /// Returns a list of (variable bindings, matched facts) tuples.
    fn match_antecedents(
        &self,
        rule: &InferenceRule,
        ontology: &FactGraph,
        working: &FactGraph,
    ) -> Vec<(Bindings, Vec<Fact>)> {
        let Some((first, rest)) = rule.antecedents.split_first() else {
            return Vec::new();
        };

        // Start with the first antecedent.
        let mut results: Vec<(Bindings, Vec<Fact>)> =
            match_pattern(first, &Bindings::new(), ontology, working)
                .into_iter()
                .map(|(b, f)| (b, vec![f]))
                .collect();

        // For each subsequent antecedent, extend existing bindings.
        for pattern in rest {
            if results.is_empty() {
                break;
            }
            let mut extended = Vec::new();
            for (bindings, matched) in &results {
                for (ext_bindings, ext_fact) in match_pattern(pattern, bindings, ontology, working) {
                    let mut combined = bindings.clone();
                    combined.extend(ext_bindings);
                    let mut combined_facts = matched.clone();
                    combined_facts.push(ext_fact);
                    extended.push((combined, combined_facts));
                }
            }
            results = extended;
        }

        results
    }
}

/// Match a single triple pattern, given existing bindings.
fn match_pattern(
    pattern: &TriplePattern,
    bindings: &Bindings,
    ontology: &FactGraph,
    working: &FactGraph,
) -> Vec<(Bindings, Fact)> {
    // Resolve the predicate; a known predicate uses the predicate index.
    let predicate = match &pattern.predicate {
        RuleTerm::Iri(iri) => Some(iri.as_str()),
        RuleTerm::Variable(name) => bindings.get(name).and_then(Term::as_iri),
        RuleTerm::Literal(_) => return Vec::new(),
    };

    let candidates: Box<dyn Iterator<Item = &Fact> + '_> = match predicate {
        Some(p) => Box::new(ontology.with_predicate(p).chain(working.with_predicate(p))),
        None => Box::new(ontology.facts().iter().chain(working.facts())),
    };

    let mut results = Vec::new();
    for fact in candidates {
        let mut new_bindings = Bindings::new();
        let matched = match_term(
            &pattern.subject,
            &Term::Iri(fact.subject.clone()),
            bindings,
            &mut new_bindings,
        ) && match_term(
            &pattern.predicate,
            &Term::Iri(fact.predicate.clone()),
            bindings,
            &mut new_bindings,
        ) && match_term(&pattern.object, &fact.object, bindings, &mut new_bindings);

        if matched {
            results.push((new_bindings, fact.clone()));
        }
    }
    results
}

/// Try to match a single term against a concrete value.
fn match_term(
    term: &RuleTerm,
    value: &Term,
    existing: &Bindings,
    new_bindings: &mut Bindings,
) -> bool {
    match term {
        RuleTerm::Iri(iri) => value.as_iri() == Some(iri.as_str()),
        RuleTerm::Literal(lit) => matches!(value, Term::Literal(v) if v == lit),
        RuleTerm::Variable(name) => {
            if let Some(bound) = existing.get(name) {
                bound == value
            } else if let Some(bound) = new_bindings.get(name) {
                bound == value
            } else {
                new_bindings.insert(name.clone(), value.clone());
                true
            }
        }
    }
}

/// Instantiate a consequent pattern with the given bindings. Returns `None`
/// when a binding puts a literal in subject or predicate position.
fn instantiate_pattern(pattern: &TriplePattern, bindings: &Bindings) -> Option<Fact> {
    let subject = instantiate_term(&pattern.subject, bindings)?;
    let predicate = instantiate_term(&pattern.predicate, bindings)?;
    let object = instantiate_term(&pattern.object, bindings)?;
    match (subject, predicate) {
        (Term::Iri(s), Term::Iri(p)) => Some(Fact::new(s, p, object)),
        _ => None,
    }
}

fn instantiate_term(term: &RuleTerm, bindings: &Bindings) -> Option<Term> {
    match term {
        RuleTerm::Iri(iri) => Some(Term::Iri(iri.clone())),
        RuleTerm::Literal(lit) => Some(Term::Literal(lit.clone())),
        RuleTerm::Variable(name) => bindings.get(name).cloned(),
    }
}

/// Make sure both ends of a derived fact are entities of the working graph.
///
/// Ontology entities keep their ontology class. An entity neither graph knows
/// (a rule constant missing from the ontology) takes the range class of the
/// derived predicate so post-validation can report it.
fn register_entities(working: &mut FactGraph, ontology: &FactGraph, fact: &Fact) {
    let mut register = |iri: &str, fallback: EntityClass| {
        if working.has_entity(iri) {
            return;
        }
        match ontology.entity_class(iri) {
            Some(class) => working.add_entity(iri, class),
            None => {
                tracing::warn!(entity = iri, fact = %fact, "derived fact references an entity unknown to the ontology");
                working.add_entity(iri, fallback);
            }
        }
    };
    register(&fact.subject, EntityClass::Resource);
    if let Term::Iri(object) = &fact.object {
        let fallback = DerivedPredicate::from_iri(&fact.predicate)
            .map(DerivedPredicate::range)
            .unwrap_or(EntityClass::Resource);
        register(object, fallback);
    }
}
