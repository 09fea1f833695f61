// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # comply-reasoner
//!
//! Infers the regulatory criteria and requirements that apply to an AI system
//! from a structured description of it, by forward-chaining rules over a
//! compliance ontology. Shape constraints guard the input before reasoning
//! and the derived graph after it.
//!
//! ## Architecture
//!
//! - **Fact graph** (`graph`): insertion-ordered facts with an entity table, Turtle loading via `oxigraph`
//! - **Builder** (`builder`): description attributes → typed facts about a system entity
//! - **Shapes** (`shapes`): cardinality, class and node-kind constraints with a skip mode
//! - **Rules** (`rules`): data-driven inference rules and the fixpoint engine
//! - **Pipeline** (`pipeline`): pre-validate → reason → post-validate, batch execution via `rayon`
//!
//! ## Library usage
//!
//! ```no_run
//! use comply_reasoner::builder::SystemDescription;
//! use comply_reasoner::config::ReasonerConfig;
//! use comply_reasoner::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::from_config(&ReasonerConfig::default()).unwrap();
//! let description = SystemDescription::new()
//!     .with("hasName", "Healthcare AI")
//!     .with("hasPurpose", "HealthCare")
//!     .with("hasDeploymentContext", "HighVolumeProcessing")
//!     .with("hasTrainingDataOrigin", "PublicData");
//! let record = pipeline.run(&description).unwrap();
//! println!("{}", serde_json::to_string_pretty(&record).unwrap());
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod rules;
pub mod shapes;
pub mod vocab;
