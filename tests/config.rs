//! Configuration files on disk and how they shape a pipeline.

use std::path::{Path, PathBuf};

use comply_reasoner::builder::SystemDescription;
use comply_reasoner::config::{ENV_SHAPES_PATH, ENV_VALIDATION_ENABLED, ReasonerConfig};
use comply_reasoner::error::{ComplyError, ConfigError};
use comply_reasoner::pipeline::{Pipeline, PipelineState, ValidationStatus};
use comply_reasoner::rules::RuleEngineError;
use comply_reasoner::vocab::DerivedPredicate;
use serde_json::json;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn toml_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

fn healthcare() -> SystemDescription {
    SystemDescription::new()
        .with("hasName", "Healthcare AI")
        .with("hasPurpose", json!(["HealthCare"]))
        .with("hasDeploymentContext", json!(["HighVolumeProcessing"]))
        .with("hasTrainingDataOrigin", json!(["PublicData"]))
}

#[test]
fn missing_config_file_is_a_read_error() {
    let err = ReasonerConfig::load(Path::new("/nonexistent/comply.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn missing_shape_file_degrades_to_skip_mode() {
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = write(
        dir.path(),
        "comply.toml",
        &format!(
            "[validation]\nshapes_path = \"{}\"\n",
            toml_path(&dir.path().join("absent.toml"))
        ),
    );
    let config = ReasonerConfig::load(&config_path).unwrap();
    let pipeline = Pipeline::from_config(&config).unwrap();

    let capability = pipeline.validator().capability();
    assert!(!capability.available);
    assert!(capability.enabled);

    let record = pipeline
        .run_pre_validation_only(&SystemDescription::new().with("hasName", "Incomplete System"))
        .unwrap();
    assert_eq!(record.status, ValidationStatus::Skipped);
    assert!(record.conforms());
    assert_eq!(record.message.as_deref(), Some("shape validation unavailable"));
}

#[test]
fn custom_shape_file_is_enforced() {
    let dir = tempfile::TempDir::new().unwrap();
    let shapes = write(
        dir.path(),
        "shapes.toml",
        r#"
        [[shapes]]
        name = "VersionedSystem"
        target_class = "ai:IntelligentSystem"

        [[shapes.properties]]
        path = "ai:hasVersion"
        min_count = 1
        message = "a version is required"
        "#,
    );
    let mut config = ReasonerConfig::default();
    config.validation.shapes_path = Some(shapes);
    let pipeline = Pipeline::from_config(&config).unwrap();

    let rejected = pipeline.run(&healthcare()).unwrap();
    assert_eq!(rejected.state, PipelineState::Rejected);
    assert_eq!(
        rejected.message.as_deref(),
        Some("system/healthcare-ai [VersionedSystem hasVersion]: a version is required")
    );

    let accepted = pipeline.run(&healthcare().with("hasVersion", 3)).unwrap();
    assert_eq!(accepted.state, PipelineState::Done);
}

#[test]
fn json_rule_file_replaces_bundled_rules() {
    let dir = tempfile::TempDir::new().unwrap();
    let rules = write(
        dir.path(),
        "rules.json",
        r#"{
          "rules": [
            {
              "name": "healthcare-safety",
              "kind": "criterion",
              "match": ["(?S ai:hasPurpose ai:HealthCare)"],
              "produce": ["(?S ai:hasNormativeCriterion ai:PatientSafety)"]
            }
          ]
        }"#,
    );
    let config_path = write(
        dir.path(),
        "comply.toml",
        &format!(
            "[reasoning]\nrules_path = \"{}\"\nmax_passes = 4\n",
            toml_path(&rules)
        ),
    );
    let pipeline = Pipeline::from_config(&ReasonerConfig::load(&config_path).unwrap()).unwrap();
    assert_eq!(pipeline.engine().rules().rules.len(), 1);
    assert_eq!(pipeline.engine().max_passes(), 4);

    let record = pipeline.run(&healthcare()).unwrap();
    assert_eq!(
        record.relationships(DerivedPredicate::HasNormativeCriterion),
        ["PatientSafety".to_string()]
    );
    assert!(record
        .relationships(DerivedPredicate::HasTechnicalCriterion)
        .is_empty());
    assert_eq!(record.rules_applied, 1);
}

#[test]
fn malformed_rule_file_is_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let rules = write(
        dir.path(),
        "broken.rules",
        "@rule unbound criterion\n  match: (?S ai:hasPurpose ?P)\n  produce: (?S ai:hasNormativeCriterion ?C)\n",
    );
    let mut config = ReasonerConfig::default();
    config.reasoning.rules_path = Some(rules);
    let err = Pipeline::from_config(&config).unwrap_err();
    assert!(matches!(
        err,
        ComplyError::Rules(RuleEngineError::RuleParse { .. })
    ));
}

#[test]
fn malformed_ontology_file_is_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let ontology = write(dir.path(), "core.ttl", "ai:HealthCare a .");
    let mut config = ReasonerConfig::default();
    config.reasoning.ontology_path = Some(ontology);
    assert!(matches!(
        Pipeline::from_config(&config).unwrap_err(),
        ComplyError::Graph(_)
    ));
}

#[test]
fn zero_pass_bound_is_rejected_before_any_request() {
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = write(dir.path(), "comply.toml", "[reasoning]\nmax_passes = 0\n");
    assert!(matches!(
        ReasonerConfig::load(&config_path).unwrap_err(),
        ConfigError::InvalidValue { .. }
    ));

    let mut config = ReasonerConfig::default();
    config.reasoning.max_passes = Some(0);
    assert!(matches!(
        Pipeline::from_config(&config).unwrap_err(),
        ComplyError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[test]
fn environment_overrides_win_over_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = write(dir.path(), "comply.toml", "[validation]\nenabled = true\n");
    let mut config = ReasonerConfig::load(&config_path).unwrap();
    config
        .apply_overrides(|name| match name {
            ENV_VALIDATION_ENABLED => Some("false".into()),
            _ => None,
        })
        .unwrap();

    let pipeline = Pipeline::from_config(&config).unwrap();
    let record = pipeline
        .run(&SystemDescription::new().with("hasName", "Incomplete System"))
        .unwrap();
    assert!(record.valid);
    assert_eq!(record.pre_validation.status, ValidationStatus::Skipped);
    assert!(!record.pre_validation.enabled);
}

#[test]
fn shapes_path_override_points_at_new_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let shapes = write(dir.path(), "empty.toml", "");
    let mut config = ReasonerConfig::default();
    config
        .apply_overrides(|name| (name == ENV_SHAPES_PATH).then(|| shapes.display().to_string()))
        .unwrap();
    assert_eq!(config.validation.shapes_path.as_deref(), Some(shapes.as_path()));

    // No shapes at all: the validator runs and everything conforms.
    let pipeline = Pipeline::from_config(&config).unwrap();
    assert!(pipeline.validator().capability().is_active());
    let record = pipeline
        .run_pre_validation_only(&SystemDescription::new())
        .unwrap();
    assert_eq!(record.status, ValidationStatus::Passed);
}
