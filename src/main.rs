//! comply CLI: compliance reasoning for AI system descriptions.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};

use comply_reasoner::builder::SystemDescription;
use comply_reasoner::config::ReasonerConfig;
use comply_reasoner::graph::FactGraph;
use comply_reasoner::pipeline::Pipeline;
use comply_reasoner::vocab;

#[derive(Parser)]
#[command(name = "comply", version, about = "Ontology-driven compliance reasoning")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip shape validation regardless of configuration.
    #[arg(long, global = true)]
    no_validation: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline on one system description.
    Reason {
        /// JSON file with the system description.
        #[arg(long)]
        input: PathBuf,

        /// Turtle ontology to reason over instead of the configured one.
        #[arg(long)]
        ontology: Option<PathBuf>,

        /// Include derivation provenance and rule statistics.
        #[arg(long)]
        explain: bool,
    },

    /// Pre-validate a system description without reasoning.
    Validate {
        /// JSON file with the system description.
        #[arg(long)]
        input: PathBuf,
    },

    /// Run many descriptions in parallel.
    Batch {
        /// A JSON array of descriptions, or a directory of `*.json` files.
        #[arg(long)]
        input: PathBuf,
    },

    /// List loaded inference rules.
    Rules,

    /// List loaded shapes and validator availability.
    Shapes,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ReasonerConfig::resolve(cli.config.as_deref())?;
    if cli.no_validation {
        config.validation.enabled = false;
    }

    match cli.command {
        Commands::Reason {
            input,
            ontology,
            explain,
        } => {
            let pipeline = Pipeline::from_config(&config)?.with_explanations(explain);
            let description = read_description(&input)?;
            let record = match ontology {
                Some(path) => {
                    let ontology = FactGraph::from_turtle_file(&path)?;
                    pipeline.run_pipeline(&description, &ontology)?
                }
                None => pipeline.run(&description)?,
            };
            print_json(&record)?;
        }

        Commands::Validate { input } => {
            let pipeline = Pipeline::from_config(&config)?;
            let description = read_description(&input)?;
            let record = pipeline.run_pre_validation_only(&description)?;
            print_json(&record)?;
        }

        Commands::Batch { input } => {
            let pipeline = Pipeline::from_config(&config)?;
            let descriptions = read_batch(&input)?;
            let results = pipeline.run_batch(&descriptions);

            let mut failures = 0;
            let rendered: Vec<serde_json::Value> = results
                .into_iter()
                .map(|result| match result {
                    Ok(record) => serde_json::to_value(&record).into_diagnostic(),
                    Err(e) => {
                        failures += 1;
                        Ok(serde_json::json!({ "error": e.to_string() }))
                    }
                })
                .collect::<Result<_>>()?;
            print_json(&rendered)?;
            if failures > 0 {
                miette::bail!("{failures} of {} requests failed", rendered.len());
            }
        }

        Commands::Rules => {
            let pipeline = Pipeline::from_config(&config)?;
            let rules = pipeline.engine().rules();
            println!("Rule set: {} ({} rules)", rules.source, rules.rules.len());
            println!("Pass budget: {}", pipeline.engine().max_passes());
            for rule in &rules.rules {
                println!(
                    "  {:<28} {:<24} match {} / produce {}{}",
                    rule.name,
                    format!("{:?}", rule.kind),
                    rule.antecedents.len(),
                    rule.consequents.len(),
                    if rule.enabled { "" } else { "  (disabled)" }
                );
            }
        }

        Commands::Shapes => {
            let pipeline = Pipeline::from_config(&config)?;
            let validator = pipeline.validator();
            let capability = validator.capability();
            println!(
                "Validator: available={} enabled={}",
                capability.available, capability.enabled
            );
            for shape in &validator.shapes().shapes {
                println!(
                    "  {} -> {}",
                    shape.name,
                    vocab::compact(&shape.target_class)
                );
                for property in &shape.properties {
                    let mut constraints = Vec::new();
                    if let Some(min) = property.min_count {
                        constraints.push(format!("min {min}"));
                    }
                    if let Some(max) = property.max_count {
                        constraints.push(format!("max {max}"));
                    }
                    if let Some(class) = &property.class {
                        constraints.push(format!("class {}", vocab::compact(class)));
                    }
                    if let Some(kind) = property.node_kind {
                        constraints.push(format!("kind {kind:?}"));
                    }
                    println!(
                        "    {:<28} {}",
                        vocab::compact(&property.path),
                        constraints.join(", ")
                    );
                }
            }
        }
    }

    Ok(())
}

fn read_description(path: &Path) -> Result<SystemDescription> {
    let content = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .into_diagnostic()
        .wrap_err_with(|| format!("{} is not a JSON object of attributes", path.display()))
}

fn read_batch(path: &Path) -> Result<Vec<SystemDescription>> {
    if !path.is_dir() {
        let content = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        return serde_json::from_str(&content)
            .into_diagnostic()
            .wrap_err_with(|| format!("{} is not a JSON array of descriptions", path.display()));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to list {}", path.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files.iter().map(|file| read_description(file)).collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}
