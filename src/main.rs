//! onto CLI: typed ontology validation and inference.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use ontology_engine::config::EngineConfig;
use ontology_engine::engine::Engine;
use ontology_engine::error::OntologyError;
use ontology_engine::triple::{KnowledgeTriple, parse_tuple};
use ontology_engine::validate::TypeHints;

#[derive(Parser)]
#[command(name = "onto", version, about = "Typed ontology validation and inference")]
struct Cli {
    /// Engine config file (TOML). Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of additional seed packs.
    #[arg(long, global = true)]
    seeds_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a single triple, e.g. "(GPT-4, improves_upon, GPT-3.5)".
    Validate {
        /// Triple in (subject, predicate, object) form.
        triple: String,

        /// Confidence score in [0, 1].
        #[arg(long, default_value = "1.0")]
        confidence: f32,

        /// Explicit subject type, overriding inference.
        #[arg(long)]
        subject_type: Option<String>,

        /// Explicit object type, overriding inference.
        #[arg(long)]
        object_type: Option<String>,

        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Validate every triple in a JSON file and report rejections.
    Check {
        /// Path to a JSON array of triple records.
        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Validate the triples in a JSON file, then infer over the accepted ones.
    Infer {
        /// Path to a JSON array of triple records.
        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Check whether a triple is asserted in or derivable from a JSON file.
    CanInfer {
        /// Path to a JSON array of triple records.
        #[arg(long)]
        file: PathBuf,

        /// Candidate triple in (subject, predicate, object) form.
        triple: String,
    },

    /// List registered types.
    Types,

    /// List registered relations (predicates).
    Relations,

    /// Check whether one type is a subtype of another.
    Subtype {
        candidate: String,
        ancestor: String,
    },

    /// Show engine info and statistics.
    Info,
}

/// One triple in an input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TripleRecord {
    subject: String,
    predicate: String,
    object: String,
    #[serde(default = "default_confidence")]
    confidence: f32,
    #[serde(default)]
    source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    object_type: Option<String>,
}

fn default_confidence() -> f32 {
    1.0
}

impl TripleRecord {
    fn triple(&self) -> KnowledgeTriple {
        KnowledgeTriple::new(
            self.subject.as_str(),
            self.predicate.as_str(),
            self.object.as_str(),
        )
        .with_confidence(self.confidence)
        .with_source(self.source.as_str())
    }

    fn hints(&self) -> TypeHints {
        hints(self.subject_type.as_deref(), self.object_type.as_deref())
    }
}

fn hints(subject: Option<&str>, object: Option<&str>) -> TypeHints {
    let mut hints = TypeHints::none();
    if let Some(t) = subject {
        hints = hints.subject(t);
    }
    if let Some(t) = object {
        hints = hints.object(t);
    }
    hints
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

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = cli.seeds_dir {
        config.bootstrap.seeds_dir = Some(dir);
    }
    let engine = Engine::new(config)?;

    match cli.command {
        Commands::Validate {
            triple,
            confidence,
            subject_type,
            object_type,
            json,
        } => {
            let key = parse_tuple(&triple)?;
            let triple = KnowledgeTriple::new(key.subject, key.predicate, key.object)
                .with_confidence(confidence);
            let hints = hints(subject_type.as_deref(), object_type.as_deref());
            let result = engine.validate_with(&triple, &hints);

            if json {
                let report = validation_report(&triple, &result);
                println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
                // A rejection still fails the process after the report is written.
                result?;
            } else {
                result?;
                println!("valid: {triple}");
            }
        }

        Commands::Check { file, json } => {
            let records = read_records(&file)?;
            let validator = engine.validator();
            let rejections: Vec<(usize, &TripleRecord, OntologyError)> = records
                .par_iter()
                .enumerate()
                .filter_map(|(i, rec)| {
                    validator
                        .validate_with(&rec.triple(), &rec.hints())
                        .err()
                        .map(|e| (i, rec, e))
                })
                .collect();
            let accepted = records.len() - rejections.len();

            if json {
                let rejected: Vec<serde_json::Value> = rejections
                    .iter()
                    .map(|(i, rec, e)| {
                        serde_json::json!({ "index": i, "triple": rec, "error": e.to_string() })
                    })
                    .collect();
                let report = serde_json::json!({
                    "total": records.len(),
                    "accepted": accepted,
                    "rejected": rejected,
                });
                println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
            } else {
                println!("{accepted}/{} triples accepted", records.len());
                for (i, rec, e) in &rejections {
                    println!(
                        "  [{i}] ({}, {}, {}): {e}",
                        rec.subject, rec.predicate, rec.object
                    );
                }
            }
        }

        Commands::Infer { file, json } => {
            let records = read_records(&file)?;
            let accepted = accepted_triples(&engine, &records);
            let outcome = engine.infer(&accepted)?;

            if json {
                let report = serde_json::json!({
                    "input": records.len(),
                    "accepted": accepted.len(),
                    "rounds": outcome.rounds,
                    "reached_fixpoint": outcome.reached_fixpoint,
                    "derived": outcome.derived,
                });
                println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
            } else {
                println!(
                    "{} accepted of {}; {} derived in {} round(s){}",
                    accepted.len(),
                    records.len(),
                    outcome.len(),
                    outcome.rounds,
                    if outcome.reached_fixpoint {
                        ""
                    } else {
                        " (round cap reached, may be incomplete)"
                    }
                );
                for dt in &outcome.derived {
                    println!("  {dt}");
                }
            }
        }

        Commands::CanInfer { file, triple } => {
            let candidate = parse_tuple(&triple)?;
            let records = read_records(&file)?;
            let accepted = accepted_triples(&engine, &records);
            let derivable = engine.can_infer(&accepted, &candidate)?;
            println!("{candidate}: {derivable}");
        }

        Commands::Types => {
            let snapshot = engine.snapshot();
            println!("Types ({}):", snapshot.types().len());
            for ty in snapshot.types().iter() {
                let parent = ty.parent.as_ref().map_or("-", |p| p.as_str());
                println!("  {:<14} parent: {:<10} {}", ty.type_id, parent, ty.description);
            }
        }

        Commands::Relations => {
            let snapshot = engine.snapshot();
            println!("Relations ({}):", snapshot.relations().len());
            for rel in snapshot.relations().iter() {
                let domain = rel.domain.as_ref().map_or("*", |d| d.as_str());
                let range = rel.range.as_ref().map_or("*", |r| r.as_str());
                println!(
                    "  {:<14} {domain} -> {range} [{}]",
                    rel.relation_id,
                    rel.axioms()
                );
            }
        }

        Commands::Subtype {
            candidate,
            ancestor,
        } => {
            let snapshot = engine.snapshot();
            for id in [&candidate, &ancestor] {
                if snapshot.get_type(id).is_none() {
                    return Err(OntologyError::UnknownType(id.clone()).into());
                }
            }
            println!("{}", snapshot.is_subtype_of(&candidate, &ancestor));
        }

        Commands::Info => {
            println!("{}", engine.info());
        }
    }

    Ok(())
}

fn validation_report(
    triple: &KnowledgeTriple,
    result: &Result<(), OntologyError>,
) -> serde_json::Value {
    match result {
        Ok(()) => serde_json::json!({ "valid": true, "triple": triple }),
        Err(e) => serde_json::json!({
            "valid": false,
            "triple": triple,
            "error": e.to_string(),
        }),
    }
}

fn read_records(path: &Path) -> Result<Vec<TripleRecord>> {
    let content = std::fs::read_to_string(path).into_diagnostic()?;
    serde_json::from_str(&content).into_diagnostic()
}

/// Validate records, logging and dropping rejections.
fn accepted_triples(engine: &Engine, records: &[TripleRecord]) -> Vec<KnowledgeTriple> {
    let validator = engine.validator();
    records
        .iter()
        .filter_map(|rec| {
            let triple = rec.triple();
            match validator.validate_with(&triple, &rec.hints()) {
                Ok(()) => Some(triple),
                Err(e) => {
                    tracing::warn!(
                        subject = %rec.subject,
                        predicate = %rec.predicate,
                        object = %rec.object,
                        "rejected: {e}"
                    );
                    None
                }
            }
        })
        .collect()
}
