//! submission-check: validate submission payloads offline.
//!
//! Usage:
//!   submission-check --schema catalog.json submission.json [more.json ...]
//!
//! Exits non-zero when any submission has a feature that fails validation.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use submission_core::catalog::FileSchemaCatalog;
use submission_core::feature_tree::plan_tree;
use submission_core::schema_cache::SchemaCache;
use submission_core::telemetry::init_tracing;
use submission_core::validation::ValidationEngine;
use submission_core::{CoreConfig, FeatureNodeInput};

#[derive(Parser, Debug)]
#[command(name = "submission-check", about = "Validate submission payloads against a schema catalog")]
struct Args {
    /// JSON schema catalog: { "<feature type>": [properties...] }
    #[arg(long, env = "SUBMISSION_SCHEMA_CATALOG")]
    schema: PathBuf,

    /// Print the planned insertion order of each submission
    #[arg(long)]
    plan: bool,

    /// Submission payload files
    #[arg(required = true)]
    submissions: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = CoreConfig::from_env();
    init_tracing(&config.log_filter);

    let args = Args::parse();

    let catalog = match FileSchemaCatalog::from_path(&args.schema) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::from(2);
        }
    };
    let engine = ValidationEngine::new(Arc::new(SchemaCache::new(Arc::new(catalog))));

    let mut all_valid = true;
    for path in &args.submissions {
        match check_submission(&engine, path, args.plan).await {
            Ok(valid) => all_valid &= valid,
            Err(e) => {
                eprintln!("{}: ERROR: {e}", path.display());
                all_valid = false;
            }
        }
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn check_submission(
    engine: &ValidationEngine,
    path: &PathBuf,
    show_plan: bool,
) -> anyhow::Result<bool> {
    let text = std::fs::read_to_string(path)?;
    let root = FeatureNodeInput::from_json_str(&text)?;

    if show_plan {
        for planned in plan_tree(&root)? {
            println!(
                "{}: plan {:?} <- {:?} {} ({})",
                path.display(),
                planned.path,
                planned.parent_path,
                planned.node.id,
                planned.node.feature_type
            );
        }
    }

    let failures = engine.invalid_features(&root).await?;
    for failure in &failures {
        println!(
            "{}: {} ({}) at {:?}: {}",
            path.display(),
            failure.source_id,
            failure.feature_type,
            failure.path,
            failure.error
        );
    }

    if failures.is_empty() {
        println!("{}: ok ({} features)", path.display(), root.node_count());
    }
    Ok(failures.is_empty())
}
