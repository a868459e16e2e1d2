// assay/src/commands/run.rs
//
// USE CASE: Validate the project's models.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use assay_core::application::{register_sources, run_validation, save_report};
use assay_core::domain::ports::RegistryLoader;
use assay_core::infrastructure::SchemaDiscovery;
use assay_core::infrastructure::adapters::DuckDbSource;
use assay_core::infrastructure::config::project::load_project_config;
use tracing::debug;

use crate::cli::OutputFormat;

pub async fn execute(
    project_dir: PathBuf,
    select: Option<String>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let start = std::time::Instant::now();
    // stdout must stay parseable in json mode
    let verbose = format == OutputFormat::Text;

    // A. Load the Config (Infra)
    if verbose {
        println!("⚙️  Loading configuration...");
    }
    let config = load_project_config(&project_dir).with_context(|| {
        format!(
            "Failed to load project configuration from {:?}",
            project_dir
        )
    })?;
    if verbose {
        println!("   Project: {} (v{})", config.name, config.version);
    }

    // B. Model registry (fatal on malformed or duplicate definitions)
    let loader: &dyn RegistryLoader = &SchemaDiscovery;
    let registry = loader
        .load(&project_dir, &config)
        .with_context(|| format!("Failed to load model schemas from {:?}", project_dir))?;

    // C. Instantiate the DB Adapter and expose the CSV sources
    let db_path = resolve_db_path(&project_dir, &config.db_path);
    debug!(db_path = %db_path, profile = %config.profile, "Opening DuckDB");
    let source = Arc::new(
        DuckDbSource::new(&db_path)
            .with_context(|| format!("Failed to initialize DuckDB at {}", db_path))?,
    );
    let registered = register_sources(&project_dir, &config, &registry, &source)?;
    if verbose {
        println!(
            "   Engine: DuckDB 🦆 ({} models, {} CSV sources)",
            registry.len(),
            registered
        );
    }

    // D. Run the Validation (Application Layer)
    let report = match run_validation(&registry, source, &config, select.as_deref()).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("\n💥 CRITICAL VALIDATION ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let target_dir = project_dir.join(&config.target_path);
    let saved = save_report(&target_dir, &report)?;

    match format {
        OutputFormat::Text => {
            println!("\n{}", report.format());
            println!("   Results written to {}", saved.display());
        }
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    if report.passed {
        if verbose {
            println!("\n✨ SUCCESS! Validation finished in {:.2?}", start.elapsed());
        }
    } else {
        eprintln!(
            "\n❌ FAILURE. {} of {} checks failed.",
            report.failed_checks, report.total_checks
        );
        // Exit with error code for CI/CD
        std::process::exit(1);
    }

    Ok(())
}

fn resolve_db_path(project_dir: &Path, db_path: &str) -> String {
    if db_path == ":memory:" || Path::new(db_path).is_absolute() {
        db_path.to_string()
    } else {
        project_dir.join(db_path).to_string_lossy().to_string()
    }
}
