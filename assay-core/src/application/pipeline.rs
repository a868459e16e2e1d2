// assay-core/src/application/pipeline.rs

use futures::StreamExt;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

use crate::error::AssayError;
use crate::ports::row_source::RowSource;

// Application Services
use crate::application::validation::{self, ModelCheck};

// Domain
use crate::domain::graph::GraphSolver;
use crate::domain::project::{Model, ModelRegistry, ProjectConfig};
use crate::domain::quality::{
    EvaluationError, MaterializedRows, Report, ReportAggregator, Row, ValidationResult,
};

// Infrastructure
use crate::infrastructure::adapters::DuckDbSource;
use crate::infrastructure::config::resolve_csv_sources;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;

pub const RUN_RESULTS_FILE: &str = "run_results.json";

/// Validates every model (or `select` and its upstream closure) and aggregates
/// the outcome. Registry and resolution errors abort; everything that goes
/// wrong while evaluating a model lands in the report instead.
///
/// Fetch and evaluation run on the blocking pool, so a source that blocks
/// neither stalls the other models of its layer nor escapes the deadline.
#[instrument(skip_all, fields(engine = source.engine_name()))]
pub async fn run_validation(
    registry: &ModelRegistry,
    source: Arc<dyn RowSource>,
    config: &ProjectConfig,
    select: Option<&str>,
) -> Result<Report, AssayError> {
    let start_time = Instant::now();

    // 1. DAG (fatal on cycles / dangling references)
    let order = GraphSolver::resolve(registry)?;
    let mut layers = GraphSolver::plan_layers(registry)?;

    // 2. Selection (--select): the model plus everything it reads
    if let Some(selected) = select {
        let keep = upstream_closure(registry, selected)?;
        for layer in &mut layers {
            layer.retain(|name| keep.contains(name.as_str()));
        }
        layers.retain(|layer| !layer.is_empty());
    }

    let total_models: usize = layers.iter().map(Vec::len).sum();
    info!(
        models = total_models,
        layers = layers.len(),
        threads = config.threads,
        "Execution plan ready"
    );

    // 3. Evaluation par couche, parallèle à l'intérieur d'une couche
    let timeout = config.model_timeout_secs.map(Duration::from_secs);
    let mut materialized = MaterializedRows::new();
    let mut aggregator = ReportAggregator::new();

    for (i, layer) in layers.iter().enumerate() {
        info!(layer = i + 1, models = layer.len(), "Evaluating layer");

        // Snapshot partagé : les couches précédentes sont figées
        let upstream = Arc::new(materialized.clone());
        let tasks = layer.iter().map(|name| {
            let source = Arc::clone(&source);
            let upstream = Arc::clone(&upstream);
            async move {
                let model = registry.get(name)?.clone();
                let outcome =
                    evaluate_model(model, source, upstream, config.sample_size, timeout).await;
                Ok::<_, AssayError>((name.clone(), outcome))
            }
        });

        // Every model of this layer finishes before the next layer starts
        let outcomes: Vec<Result<(String, ModelOutcome), AssayError>> =
            futures::stream::iter(tasks)
                .buffer_unordered(config.threads.max(1))
                .collect()
                .await;

        for outcome in outcomes {
            let (name, outcome) = outcome?;
            if let Some(rows) = outcome.rows {
                materialized.insert(name.clone(), rows);
            }
            aggregator.record(&name, outcome.check.results);
            aggregator.record_undocumented(&name, outcome.check.undocumented_columns);
        }
    }

    let report = aggregator.finish(&order);
    info!(
        passed = report.passed,
        checks = report.total_checks,
        violations = report.total_violations,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Validation finished"
    );
    Ok(report)
}

struct ModelOutcome {
    /// `None` when the rows could not be obtained.
    rows: Option<Arc<Vec<Row>>>,
    check: ModelCheck,
}

async fn evaluate_model(
    model: Model,
    source: Arc<dyn RowSource>,
    upstream: Arc<MaterializedRows>,
    sample_size: usize,
    timeout: Option<Duration>,
) -> ModelOutcome {
    let work = fetch_and_check(model.clone(), source, upstream, sample_size);

    let attempt = match timeout {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(done) => done,
            Err(_) => {
                // La tâche bloquante continue en arrière-plan ; son résultat est ignoré
                warn!(model = %model.name, secs = limit.as_secs(), "Model evaluation timed out");
                return failed_outcome(
                    &model,
                    EvaluationError::Timeout {
                        secs: limit.as_secs(),
                    },
                );
            }
        },
        None => work.await,
    };

    match attempt {
        Ok((rows, check)) => ModelOutcome {
            rows: Some(rows),
            check,
        },
        Err(e) => {
            warn!(model = %model.name, error = %e, "Could not fetch rows");
            failed_outcome(
                &model,
                EvaluationError::Source {
                    message: e.to_string(),
                },
            )
        }
    }
}

/// Both steps run under `spawn_blocking`; only the join handles are awaited here.
async fn fetch_and_check(
    model: Model,
    source: Arc<dyn RowSource>,
    upstream: Arc<MaterializedRows>,
    sample_size: usize,
) -> Result<(Arc<Vec<Row>>, ModelCheck), AssayError> {
    let runtime = tokio::runtime::Handle::current();
    let name = model.name.clone();
    let rows = tokio::task::spawn_blocking(move || runtime.block_on(source.fetch_rows(&name)))
        .await
        .map_err(|e| AssayError::InternalError(format!("Fetch task failed: {e}")))??;

    let rows = Arc::new(rows);
    let shared = Arc::clone(&rows);
    let check = tokio::task::spawn_blocking(move || {
        validation::check_model(&model, &shared, &upstream, sample_size)
    })
    .await
    .map_err(|e| AssayError::InternalError(format!("Evaluation task failed: {e}")))?;

    Ok((rows, check))
}

/// One errored result per declared constraint.
fn failed_outcome(model: &Model, error: EvaluationError) -> ModelOutcome {
    let results = model
        .columns
        .iter()
        .flat_map(|column| {
            column.constraints.iter().map(|constraint| {
                ValidationResult::errored(&model.name, &column.name, constraint, error.clone())
            })
        })
        .collect();

    ModelOutcome {
        rows: None,
        check: ModelCheck {
            results,
            undocumented_columns: Vec::new(),
        },
    }
}

fn upstream_closure<'a>(
    registry: &'a ModelRegistry,
    selected: &str,
) -> Result<BTreeSet<&'a str>, AssayError> {
    let mut keep = BTreeSet::new();
    let mut stack = vec![registry.get(selected)?];

    while let Some(model) = stack.pop() {
        if !keep.insert(model.name.as_str()) {
            continue;
        }
        for target in model.upstream_models() {
            stack.push(registry.get(target)?);
        }
    }
    Ok(keep)
}

/// Exposes each model's CSV file (if any) as a DuckDB view.
pub fn register_sources(
    project_dir: &Path,
    config: &ProjectConfig,
    registry: &ModelRegistry,
    duckdb: &DuckDbSource,
) -> Result<usize, AssayError> {
    let sources = resolve_csv_sources(
        project_dir,
        config,
        registry.all().map(|m| m.name.as_str()),
    )?;
    for (model, path) in &sources {
        duckdb.register_csv(model, path)?;
    }
    info!(count = sources.len(), "CSV sources registered");
    Ok(sources.len())
}

/// Writes `<target>/run_results.json`; returns its path.
pub fn save_report(target_dir: &Path, report: &Report) -> Result<PathBuf, AssayError> {
    let path = target_dir.join(RUN_RESULTS_FILE);
    let json = report.to_json().map_err(InfrastructureError::JsonError)?;
    atomic_write(&path, json)?;
    Ok(path)
}
