// assay/src/commands/plan.rs
//
// USE CASE: Show the resolution order, layer by layer.

use std::path::PathBuf;

use anyhow::Context;
use assay_core::domain::graph::GraphSolver;
use assay_core::domain::ports::RegistryLoader;
use assay_core::infrastructure::SchemaDiscovery;
use assay_core::infrastructure::config::project::load_project_config;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

pub fn execute(project_dir: PathBuf) -> anyhow::Result<()> {
    let config = load_project_config(&project_dir).with_context(|| {
        format!(
            "Failed to load project configuration from {:?}",
            project_dir
        )
    })?;
    let loader: &dyn RegistryLoader = &SchemaDiscovery;
    let registry = loader.load(&project_dir, &config)?;

    println!("🧠 Calculating Execution DAG...");
    let layers = GraphSolver::plan_layers(&registry)?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Layer", "Model", "Materialized", "Depends on", "Checks"]);

    let mut position = 0;
    for (layer_index, layer) in layers.iter().enumerate() {
        for name in layer {
            position += 1;
            let model = registry.get(name)?;
            let mut upstream: Vec<&str> = model.upstream_models().collect();
            upstream.sort_unstable();
            upstream.dedup();

            table.add_row(vec![
                position.to_string(),
                (layer_index + 1).to_string(),
                model.name.clone(),
                model
                    .materialized
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                if upstream.is_empty() {
                    "-".to_string()
                } else {
                    upstream.join(", ")
                },
                model.constraint_count().to_string(),
            ]);
        }
    }

    println!("{table}");
    println!(
        "📝 Execution Plan: {} models in {} layers",
        position,
        layers.len()
    );
    Ok(())
}
