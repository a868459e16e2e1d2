// assay/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "assay")]
#[command(about = "Data-quality validation for declarative table schemas", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🧪 Validates every model against its declared constraints
    Run {
        /// Project directory
        #[arg(long, env = "ASSAY_PROJECT_DIR", default_value = ".")]
        project_dir: PathBuf,

        /// Validate only this model and the models it references (ex: "transformed_product")
        #[arg(long, short)]
        select: Option<String>,

        /// Report format on stdout
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// 🧠 Shows the resolution order without touching any data
    Plan {
        #[arg(long, env = "ASSAY_PROJECT_DIR", default_value = ".")]
        project_dir: PathBuf,
    },

    /// 🧹 Cleans build artifacts (target/ folder)
    Clean {
        #[arg(long, env = "ASSAY_PROJECT_DIR", default_value = ".")]
        project_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
