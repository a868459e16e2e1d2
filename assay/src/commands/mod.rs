// assay/src/commands/mod.rs

pub mod clean;
pub mod plan;
pub mod run;
