pub mod dag;

pub use dag::GraphSolver;
