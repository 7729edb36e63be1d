// northstar-core/src/domain/graph/mod.rs

pub mod dag;

pub use dag::{DependencyNode, GraphSolver};
