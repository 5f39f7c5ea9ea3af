//! Module catalog and dependency graph.

pub mod catalog;
pub mod graph;

pub use catalog::{ModuleConfig, Registry, Tier};
pub use graph::{ActivationCheck, DependencyResolver};
