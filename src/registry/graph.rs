//! Dependency graph over required edges: cycle detection, activation
//! ordering, reachability.
//!
//! Built once from the catalog at registry load. A three-color DFS proves
//! the graph is a DAG before the registry is handed out; the same adjacency
//! then answers activation-order and reachability queries without locking.

use crate::registry::catalog::ModuleConfig;
use crate::TenantgateError;
use std::collections::{BTreeMap, BTreeSet};

/// Result of a `validate_activation` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationCheck {
    /// Whether all required dependencies are enabled.
    pub valid: bool,
    /// Required dependency keys that are not enabled, sorted.
    pub missing_dependencies: Vec<String>,
}

/// DFS node color for cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Immutable dependency resolver over the required-edge graph.
#[derive(Debug)]
pub struct DependencyResolver {
    /// Adjacency: module key -> required dependency keys.
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyResolver {
    /// Build the resolver and prove the graph acyclic.
    ///
    /// A back-edge to a gray node during DFS is a cycle; this is fatal at
    /// load, reported with the offending walk.
    pub fn build(modules: &BTreeMap<String, ModuleConfig>) -> Result<Self, TenantgateError> {
        let edges: BTreeMap<String, Vec<String>> = modules
            .values()
            .map(|m| (m.key.clone(), m.dependencies.required.clone()))
            .collect();

        let resolver = Self { edges };
        resolver.assert_acyclic()?;
        Ok(resolver)
    }

    /// Three-color DFS over every component.
    fn assert_acyclic(&self) -> Result<(), TenantgateError> {
        let mut colors: BTreeMap<&str, Color> =
            self.edges.keys().map(|k| (k.as_str(), Color::White)).collect();

        for key in self.edges.keys() {
            if colors[key.as_str()] == Color::White {
                let mut path = Vec::new();
                self.visit(key, &mut colors, &mut path)?;
            }
        }
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        key: &'a str,
        colors: &mut BTreeMap<&'a str, Color>,
        path: &mut Vec<&'a str>,
    ) -> Result<(), TenantgateError> {
        colors.insert(key, Color::Gray);
        path.push(key);

        for dep in self.edges.get(key).into_iter().flatten() {
            match colors.get(dep.as_str()).copied() {
                Some(Color::Gray) => {
                    // Back-edge: report the cycle from its first occurrence.
                    let start = path.iter().position(|k| *k == dep).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|k| k.to_string()).collect();
                    cycle.push(dep.clone());
                    return Err(TenantgateError::CircularDependency { cycle });
                }
                Some(Color::White) => self.visit(dep, colors, path)?,
                Some(Color::Black) | None => {}
            }
        }

        path.pop();
        colors.insert(key, Color::Black);
        Ok(())
    }

    /// Compute the activation order for the requested modules.
    ///
    /// Post-order DFS: every module's transitive required dependencies
    /// appear strictly before it, deduplicated by first occurrence. The
    /// universal root module (the one everything transitively depends on)
    /// therefore always comes first.
    ///
    /// # Errors
    /// * `UnknownModule` - a requested key is not in the graph
    pub fn activation_order(&self, requested: &[&str]) -> Result<Vec<String>, TenantgateError> {
        let mut order = Vec::new();
        let mut seen = BTreeSet::new();

        for key in requested {
            if !self.edges.contains_key(*key) {
                return Err(TenantgateError::UnknownModule(key.to_string()));
            }
            self.collect_post_order(key, &mut seen, &mut order);
        }
        Ok(order)
    }

    fn collect_post_order(
        &self,
        key: &str,
        seen: &mut BTreeSet<String>,
        order: &mut Vec<String>,
    ) {
        if seen.contains(key) {
            return;
        }
        seen.insert(key.to_string());

        for dep in self.edges.get(key).into_iter().flatten() {
            self.collect_post_order(dep, seen, order);
        }
        order.push(key.to_string());
    }

    /// True iff `b` is reachable from `a` via required edges.
    pub fn is_dependency(&self, a: &str, b: &str) -> bool {
        let mut stack: Vec<&str> = self
            .edges
            .get(a)
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        let mut seen = BTreeSet::new();

        while let Some(key) = stack.pop() {
            if key == b {
                return true;
            }
            if seen.insert(key) {
                stack.extend(
                    self.edges
                        .get(key)
                        .into_iter()
                        .flatten()
                        .map(String::as_str),
                );
            }
        }
        false
    }

    /// Transitive required dependencies of a module, sorted.
    pub fn required_deps(&self, key: &str) -> Vec<String> {
        let mut deps = BTreeSet::new();
        let mut stack: Vec<&str> = self
            .edges
            .get(key)
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();

        while let Some(dep) = stack.pop() {
            if deps.insert(dep.to_string()) {
                stack.extend(
                    self.edges
                        .get(dep)
                        .into_iter()
                        .flatten()
                        .map(String::as_str),
                );
            }
        }
        deps.into_iter().collect()
    }

    /// Check whether a module can activate given the enabled set.
    ///
    /// Missing = transitive required dependencies minus `enabled`. The
    /// caller receives the concrete missing keys, not just a boolean.
    pub fn validate_activation(&self, key: &str, enabled: &[String]) -> ActivationCheck {
        let missing: Vec<String> = self
            .required_deps(key)
            .into_iter()
            .filter(|dep| !enabled.contains(dep))
            .collect();

        ActivationCheck {
            valid: missing.is_empty(),
            missing_dependencies: missing,
        }
    }
}
