//! Static module catalog: keys, commercial tiers, pricing, quota shapes,
//! and declared dependencies.
//!
//! The catalog is loaded once at startup and treated as immutable
//! thereafter. Invariant violations (unequal limit-key sets, decreasing
//! pricing, self-dependencies, unknown dependency keys, cycles) are fatal
//! load errors, never per-request failures.

use crate::registry::graph::DependencyResolver;
use crate::TenantgateError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Commercial pricing tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Entry tier for small teams.
    Starter,
    /// Mid tier.
    Business,
    /// Top tier with the largest quota set.
    Enterprise,
}

/// Pricing and quota limits for one tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierPlan {
    /// Monthly subscription price.
    pub monthly: f64,
    /// On-premise license price.
    pub on_premise: f64,
    /// Quota limits keyed by resource name (e.g. `maxEmployees`).
    pub limits: BTreeMap<String, u64>,
}

/// Per-tier pricing for a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pricing {
    /// Starter tier plan.
    pub starter: TierPlan,
    /// Business tier plan.
    pub business: TierPlan,
    /// Enterprise tier plan.
    pub enterprise: TierPlan,
}

impl Pricing {
    /// Look up the plan for a tier.
    pub fn plan(&self, tier: Tier) -> &TierPlan {
        match tier {
            Tier::Starter => &self.starter,
            Tier::Business => &self.business,
            Tier::Enterprise => &self.enterprise,
        }
    }
}

/// Commercial metadata for a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commercial {
    /// Marketing description.
    pub description: String,
    /// Target customer segment.
    pub target_segment: String,
    /// Value proposition line.
    pub value_proposition: String,
    /// Tiered pricing.
    pub pricing: Pricing,
}

/// Declared module dependencies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dependencies {
    /// Modules that must be enabled before this one can activate.
    #[serde(default)]
    pub required: Vec<String>,
    /// Modules that enhance this one but are not required.
    #[serde(default)]
    pub optional: Vec<String>,
}

/// Catalog entry for one licensable module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleConfig {
    /// Unique module key (e.g. `payroll`, `clinic`).
    pub key: String,
    /// Human-readable name.
    pub display_name: String,
    /// Commercial metadata and pricing.
    pub commercial: Commercial,
    /// Declared dependencies.
    #[serde(default)]
    pub dependencies: Dependencies,
}

impl ModuleConfig {
    /// A module with no required dependencies is core: always on, not
    /// license-gated.
    pub fn is_core(&self) -> bool {
        self.dependencies.required.is_empty()
    }

    /// Validate per-module invariants.
    fn validate(&self) -> Result<(), TenantgateError> {
        if self.key.is_empty() {
            return Err(TenantgateError::Structure(
                "module key cannot be empty".to_string(),
            ));
        }

        if self
            .dependencies
            .required
            .iter()
            .chain(self.dependencies.optional.iter())
            .any(|dep| dep == &self.key)
        {
            return Err(TenantgateError::Structure(format!(
                "module '{}' lists itself as a dependency",
                self.key
            )));
        }

        // Limit-key sets must be identical across all three tiers.
        let starter_keys: BTreeSet<&String> =
            self.commercial.pricing.starter.limits.keys().collect();
        let business_keys: BTreeSet<&String> =
            self.commercial.pricing.business.limits.keys().collect();
        let enterprise_keys: BTreeSet<&String> =
            self.commercial.pricing.enterprise.limits.keys().collect();
        if starter_keys != business_keys || starter_keys != enterprise_keys {
            return Err(TenantgateError::Structure(format!(
                "module '{}' has unequal limit-key sets across tiers",
                self.key
            )));
        }

        // Pricing must be monotonically non-decreasing across tiers.
        let p = &self.commercial.pricing;
        if p.starter.monthly > p.business.monthly
            || p.business.monthly > p.enterprise.monthly
            || p.starter.on_premise > p.business.on_premise
            || p.business.on_premise > p.enterprise.on_premise
        {
            return Err(TenantgateError::Structure(format!(
                "module '{}' pricing decreases across tiers",
                self.key
            )));
        }

        Ok(())
    }
}

/// Immutable module registry, validated once at load.
#[derive(Debug)]
pub struct Registry {
    modules: BTreeMap<String, ModuleConfig>,
    resolver: DependencyResolver,
}

impl Registry {
    /// Load and validate a registry from module configs.
    ///
    /// # Errors
    /// * `Structure` - duplicate keys, self-dependency, unequal limit-key
    ///   sets, decreasing pricing, or a required dependency that is not in
    ///   the catalog
    /// * `CircularDependency` - the required-edge graph is not a DAG
    pub fn load(configs: Vec<ModuleConfig>) -> Result<Self, TenantgateError> {
        let mut modules = BTreeMap::new();

        for config in configs {
            config.validate()?;
            if modules.insert(config.key.clone(), config.clone()).is_some() {
                return Err(TenantgateError::Structure(format!(
                    "duplicate module key '{}'",
                    config.key
                )));
            }
        }

        // Every required edge must point at a cataloged module.
        for config in modules.values() {
            for dep in &config.dependencies.required {
                if !modules.contains_key(dep) {
                    return Err(TenantgateError::Structure(format!(
                        "module '{}' requires unknown module '{}'",
                        config.key, dep
                    )));
                }
            }
        }

        let resolver = DependencyResolver::build(&modules)?;
        tracing::info!(modules = modules.len(), "module registry loaded");

        Ok(Self { modules, resolver })
    }

    /// Look up a module by key.
    pub fn get(&self, key: &str) -> Option<&ModuleConfig> {
        self.modules.get(key)
    }

    /// Whether the key is cataloged.
    pub fn contains(&self, key: &str) -> bool {
        self.modules.contains_key(key)
    }

    /// All module keys in the catalog, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Keys of core modules (no required dependencies).
    pub fn core_keys(&self) -> Vec<String> {
        self.modules
            .values()
            .filter(|m| m.is_core())
            .map(|m| m.key.clone())
            .collect()
    }

    /// The dependency resolver over required edges.
    pub fn resolver(&self) -> &DependencyResolver {
        &self.resolver
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    /// A module config with flat pricing and the given required deps.
    pub fn module(key: &str, required: &[&str]) -> ModuleConfig {
        let plan = |monthly: f64| TierPlan {
            monthly,
            on_premise: monthly * 10.0,
            limits: BTreeMap::from([("maxEmployees".to_string(), 100)]),
        };
        ModuleConfig {
            key: key.to_string(),
            display_name: key.to_uppercase(),
            commercial: Commercial {
                description: format!("{} module", key),
                target_segment: "smb".to_string(),
                value_proposition: format!("{} for HR teams", key),
                pricing: Pricing {
                    starter: plan(10.0),
                    business: plan(20.0),
                    enterprise: plan(40.0),
                },
            },
            dependencies: Dependencies {
                required: required.iter().map(|s| s.to_string()).collect(),
                optional: vec![],
            },
        }
    }

    /// The catalog used across registry/entitlement tests:
    /// hr-core <- attendance <- payroll, hr-core <- clinic.
    pub fn hr_catalog() -> Vec<ModuleConfig> {
        vec![
            module("hr-core", &[]),
            module("attendance", &["hr-core"]),
            module("payroll", &["hr-core", "attendance"]),
            module("clinic", &["hr-core"]),
        ]
    }
}
