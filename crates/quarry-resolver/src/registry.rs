//! The registry context object for one load session.
//!
//! A [`Registry`] starts empty, is populated by one configuration-loading
//! pass (`&mut self` registrations), and is then queried read-only
//! (`&self`). There are no update or delete operations; tests reset state by
//! constructing a fresh registry.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use quarry_core::{Env, EnvValue, Error, Result, SelectorFactory, SelectorMatcher};

use crate::mapping::Mapping;

/// Ordered resolution criteria: category name to concrete context value.
pub type Criteria = IndexMap<String, String>;

/// Registered envs, selector categories, and mappings.
#[derive(Debug, Default)]
pub struct Registry {
    envs: IndexMap<String, Env>,
    selectors: IndexMap<String, SelectorFactory>,
    mappings: IndexMap<String, Mapping>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an env under a unique id.
    ///
    /// The pairs must include `env_name`; every field is validated against
    /// the closed field table and stored in raw form.
    pub fn register_env<K, I>(&mut self, id: &str, pairs: I) -> Result<&Env>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, EnvValue)>,
    {
        if self.envs.contains_key(id) {
            return Err(Error::Duplicate(format!("env '{id}'")));
        }
        let env = Env::new(id, pairs)?;
        debug!(env = %id, env_name = %env.env_name, "registered env");
        Ok(self.envs.entry(id.to_string()).or_insert(env))
    }

    /// Register a selector category and hand back its matcher factory.
    pub fn register_selector(&mut self, name: &str) -> Result<SelectorFactory> {
        if self.selectors.contains_key(name) {
            return Err(Error::Duplicate(format!("selector category '{name}'")));
        }
        let factory = SelectorFactory::new(name);
        self.selectors.insert(name.to_string(), factory.clone());
        debug!(category = %name, "registered selector category");
        Ok(factory)
    }

    /// Register a mapping from selectors to an ordered list of env ids.
    ///
    /// The env list is resolved against the env registry here, so the stored
    /// mapping carries full env records.
    pub fn register_mapping(
        &mut self,
        name: &str,
        selectors: Vec<SelectorMatcher>,
        env_ids: &[&str],
    ) -> Result<&Mapping> {
        if selectors.is_empty() {
            return Err(Error::Parameter(format!(
                "mapping '{name}' has an empty selector list"
            )));
        }
        let mut categories = HashSet::new();
        for selector in &selectors {
            if !self.selectors.contains_key(selector.category()) {
                return Err(Error::Parameter(format!(
                    "mapping '{name}' uses unregistered selector category '{}'",
                    selector.category()
                )));
            }
            if !categories.insert(selector.category()) {
                return Err(Error::Parameter(format!(
                    "mapping '{name}' has more than one selector for category '{}'",
                    selector.category()
                )));
            }
        }

        if env_ids.is_empty() {
            return Err(Error::Parameter(format!(
                "mapping '{name}' has an empty env list"
            )));
        }
        let mut seen_ids = HashSet::new();
        for id in env_ids {
            if !seen_ids.insert(*id) {
                return Err(Error::Parameter(format!(
                    "mapping '{name}' lists env '{id}' more than once"
                )));
            }
        }
        let mut envs = Vec::with_capacity(env_ids.len());
        for id in env_ids {
            let env = self
                .envs
                .get(*id)
                .ok_or_else(|| Error::Parameter(format!("env '{id}' has not been registered")))?;
            envs.push(env.clone());
        }
        let mut env_names = HashSet::new();
        for env in &envs {
            if !env_names.insert(env.env_name.as_str()) {
                return Err(Error::Parameter(format!(
                    "mapping '{name}' picks env_name '{}' more than once",
                    env.env_name
                )));
            }
        }

        if self.mappings.contains_key(name) {
            return Err(Error::Duplicate(format!("mapping '{name}'")));
        }
        debug!(mapping = %name, envs = envs.len(), "registered mapping");
        let mapping = Mapping {
            name: name.to_string(),
            selectors,
            envs,
        };
        Ok(self.mappings.entry(name.to_string()).or_insert(mapping))
    }

    /// A registered env by id.
    pub fn env(&self, id: &str) -> Option<&Env> {
        self.envs.get(id)
    }

    /// A registered mapping by name.
    pub fn mapping(&self, name: &str) -> Option<&Mapping> {
        self.mappings.get(name)
    }

    /// Pick the env list for a set of criteria.
    ///
    /// Candidates are the mappings whose selector categories all appear in
    /// the criteria; they are ranked by specificity (see
    /// [`Mapping::specificity`], stable over registration order) and walked
    /// best-first until one matches. No match at all is an error: a
    /// catch-all has to be authored explicitly with wildcard selectors.
    pub fn resolve_envs(&self, criteria: &Criteria) -> Result<&[Env]> {
        let mut candidates: Vec<&Mapping> = self
            .mappings
            .values()
            .filter(|m| {
                m.selectors
                    .iter()
                    .all(|s| criteria.contains_key(s.category()))
            })
            .collect();
        candidates.sort_by_key(|m| std::cmp::Reverse(m.specificity()));

        for mapping in candidates {
            if mapping.matches(criteria) {
                debug!(mapping = %mapping.name, "criteria matched mapping");
                return Ok(&mapping.envs);
            }
        }
        Err(Error::NoMatch(
            criteria
                .iter()
                .map(|(k, v)| format!("{k}->{v}"))
                .collect::<Vec<_>>()
                .join(", "),
        ))
    }
}
