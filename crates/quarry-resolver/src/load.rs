//! Load-instruction processing.
//!
//! A host hands the engine an ordered list of `(key, value)` string pairs,
//! e.g. the items of its `[quarry]` ini section:
//!
//! ```ini
//! [quarry]
//! lookup = category branch charm
//! category = string:openstack
//! branch = function:branch_from_review
//! charm = function:charm_from_review
//! config_module = charm-defaults
//! ```
//!
//! `config_module` names a registered configuration source whose job is to
//! populate a fresh [`Registry`]; each `lookup` key names a selector
//! category whose concrete value is either a literal (`string:`) or the
//! result of a registered zero-argument callable (`function:`). The engine
//! never performs dynamic symbol lookup itself: hosts register every loader
//! and callable they are willing to run.

use indexmap::IndexMap;
use tracing::debug;

use quarry_core::{Env, Error, Result};

use crate::registry::{Criteria, Registry};

/// Settings key naming the configuration source to run.
pub const CONFIG_MODULE: &str = "config_module";
/// Settings key holding the ordered, whitespace-separated category list.
pub const LOOKUP: &str = "lookup";

/// Where one selector value comes from at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceValue {
    /// A constant, written `string:<literal>`.
    Literal(String),
    /// A registered zero-argument callable, written `function:<name>`.
    Function(String),
}

/// Parsed load instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Name of the configuration source to run.
    pub config_module: String,
    /// Selector categories in resolution-priority order.
    pub lookup: Vec<String>,
    /// Per-category value sources.
    pub sources: IndexMap<String, SourceValue>,
}

impl Settings {
    /// Parse ordered `(key, value)` pairs. Keys are lowercased;
    /// `config_module` and `lookup` are mandatory.
    pub fn parse<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config_module = None;
        let mut lookup = None;
        let mut sources = IndexMap::new();
        for (key, value) in pairs {
            let key = key.as_ref().to_lowercase();
            let value = value.as_ref();
            match key.as_str() {
                CONFIG_MODULE => config_module = Some(value.to_string()),
                LOOKUP => {
                    lookup = Some(
                        value
                            .split_whitespace()
                            .map(|s| s.to_lowercase())
                            .collect::<Vec<_>>(),
                    );
                }
                _ => {
                    let source = if let Some(literal) = value.strip_prefix("string:") {
                        SourceValue::Literal(literal.to_string())
                    } else if let Some(name) = value.strip_prefix("function:") {
                        SourceValue::Function(name.trim().to_string())
                    } else {
                        return Err(Error::InvalidValue {
                            field: key,
                            message: format!(
                                "expected 'string:<literal>' or 'function:<name>', got '{value}'"
                            ),
                        });
                    };
                    sources.insert(key, source);
                }
            }
        }
        Ok(Settings {
            config_module: config_module
                .ok_or_else(|| Error::MissingField(CONFIG_MODULE.to_string()))?,
            lookup: lookup.ok_or_else(|| Error::MissingField(LOOKUP.to_string()))?,
            sources,
        })
    }
}

type Loader = Box<dyn Fn(&mut Registry) -> Result<()>>;

/// Named configuration loaders, registered explicitly by the host.
#[derive(Default)]
pub struct ConfigSources {
    sources: IndexMap<String, Loader>,
}

impl ConfigSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, loader: F) -> Result<()>
    where
        F: Fn(&mut Registry) -> Result<()> + 'static,
    {
        let name = name.into();
        if self.sources.contains_key(&name) {
            return Err(Error::Duplicate(format!("config source '{name}'")));
        }
        self.sources.insert(name, Box::new(loader));
        Ok(())
    }

    fn get(&self, name: &str) -> Option<&Loader> {
        self.sources.get(name)
    }
}

type ValueFn = Box<dyn Fn() -> String>;

/// Named zero-argument value callables, registered explicitly by the host.
#[derive(Default)]
pub struct ValueFns {
    fns: IndexMap<String, ValueFn>,
}

impl ValueFns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> Result<()>
    where
        F: Fn() -> String + 'static,
    {
        let name = name.into();
        if self.fns.contains_key(&name) {
            return Err(Error::Duplicate(format!("value function '{name}'")));
        }
        self.fns.insert(name, Box::new(f));
        Ok(())
    }

    fn get(&self, name: &str) -> Option<&ValueFn> {
        self.fns.get(name)
    }
}

/// Run the full load phase: populate a registry from the named source,
/// resolve the lookup keys to concrete criteria, and pick the env list.
///
/// The populated registry is handed back so the host can keep querying it
/// (other mappings, envs by id) after the initial selection.
pub fn load<I, K, V>(
    pairs: I,
    sources: &ConfigSources,
    fns: &ValueFns,
) -> Result<(Registry, Criteria, Vec<Env>)>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let settings = Settings::parse(pairs)?;
    let loader = sources.get(&settings.config_module).ok_or_else(|| {
        Error::UnresolvedReference(format!(
            "no config source named '{}'",
            settings.config_module
        ))
    })?;
    let mut registry = Registry::new();
    loader(&mut registry)?;

    let mut criteria = Criteria::new();
    for key in &settings.lookup {
        let source = settings.sources.get(key).ok_or_else(|| {
            Error::MissingField(format!("selector '{key}' named in {LOOKUP}"))
        })?;
        let value = match source {
            SourceValue::Literal(literal) => literal.clone(),
            SourceValue::Function(name) => {
                let f = fns.get(name).ok_or_else(|| {
                    Error::UnresolvedReference(format!("no value function named '{name}'"))
                })?;
                f()
            }
        };
        criteria.insert(key.clone(), value);
    }
    debug!(?criteria, "resolved lookup criteria");

    let envs = registry.resolve_envs(&criteria)?.to_vec();
    Ok((registry, criteria, envs))
}
