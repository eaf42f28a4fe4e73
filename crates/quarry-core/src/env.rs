//! Environment records and their typed field table.
//!
//! An [`Env`] is a validated bundle of fields describing one build/test
//! environment. Every env carries a mandatory `env_name` such as `testenv` or
//! `testenv:build`; the part before the last `:` names the env it may fall
//! back to when a field is missing. Fields come from a closed table: each has
//! a fixed shape (string, string list, or boolean) and, for lists, the
//! separator used when the value is flattened to text.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The mandatory field present on every env.
pub const ENV_NAME: &str = "env_name";

/// A raw value supplied for an env field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Str(String),
    List(Vec<String>),
    Bool(bool),
}

impl From<&str> for EnvValue {
    fn from(value: &str) -> Self {
        EnvValue::Str(value.to_string())
    }
}

impl From<String> for EnvValue {
    fn from(value: String) -> Self {
        EnvValue::Str(value)
    }
}

impl From<bool> for EnvValue {
    fn from(value: bool) -> Self {
        EnvValue::Bool(value)
    }
}

impl From<Vec<String>> for EnvValue {
    fn from(value: Vec<String>) -> Self {
        EnvValue::List(value)
    }
}

impl<const N: usize> From<[&str; N]> for EnvValue {
    fn from(value: [&str; N]) -> Self {
        EnvValue::List(value.iter().map(|s| s.to_string()).collect())
    }
}

/// Expected shape of an env field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A scalar string.
    Str,
    /// A list of strings, joined with `separator` when flattened to text.
    StrList { separator: &'static str },
    /// A boolean flag.
    Bool,
}

const COMMA: FieldKind = FieldKind::StrList { separator: ", " };
const NEWLINE: FieldKind = FieldKind::StrList { separator: "\n" };

/// Look up the expected shape for a field name.
///
/// Returns `None` for names outside the closed field table.
pub fn field_kind(name: &str) -> Option<FieldKind> {
    let kind = match name {
        "env_name" | "description" | "basepython" | "platform" => FieldKind::Str,
        "setenv" | "set_env" => COMMA,
        "allowlist_externals" => COMMA,
        "passenv" | "pass_env" => COMMA,
        "labels" => COMMA,
        "commands" | "deps" => NEWLINE,
        "parallel_show_output" | "recreate" | "skip_install" => FieldKind::Bool,
        _ => return None,
    };
    Some(kind)
}

impl EnvValue {
    /// Check this value against the expected shape for `field`.
    fn validate(&self, field: &str, kind: FieldKind) -> Result<()> {
        let ok = match kind {
            FieldKind::Str => matches!(self, EnvValue::Str(_)),
            // A scalar string is accepted anywhere a list is; it reads as a
            // one-element list.
            FieldKind::StrList { .. } => matches!(self, EnvValue::Str(_) | EnvValue::List(_)),
            FieldKind::Bool => matches!(self, EnvValue::Bool(_)),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidValue {
                field: field.to_string(),
                message: format!("expected {kind:?}, got {self:?}"),
            })
        }
    }

    /// Flatten to the text presentation: lists join on the field separator,
    /// booleans render as `True`/`False`.
    pub fn as_text(&self, kind: FieldKind) -> String {
        match self {
            EnvValue::Str(s) => s.clone(),
            EnvValue::List(items) => {
                let separator = match kind {
                    FieldKind::StrList { separator } => separator,
                    _ => ", ",
                };
                items.join(separator)
            }
            EnvValue::Bool(true) => "True".to_string(),
            EnvValue::Bool(false) => "False".to_string(),
        }
    }
}

/// One fully-resolved element of a field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Atom {
    Str(String),
    Bool(bool),
}

impl Atom {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Atom::Str(s) => Some(s),
            Atom::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Atom::Bool(b) => Some(*b),
            Atom::Str(_) => None,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Str(s) => f.write_str(s),
            Atom::Bool(true) => f.write_str("True"),
            Atom::Bool(false) => f.write_str("False"),
        }
    }
}

/// A registered environment: unique id, mandatory `env_name`, and a bundle of
/// validated fields stored in their raw (unflattened) form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Env {
    /// Unique registration identifier.
    pub id: String,
    /// Dotted/colon env name, e.g. `testenv` or `testenv:build`.
    pub env_name: String,
    /// Remaining fields, in registration order.
    pub fields: IndexMap<String, EnvValue>,
}

impl Env {
    /// Build an env from an id and `(field, value)` pairs.
    ///
    /// Every field is checked against the closed field table; `env_name` must
    /// be among the pairs. List values are validated but kept as lists —
    /// flattening is a presentation concern, see [`Env::field_text`].
    pub fn new<K, I>(id: impl Into<String>, pairs: I) -> Result<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, EnvValue)>,
    {
        let id = id.into();
        let mut env_name = None;
        let mut fields = IndexMap::new();
        for (key, value) in pairs {
            let key = key.into();
            let kind = field_kind(&key).ok_or_else(|| Error::UnknownField(key.clone()))?;
            value.validate(&key, kind)?;
            if key == ENV_NAME {
                match value {
                    EnvValue::Str(name) => env_name = Some(name),
                    // Unreachable after validate, but keep the error total.
                    other => {
                        return Err(Error::InvalidValue {
                            field: ENV_NAME.to_string(),
                            message: format!("expected a string, got {other:?}"),
                        });
                    }
                }
            } else if fields.insert(key.clone(), value).is_some() {
                return Err(Error::Duplicate(format!("field '{key}' for env '{id}'")));
            }
        }
        let env_name = env_name
            .ok_or_else(|| Error::MissingField(format!("'{ENV_NAME}' for env '{id}'")))?;
        Ok(Env {
            id,
            env_name,
            fields,
        })
    }

    /// The raw value of a field, if present on this env.
    pub fn get(&self, key: &str) -> Option<&EnvValue> {
        self.fields.get(key)
    }

    /// The env name this env falls back to: everything before the last `:`
    /// of `env_name`, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.env_name.rsplit_once(':').map(|(prefix, _)| prefix)
    }

    /// The short name used by consumers: everything after the last `:`.
    pub fn short_name(&self) -> &str {
        self.env_name
            .rsplit_once(':')
            .map_or(self.env_name.as_str(), |(_, short)| short)
    }

    /// The text presentation of a field, flattened with its table separator.
    pub fn field_text(&self, key: &str) -> Option<String> {
        let value = self.fields.get(key)?;
        let kind = field_kind(key)?;
        Some(value.as_text(kind))
    }
}
