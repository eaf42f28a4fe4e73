//! Field value resolution: prefix fallback and cross-env references.
//!
//! Resolving a field is a depth-first walk over two entangled graphs that
//! share one `visited` trail:
//!
//! - the prefix chain: `testenv:build` falls back to `testenv` when a field
//!   is missing;
//! - the reference graph: a whole-string element `{[testenv]passenv}` splices
//!   in the referenced env's resolved value.
//!
//! A field that is absent everywhere along the prefix chain is a benign
//! `None`. A reference that resolves to nothing, or names an unknown env, is
//! fatal. The trail records env names for prefix hops and whole reference
//! tokens for reference hops, so an env may reference another field of
//! itself; revisiting either kind of entry is a cycle error.
//!
//! Free-form `{var}` placeholders (e.g. `{toxinidir}`) are not touched here;
//! they belong to the host's substitution pass, see [`crate::subst`].

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use quarry_core::{Atom, Env, EnvValue, Error, Result};

// A whole-string `{[env_name]field}` token referencing another env's field.
static ENV_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\[([^\]]+)\]([^}]+)\}$").unwrap());

/// Resolve `key` on `env` to its full list of atoms.
///
/// `Ok(None)` means the field has no value anywhere along the fallback
/// chain, which is legitimate for optional fields.
pub fn resolve_list(all_envs: &[Env], env: &Env, key: &str) -> Result<Option<Vec<Atom>>> {
    resolve_atoms(all_envs, env, key, &mut Vec::new())
}

/// Resolve `key` on `env` to a single atom.
///
/// Fails with a shape mismatch when the resolved value has more than one
/// element; an empty resolution is `Ok(None)` like a missing field.
pub fn resolve_scalar(all_envs: &[Env], env: &Env, key: &str) -> Result<Option<Atom>> {
    match resolve_atoms(all_envs, env, key, &mut Vec::new())? {
        None => Ok(None),
        Some(mut atoms) => {
            if atoms.len() > 1 {
                return Err(Error::ShapeMismatch {
                    key: key.to_string(),
                    count: atoms.len(),
                });
            }
            Ok(atoms.pop())
        }
    }
}

fn find_env<'a>(all_envs: &'a [Env], env_name: &str) -> Option<&'a Env> {
    all_envs.iter().find(|e| e.env_name == env_name)
}

fn resolve_atoms(
    all_envs: &[Env],
    env: &Env,
    key: &str,
    visited: &mut Vec<String>,
) -> Result<Option<Vec<Atom>>> {
    let name = env.env_name.as_str();
    if visited.iter().any(|v| v == name) {
        let mut chain = visited.clone();
        chain.push(name.to_string());
        return Err(Error::Cycle {
            key: key.to_string(),
            chain,
        });
    }
    trace!(env = %name, key, "resolving field");

    let Some(raw) = env.get(key) else {
        // Missing field: fall back along the colon prefix of the env name.
        let Some(prefix) = env.prefix() else {
            return Ok(None);
        };
        if visited.iter().any(|v| v == prefix) {
            // Dead end, not a cycle: the prefix walk just has nowhere left
            // to go.
            return Ok(None);
        }
        let Some(parent) = find_env(all_envs, prefix) else {
            return Ok(None);
        };
        visited.push(name.to_string());
        let resolved = resolve_atoms(all_envs, parent, key, visited);
        visited.pop();
        return resolved;
    };

    let elements: Vec<Atom> = match raw {
        EnvValue::Str(s) => vec![Atom::Str(s.clone())],
        EnvValue::List(items) => items.iter().cloned().map(Atom::Str).collect(),
        EnvValue::Bool(b) => vec![Atom::Bool(*b)],
    };

    let mut out = Vec::new();
    for element in elements {
        let Atom::Str(text) = &element else {
            out.push(element);
            continue;
        };
        let Some(caps) = ENV_REF.captures(text) else {
            // Plain value, or a free-form `{var}` placeholder for the host
            // substitution pass.
            out.push(element);
            continue;
        };
        let (ref_name, ref_key) = (&caps[1], &caps[2]);
        let Some(target) = find_env(all_envs, ref_name) else {
            return Err(Error::UnresolvedReference(format!(
                "{text}: no env named '{ref_name}'"
            )));
        };
        // Reference hops record the whole token, not the env name, so a
        // reference to a different field of the same env is not a cycle.
        if visited.iter().any(|v| v == text) {
            let mut chain = visited.clone();
            chain.push(text.clone());
            return Err(Error::Cycle {
                key: key.to_string(),
                chain,
            });
        }
        visited.push(text.clone());
        let resolved = resolve_atoms(all_envs, target, ref_key, visited);
        visited.pop();
        match resolved? {
            Some(atoms) => out.extend(atoms),
            None => {
                return Err(Error::UnresolvedReference(format!(
                    "could not interpolate {text} for env '{name}'"
                )));
            }
        }
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use quarry_core::EnvValue;

    use super::*;

    fn env<const N: usize>(id: &str, pairs: [(&str, EnvValue); N]) -> Env {
        Env::new(id, pairs).unwrap()
    }

    fn classic_envs() -> Vec<Env> {
        vec![
            env(
                "classic_testenv",
                [
                    ("env_name", "testenv".into()),
                    ("skip_install", true.into()),
                    ("basepython", "python3".into()),
                    (
                        "setenv",
                        ["VIRTUAL_ENV={envdir}", "CHARM_DIR={envdir}"].into(),
                    ),
                    ("commands", "stestr run --slowest {posargs}".into()),
                    ("passenv", ["HOME", "TEST_*"].into()),
                    ("deps", "-r{toxinidir}/test-requirements.txt".into()),
                ],
            ),
            env(
                "classic_build",
                [
                    ("env_name", "testenv:build".into()),
                    ("passenv", ["{[testenv]passenv}", "EXTRA"].into()),
                    ("commands", ["charmcraft clean", "charmcraft -v pack"].into()),
                    ("deps", "a dep".into()),
                ],
            ),
            env(
                "classic_py3",
                [("env_name", "testenv:py3".into()), ("commands", "stestr".into())],
            ),
        ]
    }

    fn strs(atoms: &[Atom]) -> Vec<&str> {
        atoms.iter().filter_map(Atom::as_str).collect()
    }

    #[test]
    fn test_direct_values() {
        let envs = classic_envs();
        let testenv = &envs[0];
        assert_eq!(
            resolve_scalar(&envs, testenv, "skip_install").unwrap(),
            Some(Atom::Bool(true))
        );
        assert_eq!(
            resolve_scalar(&envs, testenv, "basepython").unwrap(),
            Some(Atom::Str("python3".into()))
        );
        assert_eq!(
            strs(&resolve_list(&envs, testenv, "commands").unwrap().unwrap()),
            vec!["stestr run --slowest {posargs}"]
        );
    }

    #[test]
    fn test_prefix_fallback() {
        let envs = classic_envs();
        let build = &envs[1];
        let py3 = &envs[2];
        // both prefixed envs inherit skip_install from testenv
        assert_eq!(
            resolve_scalar(&envs, build, "skip_install").unwrap(),
            Some(Atom::Bool(true))
        );
        assert_eq!(
            resolve_scalar(&envs, py3, "skip_install").unwrap(),
            Some(Atom::Bool(true))
        );
        // a field present locally overrides the prefix env
        assert_eq!(
            strs(&resolve_list(&envs, build, "deps").unwrap().unwrap()),
            vec!["a dep"]
        );
        assert_eq!(
            strs(&resolve_list(&envs[..1], &envs[0], "deps").unwrap().unwrap()),
            vec!["-r{toxinidir}/test-requirements.txt"]
        );
    }

    #[test]
    fn test_reference_interpolation_splices_in_order() {
        let envs = classic_envs();
        let build = &envs[1];
        assert_eq!(
            strs(&resolve_list(&envs, build, "passenv").unwrap().unwrap()),
            vec!["HOME", "TEST_*", "EXTRA"]
        );
    }

    #[test]
    fn test_free_form_placeholders_pass_through() {
        let envs = classic_envs();
        let testenv = &envs[0];
        assert_eq!(
            strs(&resolve_list(&envs, testenv, "setenv").unwrap().unwrap()),
            vec!["VIRTUAL_ENV={envdir}", "CHARM_DIR={envdir}"]
        );
    }

    #[test]
    fn test_absent_key_is_none() {
        let envs = classic_envs();
        assert_eq!(resolve_scalar(&envs, &envs[0], "description").unwrap(), None);
        // absent on the env and on its prefix
        assert_eq!(resolve_scalar(&envs, &envs[2], "platform").unwrap(), None);
    }

    #[test]
    fn test_scalar_on_multi_value_is_shape_mismatch() {
        let envs = classic_envs();
        let err = resolve_scalar(&envs, &envs[0], "setenv").unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { key, count: 2 } if key == "setenv"));
        // the list request succeeds on the same key
        assert_eq!(
            resolve_list(&envs, &envs[0], "setenv").unwrap().unwrap().len(),
            2
        );
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let envs = vec![env(
            "py3",
            [
                ("env_name", "testenv:py3".into()),
                ("passenv", ["{[testenv:py3]passenv}", "EXTRA"].into()),
            ],
        )];
        let err = resolve_list(&envs, &envs[0], "passenv").unwrap_err();
        assert!(matches!(err, Error::Cycle { .. }));
    }

    #[test]
    fn test_mutual_reference_is_a_cycle() {
        let envs = vec![
            env("t", [("env_name", "testenv".into())]),
            env(
                "build",
                [
                    ("env_name", "testenv:build".into()),
                    ("passenv", ["{[testenv:py3]passenv}", "EXTRA"].into()),
                ],
            ),
            env(
                "py3",
                [
                    ("env_name", "testenv:py3".into()),
                    ("passenv", ["{[testenv:build]passenv}", "EXTRA"].into()),
                ],
            ),
        ];
        let err = resolve_list(&envs, &envs[1], "passenv").unwrap_err();
        assert!(matches!(err, Error::Cycle { .. }));
        let err = resolve_list(&envs, &envs[2], "passenv").unwrap_err();
        assert!(matches!(err, Error::Cycle { .. }));
    }

    #[test]
    fn test_reference_to_unknown_env_fails() {
        let envs = vec![
            env("t", [("env_name", "testenv".into())]),
            env(
                "build",
                [
                    ("env_name", "testenv:build".into()),
                    ("setenv", "{[testenv:py3]setenv}".into()),
                ],
            ),
        ];
        let err = resolve_list(&envs, &envs[1], "setenv").unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference(_)));
    }

    #[test]
    fn test_reference_to_valueless_field_fails() {
        // testenv has no passenv anywhere, so the reference cannot be
        // interpolated even though the plain-key fallback would be None.
        let envs = vec![
            env("t", [("env_name", "testenv".into())]),
            env(
                "build",
                [
                    ("env_name", "testenv:build".into()),
                    ("passenv", "{[testenv]passenv}".into()),
                ],
            ),
        ];
        let err = resolve_list(&envs, &envs[1], "passenv").unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference(_)));
    }

    #[test]
    fn test_cycle_error_reports_the_chain() {
        let envs = vec![env(
            "py3",
            [
                ("env_name", "testenv:py3".into()),
                ("passenv", "{[testenv:py3]passenv}".into()),
            ],
        )];
        let err = resolve_list(&envs, &envs[0], "passenv").unwrap_err();
        let message = err.to_string();
        assert!(
            message.contains("{[testenv:py3]passenv} -> {[testenv:py3]passenv}"),
            "{message}"
        );
    }

    #[test]
    fn test_same_env_reference_to_another_field() {
        // An env may reference a different field of itself; only revisiting
        // the same field is a cycle.
        let mut envs = classic_envs();
        envs.push(env(
            "classic_func",
            [
                ("env_name", "testenv:func".into()),
                ("setenv", "{[testenv:func]passenv}".into()),
                ("passenv", ["{[testenv]passenv}", "EXTRA"].into()),
            ],
        ));
        let func = envs.last().unwrap();
        assert_eq!(
            strs(&resolve_list(&envs, func, "setenv").unwrap().unwrap()),
            vec!["HOME", "TEST_*", "EXTRA"]
        );
    }
}
