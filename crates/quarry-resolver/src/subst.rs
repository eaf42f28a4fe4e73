//! Presentation-layer substitutions.
//!
//! The value resolver leaves free-form `{var}` placeholders (such as
//! `{toxinidir}` or `{posargs}`) untouched. Hosts apply these substitutions
//! when rendering final values, with whatever variable set their own world
//! provides. Unknown placeholders are left as-is for any later pass.

use indexmap::IndexMap;

use quarry_core::Atom;

/// Replace every known `{key}` placeholder in `text`.
pub fn substitute(vars: &IndexMap<String, String>, text: &str) -> String {
    let mut out = text.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

/// Element-wise [`substitute`] over a list.
pub fn substitute_all(vars: &IndexMap<String, String>, items: &[String]) -> Vec<String> {
    items.iter().map(|item| substitute(vars, item)).collect()
}

/// Substitute inside string atoms; booleans pass through unchanged.
pub fn substitute_atom(vars: &IndexMap<String, String>, atom: &Atom) -> Atom {
    match atom {
        Atom::Str(s) => Atom::Str(substitute(vars, s)),
        Atom::Bool(b) => Atom::Bool(*b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> IndexMap<String, String> {
        [
            ("this".to_string(), "one".to_string()),
            ("that".to_string(), "two".to_string()),
        ]
        .into()
    }

    #[test]
    fn test_substitute() {
        let vars = vars();
        assert_eq!(substitute(&vars, "any"), "any");
        assert_eq!(substitute(&vars, "any {this}"), "any one");
        assert_eq!(substitute(&vars, "{this} {that}"), "one two");
    }

    #[test]
    fn test_unknown_placeholders_left_alone() {
        let vars = vars();
        assert_eq!(
            substitute(&vars, "stestr run {posargs}"),
            "stestr run {posargs}"
        );
    }

    #[test]
    fn test_substitute_all() {
        let vars = vars();
        assert_eq!(
            substitute_all(&vars, &["{this}".to_string(), "and {that}".to_string()]),
            vec!["one", "and two"]
        );
    }

    #[test]
    fn test_substitute_atom() {
        let vars = vars();
        assert_eq!(
            substitute_atom(&vars, &Atom::Str("{this}".into())),
            Atom::Str("one".into())
        );
        assert_eq!(substitute_atom(&vars, &Atom::Bool(true)), Atom::Bool(true));
    }
}
