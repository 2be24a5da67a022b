//! Built-in constraint macros.
//!
//! A macro is a symbolic name usable in place of a raw constraint inside a
//! template, e.g. `/users/{id:uuid}` or `/pages/{page:int}`. The table is built
//! once from a fixed literal list and cannot be modified at runtime.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::template::Validator;

/// RFC 1123 limits not expressed by the domain pattern alone.
const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// `(name, pattern, extra check)` for every built-in macro.
const MACRO_DEFS: &[(&str, &str, Option<fn(&str) -> bool>)] = &[
    (
        "uuid",
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        None,
    ),
    ("int", r"[0-9]+", None),
    ("float", r"[0-9]*\.?[0-9]+", None),
    ("slug", r"[a-z0-9]+(?:-[a-z0-9]+)*", None),
    ("alpha", r"[a-zA-Z]+", None),
    ("alphanum", r"[a-zA-Z0-9]+", None),
    (
        "date",
        r"[0-9]{4}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12][0-9]|3[01])",
        None,
    ),
    ("hex", r"[0-9a-fA-F]+", None),
    (
        "domain",
        r"(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)*[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?",
        Some(domain_lengths_ok),
    ),
];

/// A named constraint with its expanded pattern and pre-compiled validator.
#[derive(Debug, Clone)]
pub struct Macro {
    name: &'static str,
    pattern: &'static str,
    validator: Validator,
}

impl Macro {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The unanchored pattern spliced into a template's matching regex.
    pub fn pattern(&self) -> &'static str {
        self.pattern
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }
}

static MACROS: Lazy<HashMap<&'static str, Macro>> = Lazy::new(|| {
    MACRO_DEFS
        .iter()
        .map(|&(name, pattern, check)| {
            #[allow(clippy::expect_used)]
            let regex = Regex::new(&format!("^(?:{pattern})$"))
                .expect("built-in macro patterns are valid regular expressions");
            let validator = Validator::new(Arc::new(regex), check);
            (
                name,
                Macro {
                    name,
                    pattern,
                    validator,
                },
            )
        })
        .collect()
});

/// Look up a macro by name. Unknown names return `None` and are treated by the
/// compiler as raw constraint patterns.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static Macro> {
    MACROS.get(name)
}

/// Names of all built-in macros, sorted.
#[must_use]
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<_> = MACROS.keys().copied().collect();
    names.sort_unstable();
    names
}

fn domain_lengths_ok(value: &str) -> bool {
    value.len() <= MAX_DOMAIN_LEN
        && value
            .split('.')
            .all(|label| !label.is_empty() && label.len() <= MAX_LABEL_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_macro() {
        let m = lookup("uuid").unwrap();
        assert!(m.validator().is_valid("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!m.validator().is_valid("not-a-uuid"));
    }

    #[test]
    fn test_int_and_float_macros() {
        let int = lookup("int").unwrap();
        assert!(int.validator().is_valid("42"));
        assert!(!int.validator().is_valid("abc"));
        assert!(!int.validator().is_valid("-1"));

        let float = lookup("float").unwrap();
        assert!(float.validator().is_valid("3.14"));
        assert!(float.validator().is_valid(".5"));
        assert!(float.validator().is_valid("7"));
        assert!(!float.validator().is_valid("1."));
    }

    #[test]
    fn test_slug_date_hex_alpha() {
        assert!(lookup("slug").unwrap().validator().is_valid("hello-world-2"));
        assert!(!lookup("slug").unwrap().validator().is_valid("Hello_World"));
        assert!(lookup("date").unwrap().validator().is_valid("2024-02-29"));
        assert!(!lookup("date").unwrap().validator().is_valid("2024-13-01"));
        assert!(lookup("hex").unwrap().validator().is_valid("deadBEEF"));
        assert!(lookup("alpha").unwrap().validator().is_valid("abcXYZ"));
        assert!(!lookup("alpha").unwrap().validator().is_valid("abc1"));
        assert!(lookup("alphanum").unwrap().validator().is_valid("abc1"));
    }

    #[test]
    fn test_domain_length_limits() {
        let domain = lookup("domain").unwrap();
        assert!(domain.validator().is_valid("api.example.com"));
        assert!(!domain.validator().is_valid("-bad.example.com"));

        let long_label = "a".repeat(64);
        assert!(!domain.validator().is_valid(&format!("{long_label}.com")));

        let label = "a".repeat(60);
        let too_long = [label.as_str(); 5].join(".");
        assert!(too_long.len() > MAX_DOMAIN_LEN);
        assert!(!domain.validator().is_valid(&too_long));
    }

    #[test]
    fn test_unknown_macro() {
        assert!(lookup("[0-9]+").is_none());
        assert!(names().contains(&"uuid"));
        assert_eq!(names().len(), MACRO_DEFS.len());
    }
}
