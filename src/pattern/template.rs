//! Template compilation.
//!
//! Turns a host, path, prefix or query template such as
//! `/users/{id:int}/posts/{slug}` into a [`CompiledTemplate`]:
//!
//! ```text
//! template  /users/{id:int}/posts/{slug}
//! regex     ^/users/(?P<v0>[0-9]+)/posts/(?P<v1>[^/]+)$
//! vars      ["id", "slug"]
//! reverse   "/users/" <id> "/posts/" <slug>
//! ```
//!
//! Every failure (unbalanced braces, empty names, invalid constraints,
//! duplicate names) is reported here, at construction time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use super::cache::PatternCache;
use super::macros;
use crate::error::RouteError;

/// What a template is matched against, which decides its defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// Full request path, anchored at both ends.
    Path,
    /// Request host. Variables default to "no dot".
    Host,
    /// Leading part of the request path; no trailing anchor.
    Prefix,
    /// Value of one query parameter. Variables default to "anything".
    Query,
}

impl TemplateKind {
    fn default_pattern(self) -> &'static str {
        match self {
            TemplateKind::Path | TemplateKind::Prefix => "[^/]+",
            TemplateKind::Host => "[^.]+",
            TemplateKind::Query => ".*",
        }
    }
}

/// Options that change how a template compiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateOptions {
    /// Path templates accept the path with or without a trailing slash.
    pub strict_slash: bool,
    /// Path templates are matched against the percent-encoded path.
    pub use_encoded_path: bool,
}

/// Checks a single variable value: an anchored regex plus an optional extra
/// predicate for rules a regex cannot express (e.g. domain length limits).
#[derive(Clone)]
pub struct Validator {
    regex: Arc<Regex>,
    check: Option<fn(&str) -> bool>,
}

impl Validator {
    pub(crate) fn new(regex: Arc<Regex>, check: Option<fn(&str) -> bool>) -> Self {
        Self { regex, check }
    }

    #[must_use]
    pub fn is_valid(&self, value: &str) -> bool {
        self.regex.is_match(value) && self.check.map_or(true, |check| check(value))
    }

    /// The anchored pattern, used in error messages.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("regex", &self.regex.as_str())
            .field("extra_check", &self.check.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReversePart {
    Literal(String),
    Var(usize),
}

/// The compiled form of one template. Immutable once built.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    template: String,
    kind: TemplateKind,
    options: TemplateOptions,
    regex: Arc<Regex>,
    /// Host templates only: matches the template as the trailing labels of a host.
    suffix_regex: Option<Arc<Regex>>,
    var_names: Vec<String>,
    group_names: Vec<String>,
    validators: Vec<Validator>,
    reverse: Vec<ReversePart>,
    /// Host templates without a port match the request host with its port removed.
    wildcard_host_port: bool,
    /// Query templates only: the parameter key, and whether only presence is checked.
    query_key: Option<String>,
    presence_only: bool,
}

impl CompiledTemplate {
    /// Compile `template` of the given kind, sharing regexes through `cache`.
    pub fn compile(
        template: &str,
        kind: TemplateKind,
        options: TemplateOptions,
        cache: &PatternCache,
    ) -> Result<Self, RouteError> {
        let (query_key, body) = match kind {
            TemplateKind::Query => match template.split_once('=') {
                Some((key, value)) => (Some(key.to_string()), value),
                None => (Some(template.to_string()), ""),
            },
            _ => (None, template),
        };
        let presence_only = kind == TemplateKind::Query && body.is_empty();

        let spans = brace_spans(body).ok_or_else(|| RouteError::UnbalancedBraces {
            template: template.to_string(),
        })?;

        let strict_slash = options.strict_slash && kind == TemplateKind::Path;
        let (body, end_slash) = match body.strip_suffix('/') {
            Some(trimmed) if strict_slash => (trimmed, true),
            _ => (body, false),
        };

        let mut pattern = String::with_capacity(body.len() + 16);
        pattern.push('^');
        let mut var_names: Vec<String> = Vec::with_capacity(spans.len());
        let mut group_names = Vec::with_capacity(spans.len());
        let mut validators = Vec::with_capacity(spans.len());
        let mut reverse = Vec::with_capacity(spans.len() * 2 + 1);
        let mut literal_has_port = false;

        let mut end = 0;
        for (index, &(open, close)) in spans.iter().enumerate() {
            let raw = literal(&body[end..open], kind);
            literal_has_port |= raw.contains(':');
            end = close;

            let inner = &body[open + 1..close - 1];
            let (name, constraint) = match inner.split_once(':') {
                Some((name, constraint)) => (name, Some(constraint)),
                None => (inner, None),
            };
            if name.is_empty() {
                return Err(RouteError::MissingVariableName {
                    template: template.to_string(),
                });
            }
            if var_names.iter().any(|existing| existing == name) {
                return Err(RouteError::DuplicateVariable {
                    name: name.to_string(),
                });
            }

            let (var_pattern, validator) = match constraint {
                None => {
                    let patt = kind.default_pattern();
                    (patt, anchored_validator(patt, cache)?)
                }
                Some("") => {
                    return Err(RouteError::InvalidPattern {
                        pattern: inner.to_string(),
                        reason: "empty constraint".to_string(),
                    })
                }
                Some(constraint) => match macros::lookup(constraint) {
                    Some(m) => (m.pattern(), m.validator().clone()),
                    None => (constraint, anchored_validator(constraint, cache)?),
                },
            };

            let group = format!("v{index}");
            pattern.push_str(&regex::escape(&raw));
            pattern.push_str("(?P<");
            pattern.push_str(&group);
            pattern.push('>');
            pattern.push_str(var_pattern);
            pattern.push(')');

            if !raw.is_empty() {
                reverse.push(ReversePart::Literal(raw));
            }
            reverse.push(ReversePart::Var(index));
            var_names.push(name.to_string());
            group_names.push(group);
            validators.push(validator);
        }

        let suffix = literal(&body[end..], kind);
        literal_has_port |= suffix.contains(':');
        pattern.push_str(&regex::escape(&suffix));
        if strict_slash {
            pattern.push_str("[/]?");
        }
        if presence_only {
            pattern.push_str(kind.default_pattern());
        }
        if kind != TemplateKind::Prefix {
            pattern.push('$');
        }
        if !suffix.is_empty() {
            reverse.push(ReversePart::Literal(suffix));
        }
        if end_slash {
            reverse.push(ReversePart::Literal("/".to_string()));
        }

        let invalid = |err: regex::Error| RouteError::InvalidPattern {
            pattern: template.to_string(),
            reason: err.to_string(),
        };
        let regex = cache.get_or_compile(&pattern).map_err(invalid)?;
        let suffix_regex = match kind {
            TemplateKind::Host => {
                let unanchored = pattern.strip_prefix('^').unwrap_or(&pattern);
                Some(
                    cache
                        .get_or_compile(&format!(r"(?:^|\.){unanchored}"))
                        .map_err(invalid)?,
                )
            }
            _ => None,
        };

        Ok(Self {
            template: template.to_string(),
            kind,
            options,
            regex,
            suffix_regex,
            var_names,
            group_names,
            validators,
            reverse,
            wildcard_host_port: kind == TemplateKind::Host && !literal_has_port,
            query_key,
            presence_only,
        })
    }

    /// The template text as written (query templates include `key=`).
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    #[must_use]
    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    #[must_use]
    pub fn options(&self) -> TemplateOptions {
        self.options
    }

    /// The anchored regular expression the template compiled to.
    #[must_use]
    pub fn regex_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Variable names in order of appearance.
    #[must_use]
    pub fn var_names(&self) -> &[String] {
        &self.var_names
    }

    #[must_use]
    pub fn validator(&self, name: &str) -> Option<&Validator> {
        self.var_names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.validators[i])
    }

    #[must_use]
    pub fn query_key(&self) -> Option<&str> {
        self.query_key.as_deref()
    }

    /// Query template with no value part (`key` or `key=`): only the key's
    /// presence is checked.
    #[must_use]
    pub fn is_presence_only(&self) -> bool {
        self.presence_only
    }

    /// Prefix templates match any continuation of the path.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.kind == TemplateKind::Prefix
    }

    #[must_use]
    pub fn has_trailing_slash(&self) -> bool {
        self.template.ends_with('/')
    }

    /// Host templates without an explicit port ignore the request port.
    #[must_use]
    pub fn ignores_port(&self) -> bool {
        self.wildcard_host_port
    }

    /// Match `input` and return the captured variables in declaration order.
    #[must_use]
    pub fn captures(&self, input: &str) -> Option<Vec<(&str, String)>> {
        self.captures_with(&self.regex, input)
    }

    /// Like [`captures`](Self::captures), but a host template may also match
    /// the trailing labels of a longer host (`example.com` accepts
    /// `api.example.com`). Other kinds match as usual.
    #[must_use]
    pub fn captures_suffix(&self, input: &str) -> Option<Vec<(&str, String)>> {
        match &self.suffix_regex {
            Some(regex) => self.captures_with(regex, input),
            None => self.captures(input),
        }
    }

    fn captures_with(&self, regex: &Regex, input: &str) -> Option<Vec<(&str, String)>> {
        let caps = regex.captures(input)?;
        let mut vars = Vec::with_capacity(self.var_names.len());
        for ((name, group), validator) in self
            .var_names
            .iter()
            .zip(&self.group_names)
            .zip(&self.validators)
        {
            let value = caps.name(group).map_or("", |m| m.as_str());
            if let Some(check) = validator.check {
                if !check(value) {
                    return None;
                }
            }
            vars.push((name.as_str(), value.to_string()));
        }
        Some(vars)
    }

    #[must_use]
    pub fn is_match(&self, input: &str) -> bool {
        self.captures(input).is_some()
    }

    /// Substitute `values` into the reverse template.
    ///
    /// Every variable must be present and valid. Query templates produce
    /// `key=value` with the value form-encoded.
    pub fn expand(&self, values: &HashMap<String, String>) -> Result<String, RouteError> {
        let mut resolved = Vec::with_capacity(self.var_names.len());
        for (name, validator) in self.var_names.iter().zip(&self.validators) {
            let value = values
                .get(name)
                .ok_or_else(|| RouteError::MissingVariable { name: name.clone() })?;
            if !validator.is_valid(value) {
                return Err(RouteError::InvalidVariable {
                    name: name.clone(),
                    value: value.clone(),
                    expected: validator.as_str().to_string(),
                });
            }
            resolved.push(value.as_str());
        }

        let mut out = String::new();
        if let Some(key) = &self.query_key {
            out.push_str(&urlencoding::encode(key));
            if self.presence_only && !self.template.contains('=') {
                return Ok(out);
            }
            out.push('=');
        }
        for part in &self.reverse {
            match part {
                ReversePart::Literal(text) => out.push_str(text),
                ReversePart::Var(i) if self.kind == TemplateKind::Query => {
                    out.push_str(&urlencoding::encode(resolved[*i]));
                }
                ReversePart::Var(i) => out.push_str(resolved[*i]),
            }
        }
        Ok(out)
    }
}

/// Top-level `{...}` spans as `(open, one-past-close)` byte offsets, or `None`
/// when braces are unbalanced. Nested braces (e.g. `{id:[0-9]{3}}`) belong to
/// the enclosing span.
fn brace_spans(s: &str) -> Option<Vec<(usize, usize)>> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, b) in s.bytes().enumerate() {
        match b {
            b'{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    spans.push((start, i + 1));
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(spans)
}

/// Literal text between variables; host literals are case-folded.
fn literal(raw: &str, kind: TemplateKind) -> String {
    match kind {
        TemplateKind::Host => raw.to_ascii_lowercase(),
        _ => raw.to_string(),
    }
}

fn anchored_validator(pattern: &str, cache: &PatternCache) -> Result<Validator, RouteError> {
    let regex = cache
        .get_or_compile(&format!("^(?:{pattern})$"))
        .map_err(|err| RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
    Ok(Validator::new(regex, None))
}
