//! Error types for route configuration, matching and URL building.
//!
//! Three categories never mix:
//!
//! - [`RouteError`] values raised while a route is configured are stored on the
//!   [`Route`](crate::router::Route) and exposed through `get_error`. Once set,
//!   further configuration calls on that route are no-ops.
//! - [`MatchError`] is not an error in the usual sense: it classifies a failed
//!   dispatch attempt as "method not allowed" or "not found".
//! - URL building returns `Result<_, RouteError>` directly to the caller.

use thiserror::Error;

/// Configuration-time and build-time failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// A `{` was never closed, or a `}` appeared without an opening brace.
    #[error("unbalanced braces in template {template:?}")]
    UnbalancedBraces { template: String },

    /// `{}` or `{:pattern}` with no variable name.
    #[error("missing variable name in template {template:?}")]
    MissingVariableName { template: String },

    /// A constraint (or the assembled template) is not a valid regular expression.
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A variable name appears twice within a template or across a route's host and path.
    #[error("duplicate route variable {name:?}")]
    DuplicateVariable { name: String },

    /// The route name is already registered somewhere in the router tree.
    #[error("route name {name:?} already exists")]
    DuplicateRouteName { name: String },

    /// `name()` was called on a route that already has a name.
    #[error("route already has name {existing:?}, can't set {requested:?}")]
    RouteAlreadyNamed { existing: String, requested: String },

    #[error("invalid HTTP method {method:?}")]
    InvalidMethod { method: String },

    #[error("invalid header name {name:?}")]
    InvalidHeader { name: String },

    #[error("path must start with a slash, got {template:?}")]
    PathMustStartWithSlash { template: String },

    /// URL building: no value supplied for a required variable.
    #[error("missing route variable {name:?}")]
    MissingVariable { name: String },

    /// URL building: the supplied value does not satisfy the variable's constraint.
    #[error("variable {name:?} value {value:?} doesn't match, expected {expected:?}")]
    InvalidVariable {
        name: String,
        value: String,
        expected: String,
    },

    #[error("route doesn't have a host")]
    MissingHost,

    #[error("route doesn't have a path")]
    MissingPath,

    /// The substituted parts do not form a valid URI.
    #[error("built URL {url:?} is not a valid URI")]
    InvalidUrl { url: String },
}

/// Classification of a dispatch attempt that did not produce a match.
///
/// These are stable values callers branch on, not formatted messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum MatchError {
    /// Some route matched everything except the request method (405).
    #[error("method is not allowed")]
    MethodMismatch,
    /// Nothing matched (404).
    #[error("no matching route was found")]
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_offender() {
        let err = RouteError::DuplicateVariable { name: "id".into() };
        assert_eq!(err.to_string(), "duplicate route variable \"id\"");

        let err = RouteError::InvalidVariable {
            name: "page".into(),
            value: "abc".into(),
            expected: "^[0-9]+$".into(),
        };
        assert!(err.to_string().contains("\"abc\""));
        assert!(err.to_string().contains("^[0-9]+$"));
    }

    #[test]
    fn test_match_errors_are_distinct_sentinels() {
        assert_ne!(MatchError::MethodMismatch, MatchError::NotFound);
        assert_eq!(MatchError::NotFound.to_string(), "no matching route was found");
    }
}
