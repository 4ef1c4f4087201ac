//! Canonical route keys
//!
//! A route key identifies one exposed route by HTTP method and route pattern,
//! rendered as `METHOD:/path/:param`. The pattern is the router's template, never
//! the concrete request path, so one key covers every instance of a parameterized
//! route.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MicrofinError;

/// Matches actix-style `{name}` and `{name:regex}` segments.
static TEMPLATE_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)(?::[^/]*)?\}").expect("Invalid regex pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    method: String,
    path: String,
}

impl RouteKey {
    /// Builds a normalized key: method uppercased, template parameters rewritten
    /// to `:name`, trailing slashes stripped. An empty path becomes `/`.
    pub fn new(method: &str, path: &str) -> Self {
        let method = method.trim().to_ascii_uppercase();
        let path = TEMPLATE_PARAM.replace_all(path.trim(), ":$1");
        let trimmed = path.trim_end_matches('/');

        let path = if trimmed.is_empty() {
            "/".to_string()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };

        Self { method, path }
    }

    /// Builds a key from a base path (e.g. a scope prefix) and a route pattern.
    pub fn with_base(method: &str, base_path: &str, pattern: &str) -> Self {
        let base = base_path.trim_end_matches('/');
        if pattern.is_empty() || pattern.starts_with('/') {
            Self::new(method, &format!("{base}{pattern}"))
        } else {
            Self::new(method, &format!("{base}/{pattern}"))
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Display for RouteKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.method, self.path)
    }
}

impl FromStr for RouteKey {
    type Err = MicrofinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (method, path) = s
            .split_once(':')
            .ok_or_else(|| MicrofinError::InvalidRouteKey(s.to_string()))?;

        if method.trim().is_empty() || !method.trim().chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(MicrofinError::InvalidRouteKey(s.to_string()));
        }

        Ok(RouteKey::new(method, path))
    }
}

impl Serialize for RouteKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RouteKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
