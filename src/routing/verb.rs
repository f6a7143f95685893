//! HTTP verbs understood by the route table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::routing::error::RouteError;

/// HTTP method a route is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
}

impl HttpVerb {
    /// All verbs, in declaration order.
    pub const ALL: [HttpVerb; 7] = [
        HttpVerb::Get,
        HttpVerb::Post,
        HttpVerb::Put,
        HttpVerb::Delete,
        HttpVerb::Head,
        HttpVerb::Options,
        HttpVerb::Patch,
    ];

    /// Uppercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Head => "HEAD",
            HttpVerb::Options => "OPTIONS",
            HttpVerb::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpVerb {
    type Err = RouteError;

    /// Parses a method name case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpVerb::ALL
            .iter()
            .copied()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RouteError::UnknownVerb(s.to_string()))
    }
}
