//! Glob matching for interceptor scopes and static asset prefixes.
//!
//! # Responsibilities
//! - Match `*` (any run, including empty) and `?` (one character) globs
//! - Combine several globs with OR semantics
//!
//! # Design Decisions
//! - Globs are pre-split into chars once; matching is a linear backtracking
//!   scan with no regex compilation and no failure path
//! - Case-insensitive by default, like request-path matching

/// Trait for matching text against a precompiled condition.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if `text` satisfies this condition.
    fn matches(&self, text: &str) -> bool;
}

/// A `*`/`?` glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardMatcher {
    source: String,
    pattern: Vec<char>,
    case_sensitive: bool,
}

impl WildcardMatcher {
    pub fn new(pattern: impl Into<String>, case_sensitive: bool) -> Self {
        let source = pattern.into();
        let pattern = fold(&source, case_sensitive).collect();
        Self {
            source,
            pattern,
            case_sensitive,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

fn fold(text: &str, case_sensitive: bool) -> impl Iterator<Item = char> + '_ {
    text.chars().map(move |c| {
        if case_sensitive {
            c
        } else {
            c.to_ascii_lowercase()
        }
    })
}

impl Matcher for WildcardMatcher {
    fn matches(&self, text: &str) -> bool {
        let text: Vec<char> = fold(text, self.case_sensitive).collect();
        let pattern = &self.pattern;

        let mut p = 0;
        let mut t = 0;
        // Position after the last `*`, and the text index it resumed from.
        let mut star: Option<(usize, usize)> = None;

        while t < text.len() {
            if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
                p += 1;
                t += 1;
            } else if p < pattern.len() && pattern[p] == '*' {
                star = Some((p + 1, t));
                p += 1;
            } else if let Some((after_star, resumed)) = star {
                p = after_star;
                t = resumed + 1;
                star = Some((after_star, t));
            } else {
                return false;
            }
        }

        while p < pattern.len() && pattern[p] == '*' {
            p += 1;
        }

        p == pattern.len()
    }
}

/// Matches when any inner matcher does.
#[derive(Debug, Default)]
pub struct AnyMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AnyMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    /// Case-insensitive globs.
    pub fn globs<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            patterns
                .into_iter()
                .map(|p| Box::new(WildcardMatcher::new(p, false)) as Box<dyn Matcher>)
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl Matcher for AnyMatcher {
    fn matches(&self, text: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(text))
    }
}
