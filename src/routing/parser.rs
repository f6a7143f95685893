//! Path spec compiler.
//!
//! # Responsibilities
//! - Translate a declarative path spec into a regex source string
//! - Produce one parameter slot per capture group, in capture order
//! - Normalize filesystem-style paths used to compose route prefixes
//!
//! # Grammar
//! ```text
//! /users                 literal segment
//! /users/:id             named parameter            → /users/(?:([^/]+?))
//! /users/:id?            optional named parameter   → /users(?:/([^/]+?))?
//! /users/:id(\d+)        constrained parameter      → /users/(?:(\d+))
//! /report.:format        dot-prefixed parameter     → /report(?:\.([^/.]+?))
//! /files/:path*          named rest of path         → /files/(?:(.*))
//! /users/(\d+)           anonymous regex group      → /users/(\d+)
//! /assets/*              anonymous wildcard         → /assets/(.*)
//! ```
//!
//! # Design Decisions
//! - Named and anonymous groups may be interleaved freely; slots are
//!   assigned by walking the final pattern, not by token order
//! - Inline constraints are copied verbatim; the pattern is compiled once
//! - Only `.` and `*` at group depth 0 are rewritten, group bodies are
//!   left exactly as written

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::routing::error::{RouteError, RouteResult};
use crate::routing::key::NamedKey;

/// Flags that change how a path spec compiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// `/User` and `/user` are different routes.
    pub case_sensitive: bool,
    /// `/user` and `/user/` are different routes.
    pub strict: bool,
}

/// A compiled path spec before it is handed to the regex engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSource {
    /// Unanchored regex source.
    pub pattern: String,
    /// One entry per capture group; `None` marks an anonymous capture.
    pub slots: Vec<Option<NamedKey>>,
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        Regex::new(r"(/)?(\.)?:(\w+)(\(.*?\))?(\?)?(\*)?").expect("token grammar is a valid regex")
    })
}

/// Compile a path spec into a regex source and its parameter slots.
pub fn compile_path(spec: &str, options: CompileOptions) -> RouteResult<CompiledSource> {
    let mut source = spec.to_string();

    if !options.strict && !source.ends_with("/?") {
        // `/a/` must become `/a/?`, not `/a//?`
        source.push_str(if source.ends_with('/') { "?" } else { "/?" });
    }

    let Substituted { source, keys, mut wrappers } = substitute_named(spec, &source)?;
    let pattern = rewrite_literals(spec, &source, &mut wrappers)?;
    let slots = assign_slots(spec, &pattern, keys, &wrappers)?;

    Ok(CompiledSource { pattern, slots })
}

/// Output of [`substitute_named`]: the rewritten source plus, for each
/// named key, the byte offset of the wrapper group emitted for it.
struct Substituted {
    source: String,
    keys: Vec<NamedKey>,
    wrappers: Vec<usize>,
}

/// Replace every top-level `:name` token with its capture fragment.
fn substitute_named(spec: &str, source: &str) -> RouteResult<Substituted> {
    let pieces = lex(source).ok_or_else(|| unbalanced(spec, source))?;

    // Byte offsets of plain characters sitting outside any group.
    let mut shallow = vec![false; source.len() + 1];
    let mut depth = 0usize;
    for (at, piece) in &pieces {
        match piece {
            Piece::Open => depth += 1,
            Piece::Close => depth = depth.saturating_sub(1),
            Piece::Char(_) if depth == 0 => shallow[*at] = true,
            _ => {}
        }
    }

    let mut out = String::with_capacity(source.len() + 16);
    let mut keys = Vec::new();
    let mut wrappers = Vec::new();
    let mut copied = 0;

    for caps in token_regex().captures_iter(source) {
        let Some(whole) = caps.get(0) else { continue };
        let start = whole.start();
        let colon = caps.get(3).map_or(start, |m| m.start() - 1);

        // A `:` inside a group (e.g. `(?:a|b)`) is regex syntax.
        if !shallow[colon] {
            continue;
        }

        // An escaped lead character (`\.:ext`) stays literal.
        let (lead, slash, dot) = if shallow[start] {
            ("", caps.get(1).is_some(), caps.get(2).is_some())
        } else {
            (&source[start..colon], false, false)
        };

        let (fragment, wrapper) = render_named(
            lead,
            slash,
            dot,
            caps.get(4).map(|m| m.as_str()),
            caps.get(5).is_some(),
            caps.get(6).is_some(),
        );

        out.push_str(&source[copied..start]);
        wrappers.push(out.len() + wrapper);
        out.push_str(&fragment);
        copied = whole.end();
        keys.push(NamedKey::new(&caps[3], caps.get(5).is_some()));
    }
    out.push_str(&source[copied..]);

    Ok(Substituted { source: out, keys, wrappers })
}

/// Render one named token. Also returns the offset of its wrapper `(?:`.
fn render_named(
    lead: &str,
    slash: bool,
    dot: bool,
    constraint: Option<&str>,
    optional: bool,
    rest: bool,
) -> (String, usize) {
    let slash = if slash { "/" } else { "" };
    let prefix = if dot { r"\." } else { "" };
    let body = match constraint {
        Some(constraint) => constraint,
        None if rest => "(.*)",
        None if dot => "([^/.]+?)",
        None => "([^/]+?)",
    };

    if optional {
        (format!("{lead}(?:{slash}{prefix}{body})?"), lead.len())
    } else {
        (format!("{lead}{slash}(?:{prefix}{body})"), lead.len() + slash.len())
    }
}

/// Escape literal dots and expand bare `*` wildcards outside of groups.
///
/// `wrappers` are moved along with the text they point at.
fn rewrite_literals(spec: &str, source: &str, wrappers: &mut [usize]) -> RouteResult<String> {
    let pieces = lex(source).ok_or_else(|| unbalanced(spec, source))?;
    let mut out = String::with_capacity(source.len() + 8);
    let mut depth = 0usize;
    let mut pending = wrappers.iter_mut().peekable();

    for (at, piece) in pieces {
        match piece {
            Piece::Char('.') if depth == 0 => out.push_str(r"\."),
            Piece::Char('*') if depth == 0 => out.push_str("(.*)"),
            Piece::Char(c) => out.push(c),
            Piece::Verbatim(text) => out.push_str(text),
            Piece::Open => {
                if let Some(offset) = pending.next_if(|offset| **offset == at) {
                    *offset = out.len();
                }
                depth += 1;
                out.push('(');
            }
            Piece::Close => {
                depth = depth.saturating_sub(1);
                out.push(')');
            }
        }
    }

    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opener {
    Capturing,
    NonCapturing,
    /// The wrapper emitted for a named token.
    Named,
}

/// Align named keys with the capture groups of the final pattern.
///
/// Every top-level group is classified: a wrapper emitted by
/// [`substitute_named`] (located by offset) carries the next named key,
/// a capturing group is anonymous, and a hand-written non-capturing
/// group only contributes the anonymous captures nested inside it.
fn assign_slots(
    spec: &str,
    pattern: &str,
    keys: Vec<NamedKey>,
    wrappers: &[usize],
) -> RouteResult<Vec<Option<NamedKey>>> {
    let pieces = lex(pattern).ok_or_else(|| unbalanced(spec, pattern))?;

    let mut groups: Vec<(Opener, usize)> = Vec::new();
    let mut current: Option<(Opener, usize)> = None;
    let mut depth = 0usize;

    for (index, (at, piece)) in pieces.iter().enumerate() {
        match piece {
            Piece::Open => {
                let opener = opener_of(&pieces[index + 1..]);
                if depth == 0 {
                    let opener = if wrappers.contains(at) { Opener::Named } else { opener };
                    let own = usize::from(opener == Opener::Capturing);
                    current = Some((opener, own));
                } else if opener == Opener::Capturing {
                    if let Some((_, inner)) = current.as_mut() {
                        *inner += 1;
                    }
                }
                depth += 1;
            }
            Piece::Close => {
                if depth == 0 {
                    return Err(unbalanced(spec, pattern));
                }
                depth -= 1;
                if depth == 0 {
                    groups.extend(current.take());
                }
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(unbalanced(spec, pattern));
    }

    let mut keys = keys.into_iter();
    let mut slots = Vec::new();

    for (opener, captures) in groups {
        match opener {
            Opener::Named => {
                let Some(key) = keys.next() else { continue };
                if captures == 0 {
                    return Err(RouteError::OrphanKey {
                        path: spec.to_string(),
                        name: key.name().to_string(),
                    });
                }
                slots.push(Some(key));
                slots.extend((1..captures).map(|_| None));
            }
            Opener::Capturing | Opener::NonCapturing => {
                slots.extend((0..captures).map(|_| None));
            }
        }
    }

    if let Some(orphan) = keys.next() {
        return Err(RouteError::OrphanKey {
            path: spec.to_string(),
            name: orphan.name().to_string(),
        });
    }

    Ok(slots)
}

/// Classify a group by the pieces that follow its `(`.
fn opener_of(rest: &[(usize, Piece<'_>)]) -> Opener {
    let mut next = rest.iter().map(|(_, piece)| piece);
    match (next.next(), next.next(), next.next()) {
        (Some(Piece::Char('?')), Some(Piece::Char('P')), Some(Piece::Char('<'))) => Opener::Capturing,
        (Some(Piece::Char('?')), Some(Piece::Char('<')), _) => Opener::Capturing,
        (Some(Piece::Char('?')), _, _) => Opener::NonCapturing,
        _ => Opener::Capturing,
    }
}

fn unbalanced(spec: &str, pattern: &str) -> RouteError {
    RouteError::UnbalancedGroup {
        path: spec.to_string(),
        pattern: pattern.to_string(),
    }
}

/// Structural unit of a regex source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece<'a> {
    Char(char),
    /// An escape sequence or a whole character class, copied as-is.
    Verbatim(&'a str),
    Open,
    Close,
}

/// Split a regex source into pieces, keyed by byte offset.
///
/// Returns `None` when a character class is never closed.
fn lex(source: &str) -> Option<Vec<(usize, Piece<'_>)>> {
    let mut pieces = Vec::with_capacity(source.len());
    let mut chars = source.char_indices().peekable();

    while let Some((at, c)) = chars.next() {
        let piece = match c {
            '\\' => match chars.next() {
                Some((next_at, next)) => Piece::Verbatim(&source[at..next_at + next.len_utf8()]),
                None => Piece::Char('\\'),
            },
            '[' => {
                let end = class_end(source, at)?;
                while chars.peek().is_some_and(|&(i, _)| i < end) {
                    chars.next();
                }
                Piece::Verbatim(&source[at..end])
            }
            '(' => Piece::Open,
            ')' => Piece::Close,
            other => Piece::Char(other),
        };
        pieces.push((at, piece));
    }

    Some(pieces)
}

/// Byte offset just past the `]` closing the class opened at `start`.
fn class_end(source: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    let mut chars = source[start..].char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' => {
                depth += 1;
                // `[]...]` and `[^]...]` open with a literal bracket
                if chars.peek().is_some_and(|&(_, n)| n == '^') {
                    chars.next();
                }
                if chars.peek().is_some_and(|&(_, n)| n == ']') {
                    chars.next();
                }
            }
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// Canonicalize a slash-delimited path.
///
/// Resolves `.` and `..`, collapses repeated slashes, and keeps a leading
/// and a trailing slash when the input had them. Blank input yields `""`.
pub fn normalize_path(path: &str) -> String {
    if path.trim().is_empty() {
        return String::new();
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/').filter(|s| !s.trim().is_empty()) {
        match segment {
            "." => {}
            ".." => {
                if segments.last().map_or(true, |last| *last == "..") {
                    segments.push(segment);
                } else {
                    segments.pop();
                }
            }
            other => segments.push(other),
        }
    }

    let mut out = String::with_capacity(path.len());
    if path.starts_with('/') {
        out.push('/');
    }
    out.push_str(&segments.join("/"));
    if path.ends_with('/') && !out.ends_with('/') {
        out.push('/');
    }

    collapse_slashes(&out)
}

/// Compose a base prefix and a route path into one normalized spec.
pub fn join_paths(base: &str, path: &str) -> String {
    let base = with_leading_slash(base);
    let path = with_leading_slash(path);
    normalize_path(&format!("{base}{path}"))
}

fn with_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Replace runs of `/` with a single slash.
pub fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(spec: &str) -> CompiledSource {
        compile_path(spec, CompileOptions::default()).unwrap()
    }

    fn names(slots: &[Option<NamedKey>]) -> Vec<Option<&str>> {
        slots.iter().map(|s| s.as_ref().map(NamedKey::name)).collect()
    }

    #[test]
    fn test_literal_path() {
        let c = compile("/index");
        assert_eq!(c.pattern, "/index/?");
        assert!(c.slots.is_empty());
    }

    #[test]
    fn test_trailing_slash_is_not_doubled() {
        assert_eq!(compile("/index/").pattern, "/index/?");
        assert_eq!(compile("/index/?").pattern, "/index/?");
    }

    #[test]
    fn test_strict_keeps_path_as_written() {
        let strict = CompileOptions { strict: true, ..Default::default() };
        assert_eq!(compile_path("/users", strict).unwrap().pattern, "/users");
    }

    #[test]
    fn test_named_parameter() {
        let c = compile("/index/:id");
        assert_eq!(c.pattern, "/index/(?:([^/]+?))/?");
        assert_eq!(names(&c.slots), vec![Some("id")]);
        assert!(!c.slots[0].as_ref().unwrap().is_optional());
    }

    #[test]
    fn test_optional_parameter_swallows_slash() {
        let c = compile("/index/:id?");
        assert_eq!(c.pattern, "/index(?:/([^/]+?))?/?");
        assert!(c.slots[0].as_ref().unwrap().is_optional());
    }

    #[test]
    fn test_inline_constraint_is_verbatim() {
        let c = compile(r"/index/:id(\d+)");
        assert_eq!(c.pattern, r"/index/(?:(\d+))/?");
    }

    #[test]
    fn test_dot_prefixed_parameter() {
        let c = compile("/report.:format");
        assert_eq!(c.pattern, r"/report(?:\.([^/.]+?))/?");
        assert_eq!(names(&c.slots), vec![Some("format")]);
    }

    #[test]
    fn test_bare_wildcard_is_anonymous() {
        let c = compile("/assets/*");
        assert_eq!(c.pattern, "/assets/(.*)/?");
        assert_eq!(names(&c.slots), vec![None]);
    }

    #[test]
    fn test_literal_dot_is_escaped() {
        assert_eq!(compile("/favicon.ico").pattern, r"/favicon\.ico/?");
    }

    #[test]
    fn test_mixed_slots_are_reindexed() {
        let c = compile(r"/user/:id/(\d+)/:bid");
        assert_eq!(names(&c.slots), vec![Some("id"), None, Some("bid")]);

        let c = compile(r"/user/(\d+)/:id/:bid");
        assert_eq!(names(&c.slots), vec![None, Some("id"), Some("bid")]);
    }

    #[test]
    fn test_colon_inside_group_is_regex_syntax() {
        let c = compile("/x/(?:a|b)/:id");
        assert_eq!(names(&c.slots), vec![Some("id")]);
        assert!(c.pattern.starts_with("/x/(?:a|b)"));
    }

    #[test]
    fn test_hand_written_wrapper_stays_anonymous() {
        let c = compile("/x/(?:(a))/:id");
        assert_eq!(names(&c.slots), vec![None, Some("id")]);

        let c = compile("/x/:id/(?:(a)|(b))");
        assert_eq!(names(&c.slots), vec![Some("id"), None, None]);
    }

    #[test]
    fn test_wrapper_offsets_survive_literal_rewrite() {
        let c = compile("/a.b/*/:name.:ext");
        assert_eq!(names(&c.slots), vec![None, Some("name"), Some("ext")]);
    }

    #[test]
    fn test_nested_anonymous_captures() {
        let c = compile("/x/((a)|(b))");
        assert_eq!(names(&c.slots), vec![None, None, None]);
    }

    #[test]
    fn test_unbalanced_group_fails() {
        assert!(matches!(
            compile_path(r"/a/(\d+", CompileOptions::default()),
            Err(RouteError::UnbalancedGroup { .. })
        ));
        assert!(matches!(
            compile_path(r"/a/\d+)", CompileOptions::default()),
            Err(RouteError::UnbalancedGroup { .. })
        ));
    }

    #[test]
    fn test_constraint_without_capture_fails() {
        assert!(matches!(
            compile_path("/a/:id(?:x)", CompileOptions::default()),
            Err(RouteError::OrphanKey { .. })
        ));
    }

    #[test]
    fn test_escaped_parens_are_not_groups() {
        let c = compile(r"/a/\(literal\)/:id");
        assert_eq!(names(&c.slots), vec![Some("id")]);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/a/./b/../c"), "/a/c");
        assert_eq!(normalize_path("//a///b/"), "/a/b/");
        assert_eq!(normalize_path("a/../../b"), "../b");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("   "), "");
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/", "/users"), "/users");
        assert_eq!(join_paths("api", "users/:id"), "/api/users/:id");
        assert_eq!(join_paths("/api/", "/"), "/api/");
    }
}
