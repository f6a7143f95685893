//! Compiled path patterns and the parameters they extract.

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::routing::error::{RouteError, RouteResult};
use crate::routing::key::NamedKey;
use crate::routing::parser::{collapse_slashes, compile_path, CompileOptions};

/// A path spec compiled into an anchored regex plus its parameter slots.
///
/// `slots[i]` describes capture group `i + 1`.
#[derive(Debug, Clone)]
pub struct PathPattern {
    spec: String,
    regex: Regex,
    slots: Vec<Option<NamedKey>>,
}

impl PathPattern {
    /// Compile `spec`, failing on unbalanced groups or invalid inline regex.
    pub fn compile(spec: &str, options: CompileOptions) -> RouteResult<Self> {
        let compiled = compile_path(spec, options)?;

        let regex = RegexBuilder::new(&format!("^(?:{})$", compiled.pattern))
            .case_insensitive(!options.case_sensitive)
            .build()
            .map_err(|source| RouteError::InvalidPattern {
                path: spec.to_string(),
                source,
            })?;

        let groups = regex.captures_len() - 1;
        if groups != compiled.slots.len() {
            return Err(RouteError::SlotMismatch {
                path: spec.to_string(),
                slots: compiled.slots.len(),
                groups,
            });
        }

        Ok(Self {
            spec: spec.to_string(),
            regex,
            slots: compiled.slots,
        })
    }

    /// Full-string match of `path`, collapsing repeated slashes first.
    pub fn captures(&self, path: &str) -> Option<PathParams> {
        let path = collapse_slashes(path);
        let caps = self.regex.captures(&path)?;

        let mut params = PathParams::default();
        for (index, slot) in self.slots.iter().enumerate() {
            // Optional groups that did not participate are skipped.
            let Some(value) = caps.get(index + 1) else {
                continue;
            };
            match slot {
                Some(key) => params.push_named(key.name(), value.as_str()),
                None => params.splat.push(value.as_str().to_string()),
            }
        }

        Some(params)
    }

    /// True when the pattern captures anything.
    pub fn is_dynamic(&self) -> bool {
        !self.slots.is_empty()
    }

    /// The path spec as declared.
    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// The anchored regex source.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn slots(&self) -> &[Option<NamedKey>] {
        &self.slots
    }
}

/// Values captured under one parameter name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NamedParam {
    pub name: String,
    pub values: Vec<String>,
}

/// Parameters extracted from a matched path.
///
/// Named parameters keep first-seen order and collect repeated names;
/// lookups ignore ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathParams {
    named: Vec<NamedParam>,
    splat: Vec<String>,
}

impl PathParams {
    fn push_named(&mut self, name: &str, value: &str) {
        match self
            .named
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
        {
            Some(param) => param.values.push(value.to_string()),
            None => self.named.push(NamedParam {
                name: name.to_string(),
                values: vec![value.to_string()],
            }),
        }
    }

    /// First value captured under `name`.
    ///
    /// An optional parameter whose group did not participate is absent,
    /// so this returns `None` rather than an empty value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// Every value captured under `name`, in capture order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.named
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.values.as_slice())
            .unwrap_or(&[])
    }

    pub fn named(&self) -> &[NamedParam] {
        &self.named
    }

    pub fn splat(&self, index: usize) -> Option<&str> {
        self.splat.get(index).map(String::as_str)
    }

    pub fn splats(&self) -> &[String] {
        &self.splat
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.splat.is_empty()
    }
}
