//! Typed parameter binding from path captures and the query string.

use std::fmt;

use thiserror::Error;

/// Where a handler argument is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource<'a> {
    /// A `:name` path parameter.
    Path(&'a str),
    /// The n-th anonymous capture.
    Splat(usize),
    /// A query-string parameter.
    Query(&'a str),
    /// Path parameter if captured, otherwise the query string.
    Any(&'a str),
}

impl fmt::Display for ParamSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamSource::Path(name) => write!(f, "path parameter '{name}'"),
            ParamSource::Splat(index) => write!(f, "splat #{index}"),
            ParamSource::Query(name) => write!(f, "query parameter '{name}'"),
            ParamSource::Any(name) => write!(f, "parameter '{name}'"),
        }
    }
}

/// Binding failures. Handlers usually surface these with `?`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("missing {0}")]
    Missing(String),

    #[error("{source_name} value '{value}' is not a valid {target}: {reason}")]
    Invalid {
        source_name: String,
        value: String,
        target: &'static str,
        reason: String,
    },
}

/// A single scalar parsed from one raw value.
pub trait ParamValue: Sized {
    const TARGET: &'static str;

    fn parse_value(raw: &str) -> Result<Self, String>;
}

/// A handler argument built from every raw value found for a source.
pub trait FromParam: Sized {
    fn from_values(source: &str, values: &[&str]) -> Result<Self, BindError>;
}

fn parse_one<T: ParamValue>(source: &str, raw: &str) -> Result<T, BindError> {
    T::parse_value(raw).map_err(|reason| BindError::Invalid {
        source_name: source.to_string(),
        value: raw.to_string(),
        target: T::TARGET,
        reason,
    })
}

macro_rules! impl_param {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ParamValue for $ty {
                const TARGET: &'static str = stringify!($ty);

                fn parse_value(raw: &str) -> Result<Self, String> {
                    raw.trim().parse::<$ty>().map_err(|e| e.to_string())
                }
            }

            impl FromParam for $ty {
                fn from_values(source: &str, values: &[&str]) -> Result<Self, BindError> {
                    let raw = values
                        .first()
                        .ok_or_else(|| BindError::Missing(source.to_string()))?;
                    parse_one(source, raw)
                }
            }
        )*
    };
}

impl_param!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char);

impl ParamValue for String {
    const TARGET: &'static str = "String";

    fn parse_value(raw: &str) -> Result<Self, String> {
        Ok(raw.to_string())
    }
}

impl FromParam for String {
    fn from_values(source: &str, values: &[&str]) -> Result<Self, BindError> {
        values
            .first()
            .map(|raw| raw.to_string())
            .ok_or_else(|| BindError::Missing(source.to_string()))
    }
}

impl ParamValue for bool {
    const TARGET: &'static str = "bool";

    /// Accepts `true/false`, `1/0`, `on/off` and `yes/no`, ignoring case.
    fn parse_value(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Ok(true),
            "false" | "0" | "off" | "no" => Ok(false),
            other => Err(format!("expected a boolean, got '{other}'")),
        }
    }
}

impl FromParam for bool {
    fn from_values(source: &str, values: &[&str]) -> Result<Self, BindError> {
        let raw = values
            .first()
            .ok_or_else(|| BindError::Missing(source.to_string()))?;
        parse_one(source, raw)
    }
}

impl<T: ParamValue> FromParam for Option<T> {
    fn from_values(source: &str, values: &[&str]) -> Result<Self, BindError> {
        match values.first() {
            None => Ok(None),
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) => parse_one(source, raw).map(Some),
        }
    }
}

impl<T: ParamValue> FromParam for Vec<T> {
    fn from_values(source: &str, values: &[&str]) -> Result<Self, BindError> {
        values.iter().map(|raw| parse_one(source, raw)).collect()
    }
}
