//! Runtime values passed to and returned from plugin operations

use crate::error::{DispatchError, PluginResult};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A value crossing the plugin boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PluginValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<PluginValue>),
    Tuple(Vec<PluginValue>),
    Set(BTreeSet<String>),
    Map(BTreeMap<String, String>),
}

/// Runtime type tag of a `PluginValue`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    None,
    Bool,
    Int,
    Float,
    Str,
    List,
    Tuple,
    Set,
    Map,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::List => "list",
            Self::Tuple => "tuple",
            Self::Set => "set",
            Self::Map => "map",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PluginValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::None => ValueKind::None,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Str(_) => ValueKind::Str,
            Self::List(_) => ValueKind::List,
            Self::Tuple(_) => ValueKind::Tuple,
            Self::Set(_) => ValueKind::Set,
            Self::Map(_) => ValueKind::Map,
        }
    }

    /// List of strings.
    pub fn str_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(|s| Self::Str(s.into())).collect())
    }

    /// Tuple of the given values.
    pub fn tuple<I: IntoIterator<Item = PluginValue>>(items: I) -> Self {
        Self::Tuple(items.into_iter().collect())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Items of a list or tuple.
    pub fn as_items(&self) -> Option<&[PluginValue]> {
        match self {
            Self::List(items) | Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// String items of a list, tuple or set; `None` if any item is not a string.
    pub fn to_strings(&self) -> Option<Vec<String>> {
        match self {
            Self::Set(items) => Some(items.iter().cloned().collect()),
            Self::List(items) | Self::Tuple(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => None,
        }
    }
}

impl From<&str> for PluginValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for PluginValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for PluginValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for PluginValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for PluginValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<BTreeMap<String, String>> for PluginValue {
    fn from(value: BTreeMap<String, String>) -> Self {
        Self::Map(value)
    }
}

impl From<BTreeSet<String>> for PluginValue {
    fn from(value: BTreeSet<String>) -> Self {
        Self::Set(value)
    }
}

impl<T: Into<PluginValue>> From<Option<T>> for PluginValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::None)
    }
}

/// Positional and keyword arguments of one operation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<PluginValue>,
    pub keyword: BTreeMap<String, PluginValue>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call with the given positional arguments.
    pub fn from_positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<PluginValue>,
    {
        Self {
            positional: values.into_iter().map(Into::into).collect(),
            keyword: BTreeMap::new(),
        }
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<PluginValue>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a keyword argument.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<PluginValue>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, index: usize) -> Option<&PluginValue> {
        self.positional.get(index)
    }

    pub fn keyword(&self, name: &str) -> Option<&PluginValue> {
        self.keyword.get(name)
    }

    /// String argument looked up by keyword, then by position.
    pub fn str_arg(&self, index: usize, name: &str) -> PluginResult<&str> {
        self.keyword(name)
            .or_else(|| self.get(index))
            .and_then(PluginValue::as_str)
            .ok_or_else(|| {
                DispatchError::invalid_argument(format!(
                    "expected string argument '{}' at position {}",
                    name, index
                ))
            })
    }

    /// String-map keyword argument, e.g. program settings.
    pub fn map_kwarg(&self, name: &str) -> PluginResult<&BTreeMap<String, String>> {
        self.keyword(name)
            .and_then(PluginValue::as_map)
            .ok_or_else(|| {
                DispatchError::invalid_argument(format!("expected map keyword argument '{}'", name))
            })
    }

    /// All positional arguments as strings.
    pub fn positional_strs(&self) -> PluginResult<Vec<&str>> {
        self.positional
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_str().ok_or_else(|| {
                    DispatchError::invalid_argument(format!(
                        "positional argument {} must be a string, got {}",
                        i,
                        v.kind()
                    ))
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
