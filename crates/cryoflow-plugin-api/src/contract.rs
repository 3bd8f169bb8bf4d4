//! Capability contracts
//!
//! A contract names every operation a plugin category must offer together with
//! the shape of the value each operation returns: how many items, which outer
//! container and which element kinds.

use crate::value::{PluginValue, ValueKind};
use cryoflow_core::Category;
use std::collections::BTreeMap;
use std::fmt;

/// Number of returned items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Any,
}

/// Outer container of a returned value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// Not checked
    None,
    Str,
    List,
    Tuple,
    Set,
    Map,
}

impl Container {
    fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::None => None,
            Self::Str => Some(ValueKind::Str),
            Self::List => Some(ValueKind::List),
            Self::Tuple => Some(ValueKind::Tuple),
            Self::Set => Some(ValueKind::Set),
            Self::Map => Some(ValueKind::Map),
        }
    }
}

/// Expected element kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementSpec {
    /// Not checked
    None,
    /// Every element has this kind
    Uniform(ValueKind),
    /// One kind per tuple slot
    PerSlot(Vec<ValueKind>),
}

/// Declared return shape of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub arity: Arity,
    pub container: Container,
    pub elements: ElementSpec,
}

impl Shape {
    pub fn new(arity: Arity, container: Container, elements: ElementSpec) -> Self {
        Self {
            arity,
            container,
            elements,
        }
    }

    /// Anything goes: `(n, -, -)`.
    pub fn unchecked() -> Self {
        Self::new(Arity::Any, Container::None, ElementSpec::None)
    }

    /// A single string: `(1, str, str)`.
    pub fn string() -> Self {
        Self::new(Arity::Exactly(1), Container::Str, ElementSpec::Uniform(ValueKind::Str))
    }

    /// A list of strings with a fixed arity.
    pub fn string_list(arity: Arity) -> Self {
        Self::new(arity, Container::List, ElementSpec::Uniform(ValueKind::Str))
    }

    /// A string map: `(1, -, map)`.
    pub fn string_map() -> Self {
        Self::new(Arity::Exactly(1), Container::None, ElementSpec::Uniform(ValueKind::Map))
    }

    /// A tuple of `n` values of one kind.
    pub fn uniform_tuple(n: usize, kind: ValueKind) -> Self {
        Self::new(Arity::Exactly(n), Container::Tuple, ElementSpec::Uniform(kind))
    }

    /// A tuple with one kind per slot.
    pub fn tuple(kinds: Vec<ValueKind>) -> Self {
        Self::new(
            Arity::Exactly(kinds.len()),
            Container::Tuple,
            ElementSpec::PerSlot(kinds),
        )
    }

    /// Checks a returned value against this shape.
    pub fn matches(&self, value: &PluginValue) -> bool {
        let actual = ActualShape::of(value);

        if let Arity::Exactly(n) = self.arity {
            if actual.arity != n {
                return false;
            }
        }

        if let Some(kind) = self.container.kind() {
            if actual.container != kind {
                return false;
            }
        }

        match (&self.elements, value) {
            (ElementSpec::None, _) => true,
            (ElementSpec::Uniform(kind), _) if self.container == Container::None => {
                actual.container == *kind
            }
            (ElementSpec::Uniform(kind), PluginValue::List(_))
            | (ElementSpec::Uniform(kind), PluginValue::Tuple(_))
            | (ElementSpec::Uniform(kind), PluginValue::Set(_)) => {
                actual.elements.iter().all(|k| k == kind)
            }
            (ElementSpec::Uniform(kind), PluginValue::Str(_)) => *kind == ValueKind::Str,
            (ElementSpec::Uniform(_), _) => true,
            (ElementSpec::PerSlot(kinds), PluginValue::Tuple(_)) => actual.elements == *kinds,
            (ElementSpec::PerSlot(_), _) => false,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arity {
            Arity::Exactly(n) => write!(f, "({}, ", n)?,
            Arity::Any => f.write_str("(n, ")?,
        }
        match self.container.kind() {
            Some(kind) => write!(f, "{}, ", kind)?,
            None => f.write_str("-, ")?,
        }
        match &self.elements {
            ElementSpec::None => f.write_str("-)"),
            ElementSpec::Uniform(kind) => write!(f, "{})", kind),
            ElementSpec::PerSlot(kinds) => write!(f, "[{}])", join_kinds(kinds)),
        }
    }
}

/// Observed shape of a returned value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActualShape {
    pub arity: usize,
    pub container: ValueKind,
    pub elements: Vec<ValueKind>,
}

impl ActualShape {
    pub fn of(value: &PluginValue) -> Self {
        let (arity, elements) = match value {
            PluginValue::Tuple(items) => (items.len(), items.iter().map(PluginValue::kind).collect()),
            PluginValue::List(items) => (1, items.iter().map(PluginValue::kind).collect()),
            PluginValue::Set(items) => (1, vec![ValueKind::Str; items.len()]),
            _ => (1, Vec::new()),
        };

        Self {
            arity,
            container: value.kind(),
            elements,
        }
    }
}

impl fmt::Display for ActualShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, [{}])",
            self.arity,
            self.container,
            join_kinds(&self.elements)
        )
    }
}

fn join_kinds(kinds: &[ValueKind]) -> String {
    kinds
        .iter()
        .map(ValueKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Operation names and shapes a plugin must honour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    name: String,
    operations: BTreeMap<String, Shape>,
}

/// Processing stages of a full external program
pub const STAGES: [&str; 4] = ["first", "second", "third", "final"];

impl Contract {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operations: BTreeMap::new(),
        }
    }

    /// Declares one operation.
    pub fn operation(mut self, name: impl Into<String>, shape: Shape) -> Self {
        self.operations.insert(name.into(), shape);
        self
    }

    /// Contract of a plugin category.
    pub fn for_category(category: Category) -> Self {
        let list = || Shape::string_list(Arity::Exactly(1));

        let contract = Self::new(category.as_str());
        match category {
            Category::Software => contract
                .operation("get_meta_info", Shape::string_map())
                .operation("get_frames", Shape::string_list(Arity::Any))
                .operation("get_number_of_frames", Shape::unchecked())
                .operation("get_meta_data", Shape::unchecked())
                .operation("get_command", Shape::unchecked()),
            Category::Motion => contract
                .operation(
                    "get_frame_range",
                    Shape::tuple(vec![ValueKind::Int, ValueKind::Int]),
                )
                .operation("get_import_data", list())
                .operation("get_command", Shape::string()),
            Category::Ctf => contract
                .operation("get_import_data", list())
                .operation("get_command", Shape::string())
                .operation("get_output_files", list()),
            Category::Picking => contract
                .operation("get_filter_command", Shape::string())
                .operation("get_import_data", list())
                .operation("get_command", Shape::string()),
            Category::Compress => contract
                .operation("get_command", Shape::string())
                .operation("get_output_files", list()),
            Category::CopyExtern => contract
                .operation(
                    "extract_time_and_grid_information",
                    Shape::uniform_tuple(5, ValueKind::Str),
                )
                .operation("find_frames", list())
                .operation(
                    "check_nr_frames",
                    Shape::tuple(vec![ValueKind::Str, ValueKind::Bool]),
                )
                .operation(
                    "find_related_frames_to_jpg",
                    Shape::uniform_tuple(3, ValueKind::Str),
                )
                .operation("get_copy_command_for_frames", Shape::string())
                .operation("find_all_files", Shape::uniform_tuple(2, ValueKind::Set)),
        }
    }

    /// Lifecycle hooks of a complete external program.
    pub fn full_program() -> Self {
        let list = || Shape::string_list(Arity::Exactly(1));

        let mut contract = Self::new("full_program")
            .operation("get_content", Shape::string_map())
            .operation("get_type", Shape::string())
            .operation("get_name", Shape::string())
            .operation("get_version", Shape::string());

        for stage in STAGES {
            contract = contract
                .operation(format!("pre_{}_command", stage), list())
                .operation(format!("{}_command", stage), list())
                .operation(format!("post_{}_command", stage), list());
        }

        contract
            .operation("get_import_data", list())
            .operation("get_output_files", list())
            .operation("get_input_files", list())
            .operation("get_log_files", list())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self, operation: &str) -> Option<&Shape> {
        self.operations.get(operation)
    }

    pub fn declares(&self, operation: &str) -> bool {
        self.operations.contains_key(operation)
    }

    /// Declared operation names, sorted.
    pub fn operation_names(&self) -> Vec<String> {
        self.operations.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Shape)> {
        self.operations.iter().map(|(k, v)| (k.as_str(), v))
    }
}
