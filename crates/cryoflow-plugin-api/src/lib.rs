// Cryoflow Plugin API
// Capability contracts and contract-checked dispatch for external cryo-EM tools

pub mod contract;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod table;
pub mod value;

pub use contract::{ActualShape, Arity, Container, Contract, ElementSpec, Shape};
pub use dispatcher::{ContractDispatcher, ShapeCheck};
pub use error::{DispatchError, PluginResult};
pub use metrics::DispatchMetrics;
pub use registry::{PluginInfo, PluginRegistry};
pub use table::{FunctionTable, PluginFn};
pub use value::{CallArgs, PluginValue, ValueKind};

// Re-export core types that plugins interact with
pub use cryoflow_core::{Category, PluginSelection};

/// Plugin API version
pub const PLUGIN_API_VERSION: &str = "0.2.0";
