//! Contract-checked dispatcher
//!
//! Wraps one `FunctionTable` with the `Contract` of its category. Every call is
//! checked in order: the operation must be declared, it must be implemented,
//! and (when shape checking is on) the returned value must have the declared
//! shape.

use crate::contract::{ActualShape, Contract};
use crate::error::{DispatchError, PluginResult};
use crate::metrics::DispatchMetrics;
use crate::table::FunctionTable;
use crate::value::{CallArgs, PluginValue};
use std::sync::Arc;
use tracing::{debug, debug_span, warn};

/// Whether returned values are checked against the contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeCheck {
    Strict,
    Off,
}

impl ShapeCheck {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Self::Strict
        } else {
            Self::Off
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Strict)
    }
}

impl Default for ShapeCheck {
    /// On in debug and test builds, off in release builds.
    fn default() -> Self {
        Self::from_enabled(cfg!(debug_assertions))
    }
}

/// A plugin table bound to its contract.
#[derive(Debug, Clone)]
pub struct ContractDispatcher {
    table: Arc<FunctionTable>,
    contract: Arc<Contract>,
    shape_check: ShapeCheck,
    metrics: Arc<DispatchMetrics>,
}

impl ContractDispatcher {
    pub fn new(table: Arc<FunctionTable>, contract: Arc<Contract>) -> Self {
        Self {
            table,
            contract,
            shape_check: ShapeCheck::default(),
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    pub fn with_shape_check(mut self, shape_check: ShapeCheck) -> Self {
        self.shape_check = shape_check;
        self
    }

    /// Shares a metrics collector with other dispatchers.
    pub fn with_metrics(mut self, metrics: Arc<DispatchMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Invokes `operation` with `args`.
    ///
    /// # Errors
    ///
    /// - `UnknownOperation` if the contract does not declare `operation`
    /// - `MissingImplementation` if the table lacks it
    /// - `ContractViolation` if shape checking is on and the result has the wrong shape
    /// - any error returned by the operation itself
    pub fn dispatch(&self, operation: &str, args: &CallArgs) -> PluginResult<PluginValue> {
        let shape = self
            .contract
            .shape(operation)
            .ok_or_else(|| DispatchError::UnknownOperation {
                category: self.contract.name().to_string(),
                operation: operation.to_string(),
                valid: self.contract.operation_names(),
            })?;

        let function =
            self.table
                .get(operation)
                .ok_or_else(|| DispatchError::MissingImplementation {
                    plugin: self.table.name().to_string(),
                    operation: operation.to_string(),
                })?;

        let span = debug_span!(
            "dispatch",
            contract = self.contract.name(),
            plugin = self.table.name(),
            operation
        );
        let _enter = span.enter();

        self.metrics.record_dispatch(self.contract.name(), operation);
        let value = function(args)?;

        if self.shape_check.is_enabled() && !shape.matches(&value) {
            let actual = ActualShape::of(&value);
            self.metrics.record_violation(self.contract.name(), operation);
            warn!(expected = %shape, actual = %actual, "plugin result violates contract");
            return Err(DispatchError::ContractViolation {
                operation: operation.to_string(),
                expected: shape.to_string(),
                actual: actual.to_string(),
            });
        }

        debug!(kind = %value.kind(), "dispatch complete");
        Ok(value)
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn table(&self) -> &FunctionTable {
        &self.table
    }

    pub fn shape_check(&self) -> ShapeCheck {
        self.shape_check
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }
}
