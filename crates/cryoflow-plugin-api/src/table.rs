use crate::contract::Contract;
use crate::error::PluginResult;
use crate::value::{CallArgs, PluginValue};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One plugin operation
pub type PluginFn = Arc<dyn Fn(&CallArgs) -> PluginResult<PluginValue> + Send + Sync>;

/// Operation name → implementation mapping supplied by one vendor module.
///
/// Entries the contract does not declare are ignored by the dispatcher;
/// declared entries that are absent only fail when they are invoked.
#[derive(Clone)]
pub struct FunctionTable {
    name: String,
    functions: BTreeMap<String, PluginFn>,
}

impl FunctionTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: BTreeMap::new(),
        }
    }

    /// Registers an operation, replacing any previous one with the same name.
    pub fn with<F>(mut self, operation: impl Into<String>, function: F) -> Self
    where
        F: Fn(&CallArgs) -> PluginResult<PluginValue> + Send + Sync + 'static,
    {
        self.insert(operation, function);
        self
    }

    pub fn insert<F>(&mut self, operation: impl Into<String>, function: F)
    where
        F: Fn(&CallArgs) -> PluginResult<PluginValue> + Send + Sync + 'static,
    {
        self.functions.insert(operation.into(), Arc::new(function));
    }

    /// Plugin module name used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, operation: &str) -> Option<&PluginFn> {
        self.functions.get(operation)
    }

    pub fn contains(&self, operation: &str) -> bool {
        self.functions.contains_key(operation)
    }

    /// Implemented operation names, sorted.
    pub fn operations(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }

    /// Declared operations this table does not implement.
    pub fn missing_operations(&self, contract: &Contract) -> Vec<String> {
        contract
            .operation_names()
            .into_iter()
            .filter(|op| !self.contains(op))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTable")
            .field("name", &self.name)
            .field("operations", &self.operations())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryoflow_core::Category;

    #[test]
    fn test_missing_operations() {
        let table = FunctionTable::new("partial")
            .with("get_command", |_| Ok(PluginValue::from("cmd")))
            .with("unrelated_helper", |_| Ok(PluginValue::None));

        let contract = Contract::for_category(Category::Compress);
        assert_eq!(table.missing_operations(&contract), vec!["get_output_files"]);
        assert_eq!(table.len(), 2);
        assert!(format!("{:?}", table).contains("unrelated_helper"));
    }
}
