//! Plugin Registry - resolve a plugin selection to a contract-checked dispatcher

use crate::contract::Contract;
use crate::dispatcher::{ContractDispatcher, ShapeCheck};
use crate::error::{DispatchError, PluginResult};
use crate::metrics::DispatchMetrics;
use crate::table::FunctionTable;
use cryoflow_core::{Category, PluginSelection};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PluginKey {
    category: Category,
    software: String,
    hardware: String,
}

/// One registered plugin version, as listed by the CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub category: Category,
    pub software: String,
    pub hardware: String,
    pub version: String,
    /// Implemented operations, sorted
    pub operations: Vec<String>,
    /// Declared operations the table lacks
    pub missing: Vec<String>,
}

/// Registry of function tables keyed by category, software, hardware and version.
pub struct PluginRegistry {
    tables: DashMap<PluginKey, BTreeMap<String, Arc<FunctionTable>>>,
    contracts: HashMap<Category, Arc<Contract>>,
    full_program: Arc<Contract>,
    shape_check: ShapeCheck,
    metrics: Arc<DispatchMetrics>,
}

impl PluginRegistry {
    pub fn new(shape_check: ShapeCheck) -> Self {
        let contracts = Category::ALL
            .iter()
            .map(|c| (*c, Arc::new(Contract::for_category(*c))))
            .collect();

        Self {
            tables: DashMap::new(),
            contracts,
            full_program: Arc::new(Contract::full_program()),
            shape_check,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    /// Registers a table, returning the one it replaces.
    pub fn register(
        &self,
        category: Category,
        software: impl Into<String>,
        hardware: impl Into<String>,
        version: impl Into<String>,
        table: FunctionTable,
    ) -> Option<Arc<FunctionTable>> {
        let key = PluginKey {
            category,
            software: software.into(),
            hardware: hardware.into(),
        };
        let version = version.into();

        debug!(
            category = %key.category,
            software = %key.software,
            hardware = %key.hardware,
            version = %version,
            "registering plugin table"
        );

        self.tables
            .entry(key)
            .or_default()
            .insert(version, Arc::new(table))
    }

    /// Looks up the table for a selection.
    ///
    /// An exact version wins; otherwise the greatest registered version that
    /// sorts at or before the requested one is used. Without a requested
    /// version the greatest registered version is used.
    pub fn table(&self, selection: &PluginSelection) -> PluginResult<(String, Arc<FunctionTable>)> {
        let unknown = || DispatchError::UnknownPlugin {
            selection: selection.to_string(),
        };

        let key = PluginKey {
            category: selection.category,
            software: selection.software.clone(),
            hardware: selection.hardware.clone(),
        };
        let versions = self.tables.get(&key).ok_or_else(unknown)?;

        let found = match selection.version.as_deref() {
            Some(requested) => versions
                .range::<str, _>((Bound::Unbounded, Bound::Included(requested)))
                .next_back(),
            None => versions.iter().next_back(),
        };

        found
            .map(|(version, table)| (version.clone(), Arc::clone(table)))
            .ok_or_else(unknown)
    }

    /// Resolves a selection to a dispatcher bound to its category contract.
    pub fn resolve(&self, selection: &PluginSelection) -> PluginResult<ContractDispatcher> {
        let (version, table) = self.table(selection)?;
        debug!(selection = %selection, resolved = %version, "plugin resolved");

        let contract = self
            .contracts
            .get(&selection.category)
            .cloned()
            .unwrap_or_else(|| Arc::new(Contract::for_category(selection.category)));

        Ok(ContractDispatcher::new(table, contract)
            .with_shape_check(self.shape_check)
            .with_metrics(Arc::clone(&self.metrics)))
    }

    /// Binds a complete external program to the full-program contract.
    pub fn full_program(&self, table: FunctionTable) -> ContractDispatcher {
        ContractDispatcher::new(Arc::new(table), Arc::clone(&self.full_program))
            .with_shape_check(self.shape_check)
            .with_metrics(Arc::clone(&self.metrics))
    }

    /// All registered plugin versions, sorted.
    pub fn list(&self) -> Vec<PluginInfo> {
        let mut rows: Vec<PluginInfo> = self
            .tables
            .iter()
            .flat_map(|entry| {
                let key = entry.key().clone();
                let contract = self.contracts.get(&key.category).cloned();
                entry
                    .value()
                    .iter()
                    .map(|(version, table)| PluginInfo {
                        category: key.category,
                        software: key.software.clone(),
                        hardware: key.hardware.clone(),
                        version: version.clone(),
                        operations: table.operations(),
                        missing: contract
                            .as_deref()
                            .map(|c| table.missing_operations(c))
                            .unwrap_or_default(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        rows.sort_by(|a, b| {
            (a.category, &a.software, &a.hardware, &a.version)
                .cmp(&(b.category, &b.software, &b.hardware, &b.version))
        });
        rows
    }

    /// Logs a summary of the registered plugins.
    pub fn log_summary(&self) {
        let rows = self.list();
        info!(
            plugins = rows.len(),
            shape_check = self.shape_check.is_enabled(),
            "plugin registry ready"
        );
    }

    pub fn shape_check(&self) -> ShapeCheck {
        self.shape_check
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.tables.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new(ShapeCheck::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{CallArgs, PluginValue};

    fn versioned(version: &'static str) -> FunctionTable {
        FunctionTable::new(format!("compress-{}", version))
            .with("get_command", move |_| Ok(PluginValue::from(version)))
    }

    fn registry() -> PluginRegistry {
        let registry = PluginRegistry::new(ShapeCheck::Strict);
        for version in ["1.0", "1.5", "2.0"] {
            registry.register(Category::Compress, "mrc2tif", "cpu", version, versioned(version));
        }
        registry
    }

    fn command_for(registry: &PluginRegistry, version: Option<&str>) -> PluginResult<String> {
        let mut selection = PluginSelection::new(Category::Compress, "mrc2tif", "cpu");
        selection.version = version.map(str::to_string);
        let value = registry
            .resolve(&selection)?
            .dispatch("get_command", &CallArgs::new())?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    #[test]
    fn test_version_resolution() {
        let registry = registry();
        assert_eq!(command_for(&registry, Some("1.5")).unwrap(), "1.5");
        assert_eq!(command_for(&registry, Some("1.7")).unwrap(), "1.5");
        assert_eq!(command_for(&registry, Some("9")).unwrap(), "2.0");
        assert_eq!(command_for(&registry, None).unwrap(), "2.0");
    }

    #[test]
    fn test_version_before_all_registered_is_unknown() {
        let err = command_for(&registry(), Some("0.9")).unwrap_err();
        assert!(matches!(err, DispatchError::UnknownPlugin { ref selection } if selection.contains("0.9")));
    }

    #[test]
    fn test_unknown_software_or_hardware() {
        let registry = registry();
        for selection in [
            PluginSelection::new(Category::Compress, "other", "cpu"),
            PluginSelection::new(Category::Compress, "mrc2tif", "gpu"),
            PluginSelection::new(Category::Ctf, "mrc2tif", "cpu"),
        ] {
            assert!(matches!(
                registry.resolve(&selection),
                Err(DispatchError::UnknownPlugin { .. })
            ));
        }
    }

    #[test]
    fn test_list_reports_missing_operations() {
        let rows = registry().list();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].version, "1.0");
        assert_eq!(rows[2].version, "2.0");
        assert_eq!(rows[0].missing, vec!["get_output_files"]);
    }

    #[test]
    fn test_register_replaces_version() {
        let registry = registry();
        let previous = registry.register(
            Category::Compress,
            "mrc2tif",
            "cpu",
            "2.0",
            versioned("2.0"),
        );
        assert!(previous.is_some());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_shared_metrics() {
        let registry = registry();
        command_for(&registry, None).unwrap();
        command_for(&registry, Some("1.0")).unwrap();
        assert_eq!(registry.metrics().dispatched(), 2);
    }
}
