//! Dispatch metrics
//!
//! Counts dispatched operations and contract violations both locally and
//! through the `metrics` facade, labelled by contract and operation.

use metrics::{counter, describe_counter};
use std::sync::atomic::{AtomicU64, Ordering};

/// Dispatch metrics collector
#[derive(Debug)]
pub struct DispatchMetrics {
    dispatched: AtomicU64,
    violations: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        describe_counter!("cryoflow_dispatch_total", "Total plugin operations dispatched");
        describe_counter!(
            "cryoflow_contract_violations_total",
            "Plugin results rejected by the shape check"
        );

        Self {
            dispatched: AtomicU64::new(0),
            violations: AtomicU64::new(0),
        }
    }

    pub fn record_dispatch(&self, contract: &str, operation: &str) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        counter!(
            "cryoflow_dispatch_total",
            "contract" => contract.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    pub fn record_violation(&self, contract: &str, operation: &str) {
        self.violations.fetch_add(1, Ordering::Relaxed);
        counter!(
            "cryoflow_contract_violations_total",
            "contract" => contract.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn violations(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}
