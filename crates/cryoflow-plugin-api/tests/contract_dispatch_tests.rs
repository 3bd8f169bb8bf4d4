//! Dispatch behaviour across every declared contract

use cryoflow_plugin_api::{
    Arity, CallArgs, Category, Container, Contract, ContractDispatcher, DispatchError,
    ElementSpec, FunctionTable, PluginValue, Shape, ShapeCheck, ValueKind,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

fn all_contracts() -> Vec<Contract> {
    let mut contracts: Vec<Contract> = Category::ALL
        .iter()
        .map(|c| Contract::for_category(*c))
        .collect();
    contracts.push(Contract::full_program());
    contracts
}

fn sample_of(kind: ValueKind) -> PluginValue {
    match kind {
        ValueKind::None => PluginValue::None,
        ValueKind::Bool => PluginValue::Bool(true),
        ValueKind::Int => PluginValue::Int(7),
        ValueKind::Float => PluginValue::Float(0.5),
        ValueKind::Str => PluginValue::from("movie.mrc"),
        ValueKind::List => PluginValue::str_list(["a"]),
        ValueKind::Tuple => PluginValue::tuple([PluginValue::from("a")]),
        ValueKind::Set => PluginValue::Set(BTreeSet::from(["a".to_string()])),
        ValueKind::Map => PluginValue::Map(BTreeMap::from([("k".to_string(), "v".to_string())])),
    }
}

/// A value with exactly the declared shape.
fn conforming(shape: &Shape) -> PluginValue {
    let item = |i: usize| match &shape.elements {
        ElementSpec::None => PluginValue::from("x"),
        ElementSpec::Uniform(kind) => sample_of(*kind),
        ElementSpec::PerSlot(kinds) => sample_of(kinds[i]),
    };

    match (shape.container, shape.arity) {
        (Container::Tuple, Arity::Exactly(n)) => PluginValue::Tuple((0..n).map(item).collect()),
        (Container::List, _) => PluginValue::List(vec![item(0), item(0)]),
        (Container::Set, _) => PluginValue::Set(BTreeSet::from(["a".to_string()])),
        (Container::Map, _) => sample_of(ValueKind::Map),
        (Container::Str, _) => PluginValue::from("cmd"),
        (Container::None, _) => match &shape.elements {
            ElementSpec::Uniform(kind) => sample_of(*kind),
            _ => PluginValue::Int(3),
        },
        (Container::Tuple, Arity::Any) => PluginValue::tuple([item(0)]),
    }
}

/// A value that disagrees with the declared shape, if one exists.
fn violating(shape: &Shape) -> Option<PluginValue> {
    if shape.container == Container::None && shape.elements == ElementSpec::None {
        return None;
    }
    match shape.container {
        Container::Str => Some(PluginValue::Int(1)),
        _ => Some(PluginValue::Float(1.5)),
    }
}

fn full_table(contract: &Contract) -> FunctionTable {
    let mut table = FunctionTable::new(format!("{}-plugin", contract.name()));
    for (name, shape) in contract.iter() {
        let value = conforming(shape);
        table.insert(name, move |_| Ok(value.clone()));
    }
    table
}

fn strict(table: FunctionTable, contract: Contract) -> ContractDispatcher {
    ContractDispatcher::new(Arc::new(table), Arc::new(contract)).with_shape_check(ShapeCheck::Strict)
}

#[test]
fn test_conforming_results_are_returned_unchanged() {
    for contract in all_contracts() {
        let dispatcher = strict(full_table(&contract), contract.clone());

        for (name, shape) in contract.iter() {
            let value = dispatcher
                .dispatch(name, &CallArgs::new().arg("input"))
                .unwrap_or_else(|e| panic!("{}::{} failed: {}", contract.name(), name, e));
            assert_eq!(value, conforming(shape), "{}::{}", contract.name(), name);
        }
    }
}

#[test]
fn test_undeclared_operation_lists_sorted_names() {
    for contract in all_contracts() {
        let dispatcher = strict(full_table(&contract), contract.clone());

        match dispatcher.dispatch("get_nonexistent", &CallArgs::new()) {
            Err(DispatchError::UnknownOperation {
                category,
                operation,
                valid,
            }) => {
                assert_eq!(category, contract.name());
                assert_eq!(operation, "get_nonexistent");
                let mut expected = contract.operation_names();
                expected.sort();
                assert_eq!(valid, expected);
            }
            other => panic!("Expected UnknownOperation, got {:?}", other),
        }
    }
}

#[test]
fn test_missing_implementation_only_fails_when_invoked() {
    for contract in all_contracts() {
        for missing in contract.operation_names() {
            let mut table = FunctionTable::new("partial");
            for (name, shape) in contract.iter().filter(|(n, _)| *n != missing) {
                let value = conforming(shape);
                table.insert(name, move |_| Ok(value.clone()));
            }
            let dispatcher = strict(table, contract.clone());

            match dispatcher.dispatch(&missing, &CallArgs::new()) {
                Err(DispatchError::MissingImplementation { plugin, operation }) => {
                    assert_eq!(plugin, "partial");
                    assert_eq!(operation, missing);
                }
                other => panic!("Expected MissingImplementation, got {:?}", other),
            }

            if let Some(other) = contract.operation_names().into_iter().find(|n| *n != missing) {
                assert!(dispatcher.dispatch(&other, &CallArgs::new()).is_ok());
            }
        }
    }
}

#[test]
fn test_wrong_shapes_are_contract_violations() {
    for contract in all_contracts() {
        for (name, shape) in contract.iter() {
            let Some(bad) = violating(shape) else {
                continue;
            };
            let table = FunctionTable::new("bad").with(name, move |_| Ok(bad.clone()));
            let dispatcher = strict(table, contract.clone());

            match dispatcher.dispatch(name, &CallArgs::new()) {
                Err(DispatchError::ContractViolation {
                    operation,
                    expected,
                    ..
                }) => {
                    assert_eq!(operation, name);
                    assert_eq!(expected, shape.to_string());
                }
                other => panic!("Expected ContractViolation for {}, got {:?}", name, other),
            }
        }
    }
}

#[test]
fn test_check_nr_frames_slot_order_matters() {
    let table = FunctionTable::new("swapped").with("check_nr_frames", |_| {
        Ok(PluginValue::tuple([PluginValue::Bool(true), PluginValue::from("a.mrc")]))
    });
    let err = strict(table, Contract::for_category(Category::CopyExtern))
        .dispatch("check_nr_frames", &CallArgs::new())
        .unwrap_err();
    assert!(err.is_integration_error());
    assert!(err.to_string().contains("(2, tuple, [str, bool])"));
}

#[test]
fn test_extra_table_entries_are_ignored() {
    let contract = Contract::for_category(Category::Compress);
    let table = full_table(&contract).with("helper", |_| Ok(PluginValue::None));
    let dispatcher = strict(table, contract);

    assert!(matches!(
        dispatcher.dispatch("helper", &CallArgs::new()),
        Err(DispatchError::UnknownOperation { .. })
    ));
}
