//! The operator registry.
//!
//! A flat `Vec<OperatorDef>`, linear-scanned by name. `Vec`'s own
//! doubling growth strategy already gives amortized O(1) `register`, so
//! there is no bespoke capacity-management code here — the registry is
//! expected to hold on the order of tens of operators (spec.md §3), far
//! below the point where linear scan would matter against a hash map.
//!
//! Each operator is a triple of plain functions (`create`/`forward`/
//! `destroy`) operating on a type-erased state blob, mirroring the
//! C function-pointer table spec.md's operator struct describes;
//! `Box<dyn Any>` stands in for `void*`.

use std::any::Any;

use libetude_tensor::Tensor;

use crate::error::{GraphError, GraphResult};
use crate::node::OperatorParams;

/// Type-erased per-node operator state, created by `OperatorDef::create`
/// and consumed by `OperatorDef::forward`/`destroy`. Bounded `Send +
/// Sync` so a node's state can be handed to whichever worker thread the
/// parallel executor schedules it on.
pub struct OperatorState(pub Box<dyn Any + Send + Sync>);

pub type CreateFn = fn(&OperatorParams) -> GraphResult<OperatorState>;
/// Returns one tensor per value the operator produces — a single-entry
/// `Vec` for most operators, more for multi-output ones (`stft`'s
/// magnitude+phase).
pub type ForwardFn = fn(&OperatorState, &[&Tensor], &OperatorParams) -> GraphResult<Vec<Tensor>>;
pub type DestroyFn = fn(OperatorState);
pub type BackwardFn = fn(&OperatorState, &[&Tensor], &OperatorParams) -> GraphResult<Vec<Tensor>>;

/// One registered operator kind.
pub struct OperatorDef {
    pub name: &'static str,
    pub create: CreateFn,
    pub forward: ForwardFn,
    pub destroy: DestroyFn,
    /// Always `None` for every operator this crate bundles: training
    /// (gradient computation) is out of scope for an inference engine.
    pub backward: Option<BackwardFn>,
}

#[derive(Default)]
pub struct OperatorRegistry {
    entries: Vec<OperatorDef>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `def`. Fails if an operator with the same name is
    /// already present — names are the registry's only uniqueness key.
    pub fn register(&mut self, def: OperatorDef) -> GraphResult<()> {
        if self.entries.iter().any(|e| e.name == def.name) {
            return Err(GraphError::DuplicateOperator(def.name.to_string()));
        }
        self.entries.push(def);
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&OperatorDef> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name)
    }

    /// A registry pre-populated with the bundled Basic and Audio
    /// operators (spec.md §4.4).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for def in crate::ops::basic::operator_defs() {
            registry.register(def).expect("builtin operator names must be unique");
        }
        for def in crate::ops::audio::operator_defs() {
            registry.register(def).expect("builtin operator names must be unique");
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_create(_: &OperatorParams) -> GraphResult<OperatorState> {
        Ok(OperatorState(Box::new(())))
    }
    fn noop_forward(_: &OperatorState, inputs: &[&Tensor], _: &OperatorParams) -> GraphResult<Vec<Tensor>> {
        Ok(vec![inputs[0].copy(false)?])
    }
    fn noop_destroy(_: OperatorState) {}

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = OperatorRegistry::new();
        let make = || OperatorDef { name: "identity", create: noop_create, forward: noop_forward, destroy: noop_destroy, backward: None };
        registry.register(make()).unwrap();
        assert!(matches!(registry.register(make()), Err(GraphError::DuplicateOperator(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn builtins_register_without_name_collisions() {
        let registry = OperatorRegistry::with_builtins();
        assert!(registry.find("linear").is_some());
        assert!(registry.find("conv1d").is_some());
        assert!(registry.find("attention").is_some());
        assert!(registry.find("stft").is_some());
        assert!(registry.find("mel_scale").is_some());
        assert!(registry.find("vocoder").is_some());
    }
}
