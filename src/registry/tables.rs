//! The registry: class set, operation tables, and converter graph.
//!
//! Registration happens once at start-up. After that the registry is only
//! read, by the [`Router`](super::Router) and the dispatch proxy.
//!
//! Every table follows "last registration wins": registering an operation or a
//! converter for an existing key replaces it in place, and re-registering a
//! class rebuilds its operation table and the converters it declared.

use super::error::LookupError;
use super::registration::{ClassRegistration, DEFAULT_CONVERTER_COST, Sources};
use super::state::{BackendError, ClassId, ConverterFn, ImageState, OperationFn, ProbeFn};
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A directed, costed edge of the converter graph.
#[derive(Clone)]
pub struct Converter {
    pub from: ClassId,
    pub to: ClassId,
    pub cost: u32,
    /// Set when the edge came from a [`ClassRegistration`] of this class.
    declared_by: Option<ClassId>,
    func: ConverterFn,
}

impl Converter {
    /// Run the conversion on a state of class `self.from`.
    pub fn convert(&self, state: &dyn ImageState) -> Result<Box<dyn ImageState>, BackendError> {
        (self.func)(state)
    }

    pub fn func(&self) -> &ConverterFn {
        &self.func
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.from, self.to, self.cost)
    }
}

impl PartialEq for Converter {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from && self.to == other.to && Arc::ptr_eq(&self.func, &other.func)
    }
}

/// A backend that contributes classes, operations and converters.
pub trait Plugin {
    fn name(&self) -> &'static str;

    fn register(&self, registry: &mut Registry);
}

#[derive(Default)]
pub struct Registry {
    /// Registration order; doubles as the candidate order when routing.
    classes: Vec<ClassId>,
    probes: HashMap<ClassId, ProbeFn>,
    operations: HashMap<ClassId, HashMap<String, OperationFn>>,
    /// Insertion order is the depth-first expansion order of the router.
    converters: Vec<Converter>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a class with everything it declares.
    pub fn register_class(&mut self, registration: ClassRegistration) {
        let class = registration.class;
        if self.is_registered(class) {
            debug!("Re-registering image class {class}");
            self.operations.remove(&class);
            self.probes.remove(&class);
            self.converters.retain(|c| c.declared_by != Some(class));
        } else {
            self.classes.push(class);
        }

        if let Some(probe) = registration.probe {
            self.probes.insert(class, probe);
        }
        for (name, func) in registration.operations {
            self.register_operation(class, &name, func);
        }
        for declared in registration.converters_from {
            self.insert_converter(declared.other, class, declared.func, declared.cost, Some(class));
        }
        for declared in registration.converters_to {
            self.insert_converter(class, declared.other, declared.func, declared.cost, Some(class));
        }
    }

    pub fn register_plugin(&mut self, plugin: &dyn Plugin) {
        info!("Registering plugin {}", plugin.name());
        plugin.register(self);
    }

    pub fn register_operation(&mut self, class: ClassId, name: &str, func: OperationFn) {
        self.operations
            .entry(class)
            .or_default()
            .insert(name.to_string(), func);
    }

    /// Register `func` as the converter from each source class into `to`.
    pub fn register_converter(
        &mut self,
        from: impl Into<Sources>,
        to: ClassId,
        func: ConverterFn,
        cost: Option<u32>,
    ) {
        for source in from.into().0 {
            self.insert_converter(source, to, Arc::clone(&func), cost, None);
        }
    }

    fn insert_converter(
        &mut self,
        from: ClassId,
        to: ClassId,
        func: ConverterFn,
        cost: Option<u32>,
        declared_by: Option<ClassId>,
    ) {
        let converter = Converter {
            from,
            to,
            cost: cost.unwrap_or(DEFAULT_CONVERTER_COST),
            declared_by,
            func,
        };
        match self
            .converters
            .iter_mut()
            .find(|c| c.from == from && c.to == to)
        {
            Some(existing) => *existing = converter,
            None => self.converters.push(converter),
        }
    }

    pub fn is_registered(&self, class: ClassId) -> bool {
        self.classes.contains(&class)
    }

    /// Registered classes in registration order.
    pub fn classes(&self) -> &[ClassId] {
        &self.classes
    }

    /// Look a class up by its name.
    pub fn class_named(&self, name: &str) -> Option<ClassId> {
        self.classes.iter().copied().find(|c| c.name() == name)
    }

    pub fn probe(&self, class: ClassId) -> Option<&ProbeFn> {
        self.probes.get(&class)
    }

    pub fn get_operation(&self, class: ClassId, name: &str) -> Result<&OperationFn, LookupError> {
        self.operations
            .get(&class)
            .and_then(|ops| ops.get(name))
            .ok_or_else(|| LookupError::MissingOperation {
                class,
                operation: name.to_string(),
            })
    }

    pub fn has_operation(&self, class: ClassId, name: &str) -> bool {
        self.get_operation(class, name).is_ok()
    }

    /// Whether any class at all declares `name`.
    pub fn operation_exists(&self, name: &str) -> bool {
        self.operations.values().any(|ops| ops.contains_key(name))
    }

    /// Registered classes declaring `name`, in registration order.
    pub fn classes_with_operation(&self, name: &str) -> Vec<ClassId> {
        self.classes
            .iter()
            .copied()
            .filter(|&c| self.has_operation(c, name))
            .collect()
    }

    /// Operation names of `class`, sorted.
    pub fn operations_of(&self, class: ClassId) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .operations
            .get(&class)
            .map(|ops| ops.keys().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    pub fn get_converter(&self, from: ClassId, to: ClassId) -> Result<&Converter, LookupError> {
        self.converters
            .iter()
            .find(|c| c.from == from && c.to == to)
            .ok_or(LookupError::MissingConverter { from, to })
    }

    /// Cost of the `from -> to` edge, or the default when there is no such edge.
    pub fn get_converter_cost(&self, from: ClassId, to: ClassId) -> u32 {
        self.get_converter(from, to)
            .map(|c| c.cost)
            .unwrap_or(DEFAULT_CONVERTER_COST)
    }

    /// Outgoing edges of `from`, in registration order.
    pub fn converters_from(&self, from: ClassId) -> impl Iterator<Item = &Converter> {
        self.converters.iter().filter(move |c| c.from == from)
    }

    pub fn converters(&self) -> &[Converter] {
        &self.converters
    }
}
