//! Explicit class registration.
//!
//! Backends describe each class they own with a [`ClassRegistration`]: its
//! availability probe, its operation table, and the converters it declares
//! into or out of itself. [`Registry::register_class`](super::Registry::register_class)
//! consumes the description in one call.
//!
//! ```rust,ignore
//! ClassRegistration::new(RUST_IMAGE)
//!     .operation("resize", resize)
//!     .converter_from_many(&[PNG_FILE, JPEG_FILE], decode, None)
//!     .converter_to(RGB_BUFFER, to_rgb_buffer)
//! ```

use super::state::{
    BackendError, ClassId, ConverterFn, ImageState, OperationFn, Outcome, ProbeFn, Value,
};
use std::sync::Arc;

/// Cost given to a converter registered without one.
pub const DEFAULT_CONVERTER_COST: u32 = 100;

/// One or more source classes for a converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sources(pub Vec<ClassId>);

impl From<ClassId> for Sources {
    fn from(class: ClassId) -> Self {
        Sources(vec![class])
    }
}

impl From<&[ClassId]> for Sources {
    fn from(classes: &[ClassId]) -> Self {
        Sources(classes.to_vec())
    }
}

impl<const N: usize> From<[ClassId; N]> for Sources {
    fn from(classes: [ClassId; N]) -> Self {
        Sources(classes.to_vec())
    }
}

impl From<Vec<ClassId>> for Sources {
    fn from(classes: Vec<ClassId>) -> Self {
        Sources(classes)
    }
}

pub(super) struct DeclaredConverter {
    pub other: ClassId,
    pub func: ConverterFn,
    pub cost: Option<u32>,
}

/// Self-description of one image class.
pub struct ClassRegistration {
    pub(super) class: ClassId,
    pub(super) probe: Option<ProbeFn>,
    pub(super) operations: Vec<(String, OperationFn)>,
    pub(super) converters_from: Vec<DeclaredConverter>,
    pub(super) converters_to: Vec<DeclaredConverter>,
}

impl ClassRegistration {
    pub fn new(class: ClassId) -> Self {
        Self {
            class,
            probe: None,
            operations: Vec::new(),
            converters_from: Vec::new(),
            converters_to: Vec::new(),
        }
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Availability probe. Classes without one are always available.
    pub fn probe<F>(mut self, probe: F) -> Self
    where
        F: Fn() -> Result<(), String> + Send + Sync + 'static,
    {
        self.probe = Some(Arc::new(probe));
        self
    }

    pub fn operation<F>(mut self, name: &str, func: F) -> Self
    where
        F: Fn(&dyn ImageState, &[Value]) -> Result<Outcome, BackendError> + Send + Sync + 'static,
    {
        self.operations.push((name.to_string(), Arc::new(func)));
        self
    }

    /// This class can be produced from `source` at the default cost.
    pub fn converter_from<F>(self, source: ClassId, func: F) -> Self
    where
        F: Fn(&dyn ImageState) -> Result<Box<dyn ImageState>, BackendError>
            + Send
            + Sync
            + 'static,
    {
        self.converter_from_many([source], func, None)
    }

    /// This class can be produced from each of `sources` by the same function.
    pub fn converter_from_many<F>(
        mut self,
        sources: impl Into<Sources>,
        func: F,
        cost: Option<u32>,
    ) -> Self
    where
        F: Fn(&dyn ImageState) -> Result<Box<dyn ImageState>, BackendError>
            + Send
            + Sync
            + 'static,
    {
        let func: ConverterFn = Arc::new(func);
        for source in sources.into().0 {
            self.converters_from.push(DeclaredConverter {
                other: source,
                func: Arc::clone(&func),
                cost,
            });
        }
        self
    }

    /// This class can be converted into `target` at the default cost.
    pub fn converter_to<F>(self, target: ClassId, func: F) -> Self
    where
        F: Fn(&dyn ImageState) -> Result<Box<dyn ImageState>, BackendError>
            + Send
            + Sync
            + 'static,
    {
        self.converter_to_with_cost(target, func, None)
    }

    pub fn converter_to_with_cost<F>(mut self, target: ClassId, func: F, cost: Option<u32>) -> Self
    where
        F: Fn(&dyn ImageState) -> Result<Box<dyn ImageState>, BackendError>
            + Send
            + Sync
            + 'static,
    {
        self.converters_to.push(DeclaredConverter {
            other: target,
            func: Arc::new(func),
            cost,
        });
        self
    }
}
