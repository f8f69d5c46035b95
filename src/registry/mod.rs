//! Operation registry and converter graph.
//!
//! Every image representation the program understands is a *class*: an
//! encoded PNG file, a decoded `DynamicImage`, a packed RGB buffer. A class
//! declares the operations it can run directly and the converters that turn
//! it into other classes. The registry stores those tables; the
//! [`Router`] answers "which class should run this operation, and how do I
//! get there from here?".
//!
//! ## Module Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | `state` | [`ClassId`], the [`ImageState`] trait, [`Value`] arguments and results |
//! | `registration` | [`ClassRegistration`] builder used by backends |
//! | `tables` | [`Registry`], [`Converter`] edges, the [`Plugin`] trait |
//! | `availability` | Probe running and memoisation |
//! | `router` | Path search, cost accumulation, operation resolution |
//! | `error` | [`LookupError`] and [`RoutingError`] |
//!
//! ## Lifecycle
//!
//! ```text
//! register plugins (mutable)  →  Router::new(&registry)  →  resolve_operation(...)
//! ```
//!
//! The registry is built once and then only borrowed. Routers hold a shared
//! reference, so any number of them (and the images they dispatch for) can use
//! one registry at a time.

mod availability;
mod error;
mod registration;
mod router;
pub(crate) mod state;
mod tables;

pub use availability::{Availability, AvailabilityChecker, AvailabilitySnapshot, DISABLED_REASON};
pub use error::{LookupError, RoutingError};
pub use registration::{ClassRegistration, DEFAULT_CONVERTER_COST, Sources};
pub use router::{ConversionPath, Resolution, Route, Router};
pub use state::{
    BackendError, ClassId, ConverterFn, ImageState, OperationFn, Outcome, ProbeFn, Value, downcast,
};
pub use tables::{Converter, Plugin, Registry};
