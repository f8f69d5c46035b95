//! Availability probing.
//!
//! Each class may carry a probe that reports whether its backend can be used
//! in this process. By default nothing is cached: the router takes a fresh
//! [`AvailabilitySnapshot`] for every resolution, so a backend that appears or
//! disappears between calls is observed. [`AvailabilityChecker::memoized`]
//! trades that for speed by keeping the first answer per class.

use super::state::ClassId;
use super::tables::Registry;
use log::{trace, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Reason reported for classes on the configured deny-list.
pub const DISABLED_REASON: &str = "disabled by configuration";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable(String),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

/// Probe results for every registered class, taken at one point in time.
#[derive(Debug, Clone, Default)]
pub struct AvailabilitySnapshot {
    failures: HashMap<ClassId, String>,
}

impl AvailabilitySnapshot {
    pub fn is_available(&self, class: ClassId) -> bool {
        !self.failures.contains_key(&class)
    }

    /// The captured probe error for `class`, if it failed.
    pub fn failure(&self, class: ClassId) -> Option<&str> {
        self.failures.get(&class).map(String::as_str)
    }

    pub fn mark_unavailable(&mut self, class: ClassId, reason: impl Into<String>) {
        self.failures.insert(class, reason.into());
    }
}

/// Runs class probes, optionally memoising the results and forcing a
/// deny-list of classes to fail.
#[derive(Debug, Default)]
pub struct AvailabilityChecker {
    cache: Option<Mutex<HashMap<ClassId, Availability>>>,
    disabled: HashSet<String>,
}

impl AvailabilityChecker {
    /// Re-probes on every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Probes each class once per checker lifetime.
    pub fn memoized() -> Self {
        Self {
            cache: Some(Mutex::new(HashMap::new())),
            disabled: HashSet::new(),
        }
    }

    /// Force the named classes to report [`DISABLED_REASON`].
    pub fn with_disabled<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn is_memoized(&self) -> bool {
        self.cache.is_some()
    }

    /// Probe a single class.
    pub fn check(&self, registry: &Registry, class: ClassId) -> Availability {
        if self.disabled.contains(class.name()) {
            return Availability::Unavailable(DISABLED_REASON.to_string());
        }

        if let Some(cache) = &self.cache {
            let mut cache = cache.lock().unwrap_or_else(|e| e.into_inner());
            return cache
                .entry(class)
                .or_insert_with(|| run_probe(registry, class))
                .clone();
        }

        run_probe(registry, class)
    }

    /// Probe every registered class.
    pub fn snapshot(&self, registry: &Registry) -> AvailabilitySnapshot {
        let mut snapshot = AvailabilitySnapshot::default();
        for &class in registry.classes() {
            if let Availability::Unavailable(reason) = self.check(registry, class) {
                warn!("Image class {class} is unavailable: {reason}");
                snapshot.mark_unavailable(class, reason);
            }
        }
        snapshot
    }
}

fn run_probe(registry: &Registry, class: ClassId) -> Availability {
    trace!("Probing image class {class}");
    match registry.probe(class) {
        Some(probe) => match probe() {
            Ok(()) => Availability::Available,
            Err(reason) => Availability::Unavailable(reason),
        },
        None => Availability::Available,
    }
}
