//! Routing operations through the converter graph.
//!
//! An image can only run the operations its current class declares. When it
//! doesn't have one, the router looks for the cheapest available class that
//! does and works out how to convert into it. Sometimes there is no direct
//! converter, so the route goes through intermediate classes: AVIF files are
//! decoded by the AV1 backend, which hands over to the packed buffers, which
//! the `image` backend can load.
//!
//! ```text
//! AvifFile --100--> Av1Frame --50--> RgbBuffer --100--> RustImage
//! ```
//!
//! # Search rules
//!
//! - Paths are simple: no class appears twice in one path, so cycles in the
//!   graph (`RustImage <-> RgbBuffer`) always terminate.
//! - The search never leaves a class that is unregistered or unavailable. An
//!   unavailable class can still be the *end* of a path, which is how
//!   [`RoutingError::UnavailableOperation`] gets its list of candidates.
//! - Cost is the sum of converter costs. Ties go to whatever the depth-first
//!   traversal meets first: converters in registration order, then candidate
//!   classes in registration order.

use super::availability::{AvailabilityChecker, AvailabilitySnapshot};
use super::error::RoutingError;
use super::state::{ClassId, OperationFn};
use super::tables::{Converter, Registry};
use log::{debug, trace};

/// An ordered sequence of conversions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionPath<'r> {
    steps: Vec<&'r Converter>,
}

impl<'r> ConversionPath<'r> {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[&'r Converter] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Sum of each step's converter cost, saturating at `u32::MAX`; `0` for
    /// the empty path.
    pub fn cost(&self) -> u32 {
        self.steps.iter().map(|c| c.cost).fold(0, u32::saturating_add)
    }

    /// `(from, to)` for each step.
    pub fn hops(&self) -> Vec<(ClassId, ClassId)> {
        self.steps.iter().map(|c| (c.from, c.to)).collect()
    }

    /// The class each step converts into, in order.
    pub fn classes(&self) -> Vec<ClassId> {
        self.steps.iter().map(|c| c.to).collect()
    }

    fn visits(&self, class: ClassId) -> bool {
        self.steps.iter().any(|c| c.to == class)
    }
}

/// The closest class for an operation and how to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct Route<'r> {
    pub class: ClassId,
    pub path: ConversionPath<'r>,
    pub cost: u32,
}

/// Answer to "how does an image of class X run operation O".
pub struct Resolution<'r> {
    pub operation: &'r OperationFn,
    pub class: ClassId,
    pub path: ConversionPath<'r>,
    pub cost: u32,
}

impl std::fmt::Debug for Resolution<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolution")
            .field("class", &self.class)
            .field("path", &self.path)
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

pub struct Router<'r> {
    registry: &'r Registry,
    availability: AvailabilityChecker,
}

impl<'r> Router<'r> {
    /// A router that re-probes availability on every resolution.
    pub fn new(registry: &'r Registry) -> Self {
        Self::with_checker(registry, AvailabilityChecker::new())
    }

    pub fn with_checker(registry: &'r Registry, availability: AvailabilityChecker) -> Self {
        Self {
            registry,
            availability,
        }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn snapshot(&self) -> AvailabilitySnapshot {
        self.availability.snapshot(self.registry)
    }

    /// Every simple path from `start` to `end`. `start == end` yields one empty path.
    pub fn find_all_paths(&self, start: ClassId, end: ClassId) -> Vec<ConversionPath<'r>> {
        self.all_paths_with(start, end, &self.snapshot())
    }

    fn all_paths_with(
        &self,
        start: ClassId,
        end: ClassId,
        availability: &AvailabilitySnapshot,
    ) -> Vec<ConversionPath<'r>> {
        let mut paths = Vec::new();
        let mut seen = Vec::new();
        self.walk(
            start,
            end,
            availability,
            &mut ConversionPath::empty(),
            &mut seen,
            &mut paths,
        );
        paths
    }

    fn walk(
        &self,
        current: ClassId,
        end: ClassId,
        availability: &AvailabilitySnapshot,
        path: &mut ConversionPath<'r>,
        seen: &mut Vec<ClassId>,
        paths: &mut Vec<ConversionPath<'r>>,
    ) {
        if current == end {
            trace!("Found path {:?}", path.hops());
            paths.push(path.clone());
            return;
        }
        if seen.contains(&current)
            || !self.registry.is_registered(current)
            || !availability.is_available(current)
        {
            return;
        }

        seen.push(current);
        for converter in self.registry.converters_from(current) {
            if path.visits(converter.to) {
                continue;
            }
            path.steps.push(converter);
            self.walk(converter.to, end, availability, path, seen, paths);
            path.steps.pop();
        }
        seen.pop();
    }

    /// Cost of following `path` from `start`, looked up edge by edge.
    /// Saturates at `u32::MAX`.
    pub fn path_cost(&self, start: ClassId, path: &ConversionPath<'_>) -> u32 {
        let mut last = start;
        let mut total: u32 = 0;
        for step in path.steps() {
            total = total.saturating_add(self.registry.get_converter_cost(last, step.to));
            last = step.to;
        }
        total
    }

    /// Cheapest path from `start` to `end`, or `None` when there is none.
    pub fn find_shortest_path(
        &self,
        start: ClassId,
        end: ClassId,
    ) -> Option<(ConversionPath<'r>, u32)> {
        self.shortest_path_with(start, end, &self.snapshot())
    }

    fn shortest_path_with(
        &self,
        start: ClassId,
        end: ClassId,
        availability: &AvailabilitySnapshot,
    ) -> Option<(ConversionPath<'r>, u32)> {
        let mut best: Option<(ConversionPath<'r>, u32)> = None;
        for path in self.all_paths_with(start, end, availability) {
            let cost = self.path_cost(start, &path);
            if best.as_ref().is_none_or(|(_, best_cost)| cost < *best_cost) {
                best = Some((path, cost));
            }
        }
        best
    }

    /// Classes declaring `operation` that `start` can be converted into.
    ///
    /// `start` counts when it declares the operation itself. Fails with
    /// [`RoutingError::UnrecognisedOperation`] when no class declares it.
    pub fn find_reachable_classes(
        &self,
        start: ClassId,
        operation: &str,
        require_available: bool,
    ) -> Result<Vec<ClassId>, RoutingError> {
        let candidates = self.candidates(operation)?;
        let availability = self.snapshot();
        Ok(candidates
            .into_iter()
            .filter(|&class| {
                self.shortest_path_with(start, class, &availability)
                    .is_some()
            })
            .filter(|&class| !require_available || availability.is_available(class))
            .collect())
    }

    /// The candidate reachable from `start` at the lowest cost.
    pub fn find_closest_class(&self, start: ClassId, candidates: &[ClassId]) -> Option<Route<'r>> {
        self.closest_with(start, candidates, &self.snapshot())
    }

    fn closest_with(
        &self,
        start: ClassId,
        candidates: &[ClassId],
        availability: &AvailabilitySnapshot,
    ) -> Option<Route<'r>> {
        let mut best: Option<Route<'r>> = None;
        for &class in candidates {
            let Some((path, cost)) = self.shortest_path_with(start, class, availability) else {
                continue;
            };
            if best.as_ref().is_none_or(|route| cost < route.cost) {
                best = Some(Route { class, path, cost });
            }
        }
        best
    }

    fn candidates(&self, operation: &str) -> Result<Vec<ClassId>, RoutingError> {
        let candidates = self.registry.classes_with_operation(operation);
        if candidates.is_empty() {
            return Err(RoutingError::UnrecognisedOperation(operation.to_string()));
        }
        Ok(candidates)
    }

    /// Find the operation for an image of class `start`.
    ///
    /// If `start` declares it, that is returned with an empty path and cost 0
    /// without probing anything. Otherwise the closest available class wins.
    pub fn resolve_operation(
        &self,
        start: ClassId,
        operation: &str,
    ) -> Result<Resolution<'r>, RoutingError> {
        if let Ok(func) = self.registry.get_operation(start, operation) {
            return Ok(Resolution {
                operation: func,
                class: start,
                path: ConversionPath::empty(),
                cost: 0,
            });
        }

        let candidates = self.candidates(operation)?;
        let availability = self.snapshot();

        let reachable: Vec<ClassId> = candidates
            .iter()
            .copied()
            .filter(|&class| {
                self.shortest_path_with(start, class, &availability)
                    .is_some()
            })
            .collect();
        if reachable.is_empty() {
            return Err(RoutingError::UnroutableOperation {
                operation: operation.to_string(),
                classes: candidates,
                from: start,
            });
        }

        let (available, unavailable): (Vec<ClassId>, Vec<ClassId>) = reachable
            .into_iter()
            .partition(|&class| availability.is_available(class));
        if available.is_empty() {
            return Err(RoutingError::UnavailableOperation {
                operation: operation.to_string(),
                failures: unavailable
                    .into_iter()
                    .map(|class| {
                        let reason = availability.failure(class).unwrap_or("Unknown error");
                        (class, reason.to_string())
                    })
                    .collect(),
            });
        }

        let Some(route) = self.closest_with(start, &available, &availability) else {
            return Err(RoutingError::UnroutableOperation {
                operation: operation.to_string(),
                classes: available,
                from: start,
            });
        };
        let func = self.registry.get_operation(route.class, operation)?;
        debug!(
            "Routing '{operation}' from {start} to {} in {} step(s), cost {}",
            route.class,
            route.path.len(),
            route.cost
        );
        Ok(Resolution {
            operation: func,
            class: route.class,
            path: route.path,
            cost: route.cost,
        })
    }
}
