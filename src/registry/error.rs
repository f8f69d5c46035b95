//! Registry and routing errors.

use super::state::ClassId;
use thiserror::Error;

/// A table entry that does not exist.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("'{class}' has no operation '{operation}'")]
    MissingOperation { class: ClassId, operation: String },
    #[error("No converter from '{from}' to '{to}'")]
    MissingConverter { from: ClassId, to: ClassId },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// No registered class declares the operation.
    #[error("Could not find image class with the '{0}' operation")]
    UnrecognisedOperation(String),
    /// Every reachable class declaring the operation failed its probe.
    #[error(
        "The operation '{operation}' is available in the following image classes but they all raised errors:{}",
        failure_lines(.failures)
    )]
    UnavailableOperation {
        operation: String,
        failures: Vec<(ClassId, String)>,
    },
    /// The operation exists but no converter path leads to it.
    #[error(
        "The operation '{operation}' is available in the image class '{}' but it can't be converted to from '{from}'",
        class_list(.classes)
    )]
    UnroutableOperation {
        operation: String,
        classes: Vec<ClassId>,
        from: ClassId,
    },
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

fn failure_lines(failures: &[(ClassId, String)]) -> String {
    failures
        .iter()
        .map(|(class, reason)| format!("\n{class}: {reason}"))
        .collect()
}

fn class_list(classes: &[ClassId]) -> String {
    classes
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_lists_each_class_on_its_own_line() {
        let err = RoutingError::UnavailableOperation {
            operation: "foo".into(),
            failures: vec![
                (ClassId::new("ImageB"), "missing image library".into()),
                (ClassId::new("ImageE"), "another missing image library".into()),
            ],
        };
        assert_eq!(
            err.to_string(),
            "The operation 'foo' is available in the following image classes but they all raised errors:\n\
             ImageB: missing image library\n\
             ImageE: another missing image library"
        );
    }

    #[test]
    fn unroutable_joins_class_names() {
        let err = RoutingError::UnroutableOperation {
            operation: "op".into(),
            classes: vec![ClassId::new("X"), ClassId::new("Y")],
            from: ClassId::new("A"),
        };
        assert_eq!(
            err.to_string(),
            "The operation 'op' is available in the image class 'X, Y' but it can't be converted to from 'A'"
        );
    }

    #[test]
    fn lookup_errors_convert() {
        let err: RoutingError = LookupError::MissingConverter {
            from: ClassId::new("A"),
            to: ClassId::new("B"),
        }
        .into();
        assert_eq!(err.to_string(), "No converter from 'A' to 'B'");
    }
}
