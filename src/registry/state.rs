//! Representation identities and the values that flow through operations.
//!
//! A [`ClassId`] names one way of holding an image (an encoded JPEG, a packed
//! RGB buffer, an `image::DynamicImage`, ...). Every concrete representation
//! implements [`ImageState`] and reports its class, which is what the router
//! uses as a graph node.
//!
//! Operations and converters are stored as type-erased closures. They receive
//! `&dyn ImageState` and call [`downcast`] to get at their own concrete type.

use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Identity of an image representation class.
///
/// Two classes are the same class exactly when their names are equal, so
/// names must be unique across all registered backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(&'static str);

impl ClassId {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A concrete image representation held by the dispatch proxy.
pub trait ImageState: Any + Send {
    /// The class this representation belongs to.
    fn class(&self) -> ClassId;

    fn as_any(&self) -> &dyn Any;
}

/// Borrow `state` as the concrete representation `T`.
pub fn downcast<T: ImageState>(state: &dyn ImageState) -> Result<&T, BackendError> {
    state
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| BackendError::WrongRepresentation {
            expected: std::any::type_name::<T>(),
            found: state.class(),
        })
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Bad argument for '{operation}': {message}")]
    BadArgument {
        operation: &'static str,
        message: String,
    },
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Expected a {expected} representation, found {found}")]
    WrongRepresentation {
        expected: &'static str,
        found: ClassId,
    },
}

/// Argument or return value of an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    /// `(width, height)`
    Size(u32, u32),
    /// `(left, top, right, bottom)`; may extend past the image edges.
    Rect(i64, i64, i64, i64),
    Rgb([u8; 3]),
    Text(String),
}

impl Value {
    pub fn as_size(&self) -> Option<(u32, u32)> {
        match *self {
            Value::Size(w, h) => Some((w, h)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<(u32, u32)> for Value {
    fn from((w, h): (u32, u32)) -> Self {
        Value::Size(w, h)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// Result of running an operation.
pub enum Outcome {
    /// A plain answer; the proxy keeps its current representation.
    Value(Value),
    /// A new representation the proxy adopts.
    State(Box<dyn ImageState>),
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Outcome::State(s) => f.debug_tuple("State").field(&s.class()).finish(),
        }
    }
}

pub type OperationFn =
    Arc<dyn Fn(&dyn ImageState, &[Value]) -> Result<Outcome, BackendError> + Send + Sync>;

pub type ConverterFn =
    Arc<dyn Fn(&dyn ImageState) -> Result<Box<dyn ImageState>, BackendError> + Send + Sync>;

/// Availability probe. `Err` carries the human-readable failure reason.
pub type ProbeFn = Arc<dyn Fn() -> Result<(), String> + Send + Sync>;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal representation used across registry, router and proxy tests.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Token {
        pub class: ClassId,
        pub label: String,
    }

    impl Token {
        pub fn boxed(class: ClassId, label: &str) -> Box<dyn ImageState> {
            Box::new(Token {
                class,
                label: label.to_string(),
            })
        }
    }

    impl ImageState for Token {
        fn class(&self) -> ClassId {
            self.class
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Other;

    impl ImageState for Other {
        fn class(&self) -> ClassId {
            ClassId::new("Other")
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn class_identity_is_by_name() {
        assert_eq!(ClassId::new("PngFile"), ClassId::new("PngFile"));
        assert_ne!(ClassId::new("PngFile"), ClassId::new("JpegFile"));
        assert_eq!(ClassId::new("RgbBuffer").to_string(), "RgbBuffer");
    }

    #[test]
    fn downcast_to_own_type() {
        let state = Token::boxed(ClassId::new("A"), "a");
        let token = downcast::<Token>(&*state).unwrap();
        assert_eq!(token.label, "a");
    }

    #[test]
    fn downcast_to_foreign_type_fails() {
        let other = Other;
        let err = downcast::<Token>(&other).unwrap_err();
        assert!(matches!(
            err,
            BackendError::WrongRepresentation { found, .. } if found == ClassId::new("Other")
        ));
    }

    #[test]
    fn values_serialize_untagged() {
        let json = serde_json::to_string(&Value::Size(480, 360)).unwrap();
        assert_eq!(json, "[480,360]");
        assert_eq!(serde_json::to_string(&Value::Bool(true)).unwrap(), "true");
        assert_eq!(serde_json::to_string(&Value::Unit).unwrap(), "null");
    }

    #[test]
    fn value_accessors() {
        assert_eq!(Value::from((3, 4)).as_size(), Some((3, 4)));
        assert_eq!(Value::from(7).as_int(), Some(7));
        assert_eq!(Value::from(false).as_bool(), Some(false));
        assert_eq!(Value::from("png").as_text(), Some("png"));
        assert_eq!(Value::Unit.as_size(), None);
    }
}
