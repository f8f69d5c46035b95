//! Parameter types for image operations.
//!
//! Operations receive their arguments as a `&[Value]` slice. The helpers here
//! pull typed parameters out of it and turn a missing or mistyped argument
//! into [`BackendError::BadArgument`] naming the operation.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1–100). Clamped on construction.
//! - [`EncodeSettings`]: encoder and resampling defaults resolved from config.

use crate::config::{Config, FilterName};
use crate::registry::{BackendError, Value};
use image::imageops::FilterType;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// The value as the `u8` the `image` encoders take.
    pub fn as_u8(self) -> u8 {
        self.0.clamp(1, 100) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Defaults applied by the `image` backend when an operation doesn't say otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeSettings {
    pub jpeg_quality: Quality,
    pub avif_quality: Quality,
    pub avif_speed: u8,
    pub filter: FilterType,
}

impl EncodeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            jpeg_quality: Quality::new(config.encoding.jpeg_quality),
            avif_quality: Quality::new(config.encoding.avif_quality),
            avif_speed: config.encoding.avif_speed.clamp(1, 10),
            filter: filter_type(config.resize.filter),
        }
    }
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub fn filter_type(name: FilterName) -> FilterType {
    match name {
        FilterName::Nearest => FilterType::Nearest,
        FilterName::Triangle => FilterType::Triangle,
        FilterName::CatmullRom => FilterType::CatmullRom,
        FilterName::Gaussian => FilterType::Gaussian,
        FilterName::Lanczos3 => FilterType::Lanczos3,
    }
}

fn bad(operation: &'static str, message: impl Into<String>) -> BackendError {
    BackendError::BadArgument {
        operation,
        message: message.into(),
    }
}

fn required<'a>(operation: &'static str, args: &'a [Value]) -> Result<&'a Value, BackendError> {
    if args.len() > 1 {
        return Err(bad(
            operation,
            format!("expected 1 argument, got {}", args.len()),
        ));
    }
    args.first()
        .ok_or_else(|| bad(operation, "missing argument"))
}

/// Operations that take no arguments.
pub fn no_args(operation: &'static str, args: &[Value]) -> Result<(), BackendError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(bad(
            operation,
            format!("expected no arguments, got {}", args.len()),
        ))
    }
}

pub fn size_arg(operation: &'static str, args: &[Value]) -> Result<(u32, u32), BackendError> {
    match required(operation, args)? {
        Value::Size(w, h) => Ok((*w, *h)),
        other => Err(bad(operation, format!("expected a size, got {other:?}"))),
    }
}

pub fn rect_arg(
    operation: &'static str,
    args: &[Value],
) -> Result<(i64, i64, i64, i64), BackendError> {
    match required(operation, args)? {
        Value::Rect(l, t, r, b) => Ok((*l, *t, *r, *b)),
        other => Err(bad(operation, format!("expected a rectangle, got {other:?}"))),
    }
}

pub fn int_arg(operation: &'static str, args: &[Value]) -> Result<i64, BackendError> {
    match required(operation, args)? {
        Value::Int(i) => Ok(*i),
        other => Err(bad(operation, format!("expected an integer, got {other:?}"))),
    }
}

pub fn rgb_arg(operation: &'static str, args: &[Value]) -> Result<[u8; 3], BackendError> {
    match required(operation, args)? {
        Value::Rgb(rgb) => Ok(*rgb),
        other => Err(bad(
            operation,
            format!("the 'color' argument must be an RGB triple, got {other:?}"),
        )),
    }
}

/// Optional quality override; `default` when no argument is given.
pub fn quality_arg(
    operation: &'static str,
    args: &[Value],
    default: Quality,
) -> Result<Quality, BackendError> {
    if args.is_empty() {
        return Ok(default);
    }
    let value = int_arg(operation, args)?;
    if !(1..=100).contains(&value) {
        return Err(bad(operation, format!("quality must be 1-100, got {value}")));
    }
    Ok(Quality::new(value as u32))
}
