//! Image backends, pure Rust, no system libraries.
//!
//! Each backend is a [`Plugin`](crate::registry::Plugin) that registers the
//! classes it owns, their operations, and converters to and from the classes
//! of other backends.
//!
//! | Backend | Crate | Classes |
//! |---|---|---|
//! | **Files** | `image::guess_format` | one per container format |
//! | **Buffers** | none | `RgbBuffer`, `RgbaBuffer` |
//! | **image** | `image` (decode, resize, encode, rav1e AVIF encoder) | `RustImage` |
//! | **AVIF** | `avif-parse` + `rav1d` | `Av1Frame` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop, rotation and pixel math (unit testable)
//! - **Parameters**: Typed argument extraction and encoder defaults
//! - **Backends**: `files`, `buffers`, `rust_backend`, `avif`
//! - **Backend set**: [`default_registry`] wiring them together

pub mod avif;
pub mod backend;
pub mod buffers;
mod calculations;
pub mod files;
mod params;
pub mod rust_backend;

pub use avif::{AV1_FRAME, Av1Frame, AvifPlugin};
pub use backend::{default_plugins, default_registry};
pub use buffers::{BuffersPlugin, Layout, PixelBuffer, RGB_BUFFER, RGBA_BUFFER};
pub use calculations::{CropBox, Rotation, clamp_crop, normalize_rotation};
pub use files::{EncodedFile, FileFormat, FilesPlugin, Sniffed};
pub use params::{EncodeSettings, Quality};
pub use rust_backend::{RUST_IMAGE, RustImage, RustImagePlugin, save_operation_name};
