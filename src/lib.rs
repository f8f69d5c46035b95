//! # imgroute
//!
//! One image handle, many backends. An [`Image`] holds whatever
//! representation it currently has (an encoded PNG, an RGB buffer, a decoded
//! AV1 frame) and runs every operation you ask for, converting itself into
//! another representation first when the current one can't do it.
//!
//! # Architecture: Classes, Operations, Converters
//!
//! Every representation is a **class**. Backends register:
//!
//! ```text
//! classes      PngFile, RustImage, Av1Frame, RgbBuffer, ...
//! operations   RustImage.resize, Av1Frame.has_alpha, PngFile.get_format_name
//! converters   PngFile → RustImage (100), AvifFile → Av1Frame (100), ...
//! ```
//!
//! Invoking an operation the current class doesn't have asks the router for
//! the cheapest chain of converters to a class that has it:
//!
//! ```text
//! image.invoke("resize", ..) on AvifFile
//!   AvifFile → Av1Frame → RgbBuffer → RustImage   (cost 250)
//!   RustImage.resize
//! ```
//!
//! The image keeps the converted state. A second `resize` runs directly.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`registry`] | Class, operation and converter tables; availability probes; path routing |
//! | [`image`] | The dispatching [`Image`] handle: open, invoke, save |
//! | [`imaging`] | Stock backends: container files, raw buffers, the `image` crate, AV1 decoding |
//! | [`config`] | `imgroute.toml` loading, stock defaults, validation |
//! | [`output`] | CLI output formatting for `info`, `classes`, `route` and `convert` |
//!
//! # Design Decisions
//!
//! ## Explicit Registry Over Global State
//!
//! The registry is a value, built once by [`imaging::default_registry`] and
//! borrowed by the [`registry::Router`]. Nothing registers itself behind
//! your back, tests build small registries of their own, and two registries
//! with different backends can live side by side.
//!
//! ## Costs Are Integers
//!
//! Converter costs are plain `u32` weights, 100 by default. A cheap reshuffle
//! of bytes (an AV1 frame into an RGB buffer) is 50. The route with the lowest
//! total wins; on a tie the first route found wins, so registration order
//! decides.
//!
//! ## Probes Run Once Per Resolution
//!
//! A backend can fail to load at runtime (the AV1 decoder is an optional
//! feature). The router probes each candidate class once per resolution and
//! never routes through a class whose probe failed. Set
//! `probes.cache = true` to remember results for the lifetime of the router,
//! or list classes under `probes.disabled` to switch them off outright.
//!
//! ## Pure-Rust Imaging
//!
//! Every stock backend is pure Rust: `image` for decoding, resampling and
//! encoding (rav1e for AVIF), `avif-parse` and `rav1d` for AVIF decoding. No
//! system libraries to install.

pub mod config;
pub mod image;
pub mod imaging;
pub mod output;
pub mod registry;

pub use image::{Image, ImageError, SAVE_FORMATS};
