//! The stock set of backends.
//!
//! [`default_registry`] registers every backend compiled into the binary, in
//! a fixed order. The order matters: it is the candidate order the router
//! uses to break cost ties, and the files plugin has to come before the AVIF
//! plugin, which adds `get_size` to the `AvifFile` class.
//!
//! | Plugin | Classes |
//! |---|---|
//! | [`FilesPlugin`] | `JpegFile`, `PngFile`, `GifFile`, `BmpFile`, `TiffFile`, `WebpFile`, `AvifFile`, `IcoFile` |
//! | [`BuffersPlugin`] | `RgbBuffer`, `RgbaBuffer` |
//! | [`RustImagePlugin`] | `RustImage` |
//! | [`AvifPlugin`] | `Av1Frame` |

use super::avif::AvifPlugin;
use super::buffers::BuffersPlugin;
use super::files::FilesPlugin;
use super::params::EncodeSettings;
use super::rust_backend::RustImagePlugin;
use crate::config::Config;
use crate::registry::{Plugin, Registry};

/// Backends in registration order.
pub fn default_plugins(config: &Config) -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(FilesPlugin),
        Box::new(BuffersPlugin),
        Box::new(RustImagePlugin::new(EncodeSettings::from_config(config))),
        Box::new(AvifPlugin),
    ]
}

/// A registry with every stock backend registered.
pub fn default_registry(config: &Config) -> Registry {
    let mut registry = Registry::new();
    for plugin in default_plugins(config) {
        registry.register_plugin(plugin.as_ref());
    }
    registry
}
