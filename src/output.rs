//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Classes
//!
//! ```text
//! Classes
//! PngFile
//!     Operations: get_format_name, get_mime_type
//!     Converts to: RustImage (100)
//! Av1Frame (unavailable: disabled by configuration)
//!     Operations: get_frame_count, get_size, has_alpha, has_animation
//!     Converts to: RgbBuffer (50)
//! ```
//!
//! ## Route
//!
//! ```text
//! resize from AvifFile → RustImage (cost 250)
//!     AvifFile → Av1Frame (100)
//!     Av1Frame → RgbBuffer (50)
//!     RgbBuffer → RustImage (100)
//! ```
//!
//! ## Convert
//!
//! ```text
//! PngFile → RustImage → JpegFile
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! do no I/O.

use crate::registry::{AvailabilitySnapshot, ClassId, Registry, Resolution};
use serde::Serialize;

/// Summary printed by `imgroute info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfo {
    pub format: String,
    pub mime_type: String,
    pub class: String,
    pub width: u32,
    pub height: u32,
    pub has_alpha: bool,
    pub has_animation: bool,
    pub frame_count: i64,
}

pub fn format_trail(trail: &[ClassId]) -> String {
    trail
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(" → ")
}

pub fn format_classes(registry: &Registry, availability: &AvailabilitySnapshot) -> Vec<String> {
    let mut lines = vec!["Classes".to_string()];
    for &class in registry.classes() {
        match availability.failure(class) {
            Some(reason) => lines.push(format!("{class} (unavailable: {reason})")),
            None => lines.push(class.to_string()),
        }

        let operations = registry.operations_of(class);
        if !operations.is_empty() {
            lines.push(format!("    Operations: {}", operations.join(", ")));
        }

        let targets: Vec<String> = registry
            .converters_from(class)
            .map(|c| format!("{} ({})", c.to, c.cost))
            .collect();
        if !targets.is_empty() {
            lines.push(format!("    Converts to: {}", targets.join(", ")));
        }
    }
    lines
}

pub fn print_classes(registry: &Registry, availability: &AvailabilitySnapshot) {
    for line in format_classes(registry, availability) {
        println!("{line}");
    }
}

pub fn format_resolution(operation: &str, start: ClassId, resolution: &Resolution<'_>) -> Vec<String> {
    if resolution.path.is_empty() {
        return vec![format!("{operation} runs on {start} directly")];
    }
    let mut lines = vec![format!(
        "{operation} from {start} → {} (cost {})",
        resolution.class, resolution.cost
    )];
    for step in resolution.path.steps() {
        lines.push(format!("    {} → {} ({})", step.from, step.to, step.cost));
    }
    lines
}

pub fn print_resolution(operation: &str, start: ClassId, resolution: &Resolution<'_>) {
    for line in format_resolution(operation, start, resolution) {
        println!("{line}");
    }
}

pub fn format_info(info: &ImageInfo) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(info)
}

pub fn print_info(info: &ImageInfo) -> Result<(), serde_json::Error> {
    println!("{}", format_info(info)?);
    Ok(())
}
