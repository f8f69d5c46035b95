//! Packed pixel buffers.
//!
//! Plain 8-bit interleaved pixels with no codec attached. They are the common
//! ground between backends: the AV1 decoder produces an RGB buffer and the
//! `image` backend can load either layout.

use super::params::no_args;
use crate::registry::{
    BackendError, ClassId, ClassRegistration, ImageState, Outcome, Plugin, Registry, Value,
    downcast,
};
use std::any::Any;
use std::fmt;

pub const RGB_BUFFER: ClassId = ClassId::new("RgbBuffer");
pub const RGBA_BUFFER: ClassId = ClassId::new("RgbaBuffer");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Rgb,
    Rgba,
}

impl Layout {
    pub fn channels(self) -> usize {
        match self {
            Layout::Rgb => 3,
            Layout::Rgba => 4,
        }
    }

    pub fn class(self) -> ClassId {
        match self {
            Layout::Rgb => RGB_BUFFER,
            Layout::Rgba => RGBA_BUFFER,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    layout: Layout,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap `data`, which must hold exactly `width * height` pixels of `layout`.
    pub fn new(layout: Layout, width: u32, height: u32, data: Vec<u8>) -> Result<Self, BackendError> {
        let expected = width as usize * height as usize * layout.channels();
        if data.len() != expected {
            return Err(BackendError::ProcessingFailed(format!(
                "{width}x{height} {layout:?} buffer needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            layout,
            width,
            height,
            data,
        })
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PixelBuffer({:?}, {}x{})", self.layout, self.width, self.height)
    }
}

impl ImageState for PixelBuffer {
    fn class(&self) -> ClassId {
        self.layout.class()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct BuffersPlugin;

impl Plugin for BuffersPlugin {
    fn name(&self) -> &'static str {
        "buffers"
    }

    fn register(&self, registry: &mut Registry) {
        for layout in [Layout::Rgb, Layout::Rgba] {
            registry.register_class(
                ClassRegistration::new(layout.class())
                    .operation("get_size", |state, args| {
                        no_args("get_size", args)?;
                        let (w, h) = downcast::<PixelBuffer>(state)?.size();
                        Ok(Outcome::Value(Value::Size(w, h)))
                    })
                    .operation("has_alpha", |state, args| {
                        no_args("has_alpha", args)?;
                        let buffer = downcast::<PixelBuffer>(state)?;
                        Ok(Outcome::Value(Value::Bool(buffer.layout == Layout::Rgba)))
                    })
                    .operation("has_animation", |_, args| {
                        no_args("has_animation", args)?;
                        Ok(Outcome::Value(Value::Bool(false)))
                    }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(registry: &Registry, class: ClassId, op: &str, state: &dyn ImageState) -> Value {
        let func = registry.get_operation(class, op).unwrap();
        match func(state, &[]).unwrap() {
            Outcome::Value(v) => v,
            Outcome::State(_) => panic!("expected a value"),
        }
    }

    #[test]
    fn new_checks_buffer_length() {
        assert!(PixelBuffer::new(Layout::Rgb, 2, 2, vec![0; 12]).is_ok());
        assert!(PixelBuffer::new(Layout::Rgba, 2, 2, vec![0; 12]).is_err());
        assert!(PixelBuffer::new(Layout::Rgb, 0, 0, Vec::new()).is_ok());
    }

    #[test]
    fn class_follows_layout() {
        let rgb = PixelBuffer::new(Layout::Rgb, 1, 1, vec![0; 3]).unwrap();
        let rgba = PixelBuffer::new(Layout::Rgba, 1, 1, vec![0; 4]).unwrap();
        assert_eq!(rgb.class(), RGB_BUFFER);
        assert_eq!(rgba.class(), RGBA_BUFFER);
    }

    #[test]
    fn operations_report_size_and_alpha() {
        let mut registry = Registry::new();
        registry.register_plugin(&BuffersPlugin);

        let rgba = PixelBuffer::new(Layout::Rgba, 3, 2, vec![0; 24]).unwrap();
        assert_eq!(run(&registry, RGBA_BUFFER, "get_size", &rgba), Value::Size(3, 2));
        assert_eq!(run(&registry, RGBA_BUFFER, "has_alpha", &rgba), Value::Bool(true));
        assert_eq!(run(&registry, RGBA_BUFFER, "has_animation", &rgba), Value::Bool(false));

        let rgb = PixelBuffer::new(Layout::Rgb, 1, 1, vec![0; 3]).unwrap();
        assert_eq!(run(&registry, RGB_BUFFER, "has_alpha", &rgb), Value::Bool(false));
    }
}
