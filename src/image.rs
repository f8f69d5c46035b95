//! The dispatch proxy.
//!
//! An [`Image`] owns one representation at a time and forwards every
//! operation through the router. When the current class can't run the
//! operation, the conversion path is replayed step by step and each
//! intermediate representation is adopted, so later operations start from
//! wherever the last one left off:
//!
//! ```text
//! open(png bytes)   PngFile
//! invoke("resize")  PngFile -> RustImage          resize runs on RustImage
//! invoke("crop")    RustImage                     no conversion needed
//! save("jpeg")      RustImage -> JpegFile         save_as_jpeg returns the file
//! ```
//!
//! Converters borrow the current state, so a conversion that fails leaves the
//! image holding the representation it had before.

use crate::imaging::{EncodedFile, FileFormat, Sniffed, save_operation_name};
use crate::registry::{
    BackendError, ClassId, ImageState, Outcome, RoutingError, Router, Value, downcast,
};
use log::{debug, info};
use std::io::{Read, Write};
use thiserror::Error;

/// Format names accepted by [`Image::save`].
pub const SAVE_FORMATS: [&str; 8] = ["jpeg", "png", "gif", "bmp", "tiff", "webp", "avif", "ico"];

#[derive(Error, Debug)]
pub enum ImageError {
    /// `Unknown image format` or `Cannot load <format> images`.
    #[error("{0}")]
    UnrecognisedFormat(String),
    #[error("Unknown image format: {0}")]
    UnknownSaveFormat(String),
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct Image<'r> {
    router: &'r Router<'r>,
    state: Box<dyn ImageState>,
    trail: Vec<ClassId>,
}

impl<'r> Image<'r> {
    /// Wrap an existing representation.
    pub fn new(router: &'r Router<'r>, state: Box<dyn ImageState>) -> Self {
        let trail = vec![state.class()];
        Self {
            router,
            state,
            trail,
        }
    }

    /// Read an encoded image and start from its file class.
    pub fn open(router: &'r Router<'r>, mut input: impl Read) -> Result<Self, ImageError> {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;

        let format = match FileFormat::sniff(&data) {
            Sniffed::Format(format) => format,
            Sniffed::Unsupported(name) => {
                return Err(ImageError::UnrecognisedFormat(format!(
                    "Cannot load {name} images"
                )));
            }
            Sniffed::Unknown => {
                return Err(ImageError::UnrecognisedFormat(
                    "Unknown image format".into(),
                ));
            }
        };
        info!("Opened {format} image ({} bytes)", data.len());
        Ok(Self::new(router, Box::new(EncodedFile::new(format, data))))
    }

    /// Run `operation`, converting first if the current class doesn't have it.
    ///
    /// Operations that produce a new representation return [`Value::Unit`].
    pub fn invoke(&mut self, operation: &str, args: &[Value]) -> Result<Value, ImageError> {
        let resolution = self
            .router
            .resolve_operation(self.state.class(), operation)?;

        for step in resolution.path.steps() {
            debug!("Converting {} to {} for '{operation}'", step.from, step.to);
            let next = step.convert(&*self.state)?;
            if next.class() != step.to {
                return Err(BackendError::WrongRepresentation {
                    expected: step.to.name(),
                    found: next.class(),
                }
                .into());
            }
            self.adopt(next);
        }

        match (resolution.operation)(&*self.state, args)? {
            Outcome::Value(value) => Ok(value),
            Outcome::State(state) => {
                self.adopt(state);
                Ok(Value::Unit)
            }
        }
    }

    /// Encode as `format` and write the file to `output`.
    pub fn save(&mut self, format: &str, output: &mut impl Write) -> Result<(), ImageError> {
        self.save_with(format, output, &[])
    }

    /// Like [`save`](Self::save), passing `args` (e.g. a quality) to the encoder.
    pub fn save_with(
        &mut self,
        format: &str,
        output: &mut impl Write,
        args: &[Value],
    ) -> Result<(), ImageError> {
        let file_format = SAVE_FORMATS
            .contains(&format)
            .then(|| FileFormat::from_name(format))
            .flatten()
            .ok_or_else(|| ImageError::UnknownSaveFormat(format.to_string()))?;

        self.invoke(&save_operation_name(file_format), args)?;
        let file = downcast::<EncodedFile>(&*self.state)?;
        output.write_all(&file.data)?;
        info!("Saved {file_format} image ({} bytes)", file.data.len());
        Ok(())
    }

    fn adopt(&mut self, state: Box<dyn ImageState>) {
        let class = state.class();
        if self.trail.last() != Some(&class) {
            self.trail.push(class);
        }
        self.state = state;
    }

    pub fn class(&self) -> ClassId {
        self.state.class()
    }

    pub fn state(&self) -> &dyn ImageState {
        &*self.state
    }

    /// Every class this image has been held as, oldest first.
    pub fn trail(&self) -> &[ClassId] {
        &self.trail
    }

    pub fn into_state(self) -> Box<dyn ImageState> {
        self.state
    }
}
