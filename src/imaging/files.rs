//! Encoded image files.
//!
//! Every container format gets its own class so the router can tell a PNG
//! from an AVIF; all of them share the [`EncodedFile`] representation. These
//! classes are where [`Image::open`](crate::Image::open) starts and where the
//! `save_as_*` operations end.
//!
//! | Format | Class | Sniffed by |
//! |---|---|---|
//! | JPEG | `JpegFile` | `image::guess_format` |
//! | PNG | `PngFile` | `image::guess_format` |
//! | GIF | `GifFile` | `image::guess_format` |
//! | BMP | `BmpFile` | `image::guess_format` |
//! | TIFF | `TiffFile` | `image::guess_format` |
//! | WebP | `WebpFile` | `image::guess_format` |
//! | AVIF | `AvifFile` | ISO-BMFF `ftyp` brand |
//! | ICO | `IcoFile` | `image::guess_format` |

use super::params::no_args;
use crate::registry::{
    BackendError, ClassId, ClassRegistration, ImageState, Outcome, Plugin, Registry, Value,
    downcast,
};
use image::ImageFormat;
use std::any::Any;
use std::fmt;

pub const JPEG_FILE: ClassId = ClassId::new("JpegFile");
pub const PNG_FILE: ClassId = ClassId::new("PngFile");
pub const GIF_FILE: ClassId = ClassId::new("GifFile");
pub const BMP_FILE: ClassId = ClassId::new("BmpFile");
pub const TIFF_FILE: ClassId = ClassId::new("TiffFile");
pub const WEBP_FILE: ClassId = ClassId::new("WebpFile");
pub const AVIF_FILE: ClassId = ClassId::new("AvifFile");
pub const ICO_FILE: ClassId = ClassId::new("IcoFile");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
    Webp,
    Avif,
    Ico,
}

/// Result of looking at the first bytes of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sniffed {
    Format(FileFormat),
    /// Recognised, but no class exists for it (e.g. `"qoi"`).
    Unsupported(String),
    Unknown,
}

impl FileFormat {
    pub const ALL: [FileFormat; 8] = [
        FileFormat::Jpeg,
        FileFormat::Png,
        FileFormat::Gif,
        FileFormat::Bmp,
        FileFormat::Tiff,
        FileFormat::Webp,
        FileFormat::Avif,
        FileFormat::Ico,
    ];

    /// Name used by `save` and `get_format_name`.
    pub fn name(self) -> &'static str {
        match self {
            FileFormat::Jpeg => "jpeg",
            FileFormat::Png => "png",
            FileFormat::Gif => "gif",
            FileFormat::Bmp => "bmp",
            FileFormat::Tiff => "tiff",
            FileFormat::Webp => "webp",
            FileFormat::Avif => "avif",
            FileFormat::Ico => "ico",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            FileFormat::Jpeg => "image/jpeg",
            FileFormat::Png => "image/png",
            FileFormat::Gif => "image/gif",
            FileFormat::Bmp => "image/bmp",
            FileFormat::Tiff => "image/tiff",
            FileFormat::Webp => "image/webp",
            FileFormat::Avif => "image/avif",
            FileFormat::Ico => "image/x-icon",
        }
    }

    pub fn class(self) -> ClassId {
        match self {
            FileFormat::Jpeg => JPEG_FILE,
            FileFormat::Png => PNG_FILE,
            FileFormat::Gif => GIF_FILE,
            FileFormat::Bmp => BMP_FILE,
            FileFormat::Tiff => TIFF_FILE,
            FileFormat::Webp => WEBP_FILE,
            FileFormat::Avif => AVIF_FILE,
            FileFormat::Ico => ICO_FILE,
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            FileFormat::Jpeg => ImageFormat::Jpeg,
            FileFormat::Png => ImageFormat::Png,
            FileFormat::Gif => ImageFormat::Gif,
            FileFormat::Bmp => ImageFormat::Bmp,
            FileFormat::Tiff => ImageFormat::Tiff,
            FileFormat::Webp => ImageFormat::WebP,
            FileFormat::Avif => ImageFormat::Avif,
            FileFormat::Ico => ImageFormat::Ico,
        }
    }

    /// Parse a format name or file extension, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(FileFormat::Jpeg),
            "png" => Some(FileFormat::Png),
            "gif" => Some(FileFormat::Gif),
            "bmp" => Some(FileFormat::Bmp),
            "tiff" | "tif" => Some(FileFormat::Tiff),
            "webp" => Some(FileFormat::Webp),
            "avif" => Some(FileFormat::Avif),
            "ico" => Some(FileFormat::Ico),
            _ => None,
        }
    }

    pub fn from_class(class: ClassId) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.class() == class)
    }

    /// Detect the format of an encoded file from its leading bytes.
    pub fn sniff(bytes: &[u8]) -> Sniffed {
        if is_avif(bytes) {
            return Sniffed::Format(FileFormat::Avif);
        }
        match image::guess_format(bytes) {
            Ok(ImageFormat::Jpeg) => Sniffed::Format(FileFormat::Jpeg),
            Ok(ImageFormat::Png) => Sniffed::Format(FileFormat::Png),
            Ok(ImageFormat::Gif) => Sniffed::Format(FileFormat::Gif),
            Ok(ImageFormat::Bmp) => Sniffed::Format(FileFormat::Bmp),
            Ok(ImageFormat::Tiff) => Sniffed::Format(FileFormat::Tiff),
            Ok(ImageFormat::WebP) => Sniffed::Format(FileFormat::Webp),
            Ok(ImageFormat::Avif) => Sniffed::Format(FileFormat::Avif),
            Ok(ImageFormat::Ico) => Sniffed::Format(FileFormat::Ico),
            Ok(other) => Sniffed::Unsupported(
                other
                    .extensions_str()
                    .first()
                    .copied()
                    .unwrap_or("unknown")
                    .to_string(),
            ),
            Err(_) => Sniffed::Unknown,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// AVIF is an ISO-BMFF file whose `ftyp` box lists an `avif`/`avis` brand.
fn is_avif(bytes: &[u8]) -> bool {
    if bytes.len() < 16 || &bytes[4..8] != b"ftyp" {
        return false;
    }
    let box_len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let end = box_len.clamp(16, bytes.len());
    // major brand at 8..12, minor version at 12..16, compatible brands after
    std::iter::once(&bytes[8..12])
        .chain(bytes[16..end].chunks_exact(4))
        .any(|brand| brand == b"avif" || brand == b"avis")
}

/// The bytes of an encoded image in a known container format.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedFile {
    pub format: FileFormat,
    pub data: Vec<u8>,
}

impl EncodedFile {
    pub fn new(format: FileFormat, data: Vec<u8>) -> Self {
        Self { format, data }
    }
}

impl fmt::Debug for EncodedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncodedFile({}, {} bytes)", self.format, self.data.len())
    }
}

impl ImageState for EncodedFile {
    fn class(&self) -> ClassId {
        self.format.class()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Registers one class per [`FileFormat`].
pub struct FilesPlugin;

impl Plugin for FilesPlugin {
    fn name(&self) -> &'static str {
        "files"
    }

    fn register(&self, registry: &mut Registry) {
        for format in FileFormat::ALL {
            registry.register_class(
                ClassRegistration::new(format.class())
                    .operation("get_format_name", |state, args| {
                        no_args("get_format_name", args)?;
                        let file = downcast::<EncodedFile>(state)?;
                        Ok(Outcome::Value(Value::from(file.format.name())))
                    })
                    .operation("get_mime_type", |state, args| {
                        no_args("get_mime_type", args)?;
                        let file = downcast::<EncodedFile>(state)?;
                        Ok(Outcome::Value(Value::from(file.format.mime_type())))
                    }),
            );
        }
    }
}

/// Checks that `state` is an [`EncodedFile`] of `format`.
pub(crate) fn expect_file(
    state: &dyn ImageState,
    format: FileFormat,
) -> Result<&EncodedFile, BackendError> {
    let file = downcast::<EncodedFile>(state)?;
    if file.format != format {
        return Err(BackendError::WrongRepresentation {
            expected: format.name(),
            found: file.class(),
        });
    }
    Ok(file)
}
