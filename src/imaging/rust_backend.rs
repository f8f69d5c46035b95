//! Pure Rust image backend built on the `image` crate.
//!
//! Everything is statically linked into the binary, so the class probe always
//! succeeds.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, BMP, TIFF, WebP, ICO) | `ImageReader::with_format` + `DynamicImage::from_decoder` |
//! | Resize | `DynamicImage::resize_exact` with the configured filter |
//! | Crop | `DynamicImage::crop_imm` after [`clamp_crop`](super::calculations::clamp_crop) |
//! | Rotate | `rotate90` / `rotate180` / `rotate270` |
//! | Auto-orient | `ImageDecoder::orientation` at decode, `DynamicImage::apply_orientation` |
//! | Background fill | per-pixel [`blend_over`](super::calculations::blend_over) |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → AVIF | `AvifEncoder::new_with_speed_quality` (rav1e) |
//! | Encode → others | `DynamicImage::write_to` |
//!
//! AVIF files are not decoded here: the `image` crate's `"avif"` feature only
//! provides the encoder. They reach this backend through the AV1 decoder and
//! an RGB buffer.

use super::buffers::{Layout, PixelBuffer, RGB_BUFFER, RGBA_BUFFER};
use super::calculations::{Rotation, blend_over, clamp_crop, normalize_rotation};
use super::files::{EncodedFile, FileFormat, expect_file};
use super::params::{
    EncodeSettings, Quality, int_arg, no_args, quality_arg, rect_arg, rgb_arg, size_arg,
};
use crate::registry::{
    BackendError, ClassId, ClassRegistration, ImageState, Outcome, Plugin, Registry, Value,
    downcast,
};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, RgbImage, RgbaImage};
use std::any::Any;
use std::io::Cursor;

pub const RUST_IMAGE: ClassId = ClassId::new("RustImage");

/// A decoded image held by the `image` crate.
///
/// `orientation` is the EXIF orientation of the file it was decoded from. It
/// survives resize, crop and the other pixel operations, and is only applied
/// (and reset) by `auto_orient`.
#[derive(Debug, Clone, PartialEq)]
pub struct RustImage {
    pub image: DynamicImage,
    pub orientation: Orientation,
}

impl RustImage {
    /// An image with no pending orientation.
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            orientation: Orientation::NoTransforms,
        }
    }

    /// New pixels, same orientation.
    fn replaced(&self, image: DynamicImage) -> Outcome {
        Outcome::State(Box::new(Self {
            image,
            orientation: self.orientation,
        }))
    }

    /// `None` when there is nothing to apply.
    fn oriented(&self) -> Option<Self> {
        if self.orientation == Orientation::NoTransforms {
            return None;
        }
        let mut image = self.image.clone();
        image.apply_orientation(self.orientation);
        Some(Self::new(image))
    }
}

impl ImageState for RustImage {
    fn class(&self) -> ClassId {
        RUST_IMAGE
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn image_of(state: &dyn ImageState) -> Result<&DynamicImage, BackendError> {
    downcast::<RustImage>(state).map(|s| &s.image)
}

/// Decode an encoded file of `format`, keeping its EXIF orientation.
fn load_image(state: &dyn ImageState, format: FileFormat) -> Result<RustImage, BackendError> {
    let file = expect_file(state, format)?;
    let failed =
        |e: image::ImageError| BackendError::ProcessingFailed(format!("Failed to decode {format}: {e}"));
    let mut decoder = ImageReader::with_format(Cursor::new(&file.data), format.image_format())
        .into_decoder()
        .map_err(failed)?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let image = DynamicImage::from_decoder(decoder).map_err(failed)?;
    Ok(RustImage { image, orientation })
}

fn from_buffer(state: &dyn ImageState) -> Result<DynamicImage, BackendError> {
    let buffer = downcast::<PixelBuffer>(state)?;
    let (w, h) = buffer.size();
    let data = buffer.data().to_vec();
    let img = match buffer.layout() {
        Layout::Rgb => RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
        Layout::Rgba => RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
    };
    img.ok_or_else(|| BackendError::ProcessingFailed("Buffer does not match its size".into()))
}

fn to_buffer(state: &dyn ImageState, layout: Layout) -> Result<PixelBuffer, BackendError> {
    let img = image_of(state)?;
    let (w, h) = (img.width(), img.height());
    let data = match layout {
        Layout::Rgb => img.to_rgb8().into_raw(),
        Layout::Rgba => img.to_rgba8().into_raw(),
    };
    PixelBuffer::new(layout, w, h, data)
}

/// 8-bit RGB or RGBA, whichever keeps the alpha channel.
fn to_8bit(img: &DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}

/// Encode into `format`, returning the file bytes.
fn encode(
    img: &DynamicImage,
    format: FileFormat,
    quality: Quality,
    settings: &EncodeSettings,
) -> Result<Vec<u8>, BackendError> {
    let mut out = Cursor::new(Vec::new());
    let result = match format {
        FileFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut out, quality.as_u8());
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)
        }
        FileFormat::Avif => {
            let encoder =
                AvifEncoder::new_with_speed_quality(&mut out, settings.avif_speed, quality.as_u8());
            to_8bit(img).write_with_encoder(encoder)
        }
        FileFormat::Gif | FileFormat::Webp | FileFormat::Ico => {
            DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut out, format.image_format())
        }
        FileFormat::Bmp => to_8bit(img).write_to(&mut out, format.image_format()),
        FileFormat::Png | FileFormat::Tiff => img.write_to(&mut out, format.image_format()),
    };
    result.map_err(|e| BackendError::ProcessingFailed(format!("{format} encode failed: {e}")))?;
    Ok(out.into_inner())
}

fn crop(img: &DynamicImage, rect: (i64, i64, i64, i64)) -> Result<DynamicImage, BackendError> {
    let area = clamp_crop(rect, (img.width(), img.height()))
        .ok_or_else(|| BackendError::InvalidOperation(format!("Invalid crop dimensions: {rect:?}")))?;
    Ok(img.crop_imm(area.x, area.y, area.width, area.height))
}

/// `None` when the rotation is a no-op.
fn rotate(img: &DynamicImage, angle: i64) -> Result<Option<DynamicImage>, BackendError> {
    let rotation = normalize_rotation(angle).ok_or_else(|| {
        BackendError::InvalidOperation(
            "Only right angle rotations are supported, i.e. multiples of 90 degrees".into(),
        )
    })?;
    // image's rotate90 is clockwise; angles here are counter-clockwise
    Ok(match rotation {
        Rotation::None => None,
        Rotation::Quarter => Some(img.rotate270()),
        Rotation::Half => Some(img.rotate180()),
        Rotation::ThreeQuarters => Some(img.rotate90()),
    })
}

/// Flatten onto an opaque `color`. `None` if the image has no alpha channel.
fn set_background(img: &DynamicImage, color: [u8; 3]) -> Option<DynamicImage> {
    if !img.color().has_alpha() {
        return None;
    }
    let rgba = img.to_rgba8();
    let flattened = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        image::Rgb(blend_over(color, rgba.get_pixel(x, y).0))
    });
    Some(DynamicImage::ImageRgb8(flattened))
}

/// Registers the `RustImage` class.
pub struct RustImagePlugin {
    settings: EncodeSettings,
}

impl RustImagePlugin {
    pub fn new(settings: EncodeSettings) -> Self {
        Self { settings }
    }
}

impl Default for RustImagePlugin {
    fn default() -> Self {
        Self::new(EncodeSettings::default())
    }
}

/// File formats the `image` crate can decode with the features compiled in.
const DECODABLE: [FileFormat; 7] = [
    FileFormat::Jpeg,
    FileFormat::Png,
    FileFormat::Gif,
    FileFormat::Bmp,
    FileFormat::Tiff,
    FileFormat::Webp,
    FileFormat::Ico,
];

impl Plugin for RustImagePlugin {
    fn name(&self) -> &'static str {
        "image"
    }

    fn register(&self, registry: &mut Registry) {
        let settings = self.settings;
        let mut class = ClassRegistration::new(RUST_IMAGE)
            .probe(|| Ok(()))
            .operation("get_size", |state, args| {
                no_args("get_size", args)?;
                let img = image_of(state)?;
                Ok(Outcome::Value(Value::Size(img.width(), img.height())))
            })
            .operation("get_frame_count", |state, args| {
                no_args("get_frame_count", args)?;
                image_of(state)?;
                Ok(Outcome::Value(Value::Int(1)))
            })
            .operation("has_alpha", |state, args| {
                no_args("has_alpha", args)?;
                let img = image_of(state)?;
                Ok(Outcome::Value(Value::Bool(img.color().has_alpha())))
            })
            .operation("has_animation", |state, args| {
                no_args("has_animation", args)?;
                image_of(state)?;
                Ok(Outcome::Value(Value::Bool(false)))
            })
            .operation("resize", move |state, args| {
                let (w, h) = size_arg("resize", args)?;
                if w == 0 || h == 0 {
                    return Err(BackendError::BadArgument {
                        operation: "resize",
                        message: format!("size must be non-zero, got {w}x{h}"),
                    });
                }
                let source = downcast::<RustImage>(state)?;
                Ok(source.replaced(source.image.resize_exact(w, h, settings.filter)))
            })
            .operation("crop", |state, args| {
                let rect = rect_arg("crop", args)?;
                let source = downcast::<RustImage>(state)?;
                Ok(source.replaced(crop(&source.image, rect)?))
            })
            .operation("rotate", |state, args| {
                let angle = int_arg("rotate", args)?;
                let source = downcast::<RustImage>(state)?;
                Ok(match rotate(&source.image, angle)? {
                    Some(img) => source.replaced(img),
                    None => Outcome::Value(Value::Unit),
                })
            })
            .operation("set_background_color_rgb", |state, args| {
                let color = rgb_arg("set_background_color_rgb", args)?;
                let source = downcast::<RustImage>(state)?;
                Ok(match set_background(&source.image, color) {
                    Some(img) => source.replaced(img),
                    None => Outcome::Value(Value::Unit),
                })
            })
            .operation("auto_orient", |state, args| {
                no_args("auto_orient", args)?;
                Ok(match downcast::<RustImage>(state)?.oriented() {
                    Some(oriented) => Outcome::State(Box::new(oriented)),
                    None => Outcome::Value(Value::Unit),
                })
            })
            .converter_to(RGB_BUFFER, |state| {
                Ok(Box::new(to_buffer(state, Layout::Rgb)?) as Box<dyn ImageState>)
            })
            .converter_to(RGBA_BUFFER, |state| {
                Ok(Box::new(to_buffer(state, Layout::Rgba)?) as Box<dyn ImageState>)
            })
            .converter_from_many(
                [RGB_BUFFER, RGBA_BUFFER],
                |state| Ok(Box::new(RustImage::new(from_buffer(state)?)) as Box<dyn ImageState>),
                None,
            );

        for format in DECODABLE {
            class = class.converter_from(format.class(), move |state| {
                Ok(Box::new(load_image(state, format)?) as Box<dyn ImageState>)
            });
        }

        for format in FileFormat::ALL {
            class = class.operation(&save_operation_name(format), move |state, args| {
                let operation = save_operation_static(format);
                let quality = match format {
                    FileFormat::Jpeg => quality_arg(operation, args, settings.jpeg_quality)?,
                    FileFormat::Avif => quality_arg(operation, args, settings.avif_quality)?,
                    _ => {
                        no_args(operation, args)?;
                        Quality::default()
                    }
                };
                let data = encode(image_of(state)?, format, quality, &settings)?;
                Ok(Outcome::State(Box::new(EncodedFile::new(format, data))))
            });
        }

        registry.register_class(class);
    }
}

/// `save_as_<format>`.
pub fn save_operation_name(format: FileFormat) -> String {
    format!("save_as_{}", format.name())
}

fn save_operation_static(format: FileFormat) -> &'static str {
    match format {
        FileFormat::Jpeg => "save_as_jpeg",
        FileFormat::Png => "save_as_png",
        FileFormat::Gif => "save_as_gif",
        FileFormat::Bmp => "save_as_bmp",
        FileFormat::Tiff => "save_as_tiff",
        FileFormat::Webp => "save_as_webp",
        FileFormat::Avif => "save_as_avif",
        FileFormat::Ico => "save_as_ico",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::files::{AVIF_FILE, JPEG_FILE, PNG_FILE, Sniffed};

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_plugin(&RustImagePlugin::default());
        registry
    }

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    fn run(registry: &Registry, op: &str, img: &DynamicImage, args: &[Value]) -> Outcome {
        let func = registry.get_operation(RUST_IMAGE, op).unwrap();
        func(&RustImage::new(img.clone()), args).unwrap()
    }

    fn value(outcome: Outcome) -> Value {
        match outcome {
            Outcome::Value(v) => v,
            Outcome::State(s) => panic!("expected a value, got {}", s.class()),
        }
    }

    fn adopted(outcome: Outcome) -> DynamicImage {
        match outcome {
            Outcome::State(s) => downcast::<RustImage>(&*s).unwrap().image.clone(),
            Outcome::Value(v) => panic!("expected a new image, got {v:?}"),
        }
    }

    fn saved(outcome: Outcome) -> EncodedFile {
        match outcome {
            Outcome::State(s) => downcast::<EncodedFile>(&*s).unwrap().clone(),
            Outcome::Value(v) => panic!("expected an encoded file, got {v:?}"),
        }
    }

    #[test]
    fn declares_converters_for_decodable_files_only() {
        let registry = registry();
        assert!(registry.get_converter(PNG_FILE, RUST_IMAGE).is_ok());
        assert!(registry.get_converter(JPEG_FILE, RUST_IMAGE).is_ok());
        assert!(registry.get_converter(AVIF_FILE, RUST_IMAGE).is_err());
        assert!(registry.get_converter(RUST_IMAGE, RGB_BUFFER).is_ok());
        assert!(registry.get_converter(RGBA_BUFFER, RUST_IMAGE).is_ok());
    }

    #[test]
    fn size_and_flags() {
        let registry = registry();
        let img = gradient(40, 30);
        assert_eq!(value(run(&registry, "get_size", &img, &[])), Value::Size(40, 30));
        assert_eq!(value(run(&registry, "get_frame_count", &img, &[])), Value::Int(1));
        assert_eq!(value(run(&registry, "has_alpha", &img, &[])), Value::Bool(false));
        assert_eq!(value(run(&registry, "has_animation", &img, &[])), Value::Bool(false));
    }

    #[test]
    fn resize_is_exact() {
        let registry = registry();
        let resized = adopted(run(&registry, "resize", &gradient(40, 30), &[Value::Size(10, 20)]));
        assert_eq!((resized.width(), resized.height()), (10, 20));
    }

    #[test]
    fn resize_to_zero_is_bad_argument() {
        let registry = registry();
        let func = registry.get_operation(RUST_IMAGE, "resize").unwrap();
        let err = func(&RustImage::new(gradient(4, 4)), &[Value::Size(0, 4)]).unwrap_err();
        assert!(matches!(err, BackendError::BadArgument { .. }));
    }

    #[test]
    fn crop_clamps_to_image() {
        let registry = registry();
        let cropped = adopted(run(
            &registry,
            "crop",
            &gradient(40, 30),
            &[Value::Rect(30, -5, 60, 10)],
        ));
        assert_eq!((cropped.width(), cropped.height()), (10, 10));
    }

    #[test]
    fn crop_outside_image_is_invalid() {
        let registry = registry();
        let func = registry.get_operation(RUST_IMAGE, "crop").unwrap();
        let err = func(&RustImage::new(gradient(40, 30)), &[Value::Rect(50, 0, 60, 10)]).unwrap_err();
        assert!(matches!(err, BackendError::InvalidOperation(_)));
    }

    #[test]
    fn rotate_quarter_turn_swaps_dimensions() {
        let registry = registry();
        let rotated = adopted(run(&registry, "rotate", &gradient(40, 30), &[Value::Int(90)]));
        assert_eq!((rotated.width(), rotated.height()), (30, 40));
    }

    #[test]
    fn rotate_is_counter_clockwise() {
        // Top-left pixel ends up bottom-left after a 90 degree counter-clockwise turn
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        let registry = registry();
        let rotated = adopted(run(
            &registry,
            "rotate",
            &DynamicImage::ImageRgb8(img),
            &[Value::Int(90)],
        ))
        .to_rgb8();
        assert_eq!(rotated.get_pixel(0, 1).0, [255, 0, 0]);
    }

    #[test]
    fn rotate_full_turn_is_noop() {
        let registry = registry();
        let outcome = run(&registry, "rotate", &gradient(4, 4), &[Value::Int(360)]);
        assert_eq!(value(outcome), Value::Unit);
    }

    #[test]
    fn rotate_odd_angle_is_invalid() {
        let registry = registry();
        let func = registry.get_operation(RUST_IMAGE, "rotate").unwrap();
        assert!(matches!(
            func(&RustImage::new(gradient(4, 4)), &[Value::Int(45)]),
            Err(BackendError::InvalidOperation(_))
        ));
    }

    #[test]
    fn background_leaves_opaque_images_alone() {
        let registry = registry();
        let outcome = run(
            &registry,
            "set_background_color_rgb",
            &gradient(4, 4),
            &[Value::Rgb([255, 0, 0])],
        );
        assert_eq!(value(outcome), Value::Unit);
    }

    #[test]
    fn background_flattens_transparent_pixels() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 0])));
        let registry = registry();
        let flattened = adopted(run(
            &registry,
            "set_background_color_rgb",
            &img,
            &[Value::Rgb([0, 255, 0])],
        ));
        assert!(!flattened.color().has_alpha());
        assert_eq!(flattened.to_rgb8().get_pixel(1, 1).0, [0, 255, 0]);
    }

    #[test]
    fn save_as_png_round_trips() {
        let registry = registry();
        let file = saved(run(&registry, "save_as_png", &gradient(12, 8), &[]));
        assert_eq!(file.format, FileFormat::Png);

        let decoded = load_image(&file, FileFormat::Png).unwrap();
        assert_eq!((decoded.image.width(), decoded.image.height()), (12, 8));
        assert_eq!(decoded.orientation, Orientation::NoTransforms);
    }

    #[test]
    fn save_as_jpeg_quality_changes_size() {
        let registry = registry();
        let img = gradient(64, 64);
        let low = saved(run(&registry, "save_as_jpeg", &img, &[Value::Int(10)]));
        let high = saved(run(&registry, "save_as_jpeg", &img, &[Value::Int(95)]));
        assert_eq!(FileFormat::sniff(&low.data), Sniffed::Format(FileFormat::Jpeg));
        assert!(low.data.len() < high.data.len());
    }

    #[test]
    fn save_as_png_takes_no_quality() {
        let registry = registry();
        let func = registry.get_operation(RUST_IMAGE, "save_as_png").unwrap();
        assert!(func(&RustImage::new(gradient(2, 2)), &[Value::Int(50)]).is_err());
    }

    #[test]
    fn every_format_can_be_saved() {
        let registry = registry();
        let img = gradient(16, 16);
        for format in FileFormat::ALL {
            let file = saved(run(&registry, &save_operation_name(format), &img, &[]));
            assert_eq!(file.format, format);
            assert!(!file.data.is_empty(), "{format} produced no bytes");
        }
    }

    #[test]
    fn buffer_round_trip_preserves_pixels() {
        let img = gradient(5, 3);
        let buffer = to_buffer(&RustImage::new(img.clone()), Layout::Rgb).unwrap();
        assert_eq!(buffer.size(), (5, 3));
        let back = from_buffer(&buffer).unwrap();
        assert_eq!(back.to_rgb8(), img.to_rgb8());
    }

    /// Splice an APP1 segment holding only an EXIF orientation tag right
    /// after the JPEG SOI marker.
    fn with_exif_orientation(jpeg: &[u8], orientation: u8) -> Vec<u8> {
        let mut segment = vec![0xFF, 0xE1, 0x00, 0x22];
        segment.extend_from_slice(b"Exif\0\0");
        // Big-endian TIFF header, first IFD at offset 8
        segment.extend_from_slice(b"MM\0\x2A\0\0\0\x08");
        segment.extend_from_slice(&[0x00, 0x01]);
        // Tag 0x0112 (Orientation), SHORT, count 1
        segment.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
        segment.extend_from_slice(&[0x00, orientation, 0x00, 0x00]);
        segment.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        let mut out = jpeg[..2].to_vec();
        out.extend(segment);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    /// 16x8, left half red, right half blue.
    fn red_left_blue_right() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(16, 8, |x, _| {
            if x < 8 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        }))
    }

    fn rotated_jpeg(orientation: u8) -> EncodedFile {
        let registry = registry();
        let plain = saved(run(
            &registry,
            "save_as_jpeg",
            &red_left_blue_right(),
            &[Value::Int(95)],
        ));
        EncodedFile::new(FileFormat::Jpeg, with_exif_orientation(&plain.data, orientation))
    }

    #[test]
    fn decoding_reads_exif_orientation() {
        let decoded = load_image(&rotated_jpeg(6), FileFormat::Jpeg).unwrap();
        assert_eq!(decoded.orientation, Orientation::Rotate90);
        // Pixels stay as stored until auto_orient
        assert_eq!((decoded.image.width(), decoded.image.height()), (16, 8));
    }

    #[test]
    fn auto_orient_applies_exif_rotation() {
        let registry = registry();
        let decoded = load_image(&rotated_jpeg(6), FileFormat::Jpeg).unwrap();
        let func = registry.get_operation(RUST_IMAGE, "auto_orient").unwrap();
        let oriented = match func(&decoded, &[]).unwrap() {
            Outcome::State(s) => downcast::<RustImage>(&*s).unwrap().clone(),
            Outcome::Value(v) => panic!("expected a new image, got {v:?}"),
        };
        assert_eq!(oriented.orientation, Orientation::NoTransforms);
        assert_eq!((oriented.image.width(), oriented.image.height()), (8, 16));

        // Clockwise quarter turn: the red left half becomes the top half
        let rgb = oriented.image.to_rgb8();
        let top = rgb.get_pixel(4, 3).0;
        let bottom = rgb.get_pixel(4, 12).0;
        assert!(top[0] > 200 && top[2] < 60, "top is {top:?}");
        assert!(bottom[2] > 200 && bottom[0] < 60, "bottom is {bottom:?}");

        // Nothing left to apply the second time
        assert_eq!(value(func(&oriented, &[]).unwrap()), Value::Unit);
    }

    #[test]
    fn orientation_survives_resize() {
        let registry = registry();
        let decoded = load_image(&rotated_jpeg(6), FileFormat::Jpeg).unwrap();
        let resize = registry.get_operation(RUST_IMAGE, "resize").unwrap();
        let resized = match resize(&decoded, &[Value::Size(8, 4)]).unwrap() {
            Outcome::State(s) => downcast::<RustImage>(&*s).unwrap().clone(),
            Outcome::Value(v) => panic!("expected a new image, got {v:?}"),
        };
        assert_eq!(resized.orientation, Orientation::Rotate90);
    }

    #[test]
    fn auto_orient_without_exif_is_noop() {
        let registry = registry();
        assert_eq!(value(run(&registry, "auto_orient", &gradient(4, 2), &[])), Value::Unit);
        let func = registry.get_operation(RUST_IMAGE, "auto_orient").unwrap();
        assert!(func(&RustImage::new(gradient(2, 2)), &[Value::Int(1)]).is_err());
    }

    #[test]
    fn decoding_garbage_fails() {
        let file = EncodedFile::new(FileFormat::Png, b"not a png".to_vec());
        assert!(matches!(
            load_image(&file, FileFormat::Png),
            Err(BackendError::ProcessingFailed(_))
        ));
    }
}
