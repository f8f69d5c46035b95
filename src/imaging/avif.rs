//! AVIF decoding through `avif-parse` and `rav1d`.
//!
//! The `image` crate's `"avif"` feature only provides the encoder (rav1e);
//! decoding needs `"avif-native"`, which links the C library dav1d. Instead
//! the container is parsed with `avif-parse` and the AV1 payload decoded with
//! `rav1d`, a pure Rust port of dav1d.
//!
//! ```text
//! AvifFile --decode (100)--> Av1Frame --(50)--> RgbBuffer
//! ```
//!
//! Decoding is behind the `avif-decode` cargo feature. Without it the
//! `Av1Frame` probe fails and routes through it are closed, while `get_size`
//! on `AvifFile` keeps working from container metadata alone.

use super::buffers::{Layout, PixelBuffer, RGB_BUFFER};
use super::files::{AVIF_FILE, EncodedFile, FileFormat, expect_file};
use super::params::no_args;
use crate::registry::{
    BackendError, ClassId, ClassRegistration, ImageState, Outcome, Plugin, Registry, Value,
    downcast,
};
use std::any::Any;
use std::fmt;

pub const AV1_FRAME: ClassId = ClassId::new("Av1Frame");

/// Cost of unpacking a decoded frame into an RGB buffer.
pub const FRAME_TO_BUFFER_COST: u32 = 50;

/// A decoded AV1 still frame, converted to interleaved 8-bit RGB.
#[derive(Clone, PartialEq, Eq)]
pub struct Av1Frame {
    pub width: u32,
    pub height: u32,
    /// Bits per component of the source stream (8, 10 or 12).
    pub bit_depth: u8,
    rgb: Vec<u8>,
}

impl Av1Frame {
    pub fn rgb(&self) -> &[u8] {
        &self.rgb
    }
}

impl fmt::Debug for Av1Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Av1Frame({}x{}, {}-bit)",
            self.width, self.height, self.bit_depth
        )
    }
}

impl ImageState for Av1Frame {
    fn class(&self) -> ClassId {
        AV1_FRAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn parse_container(data: &[u8]) -> Result<avif_parse::AvifData, BackendError> {
    avif_parse::read_avif(&mut std::io::Cursor::new(data))
        .map_err(|e| BackendError::ProcessingFailed(format!("Failed to parse AVIF: {e:?}")))
}

/// Extract dimensions from an AVIF file's container metadata (no full decode needed).
pub fn identify_avif(file: &EncodedFile) -> Result<(u32, u32), BackendError> {
    let avif = parse_container(&file.data)?;
    let meta = avif.primary_item_metadata().map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to read AVIF metadata: {e:?}"))
    })?;
    Ok((meta.max_frame_width.get(), meta.max_frame_height.get()))
}

#[cfg(feature = "avif-decode")]
fn probe() -> Result<(), String> {
    Ok(())
}

#[cfg(not(feature = "avif-decode"))]
fn probe() -> Result<(), String> {
    Err("compiled without the avif-decode feature".to_string())
}

#[cfg(not(feature = "avif-decode"))]
pub fn decode_avif(_file: &EncodedFile) -> Result<Av1Frame, BackendError> {
    Err(BackendError::ProcessingFailed(
        "compiled without the avif-decode feature".into(),
    ))
}

/// Decode the primary item of an AVIF file.
#[cfg(feature = "avif-decode")]
pub fn decode_avif(file: &EncodedFile) -> Result<Av1Frame, BackendError> {
    use rav1d::include::dav1d::data::Dav1dData;
    use rav1d::include::dav1d::dav1d::Dav1dSettings;
    use rav1d::include::dav1d::picture::Dav1dPicture;
    use std::ptr::NonNull;

    let avif = parse_container(&file.data)?;
    let av1_bytes: &[u8] = &avif.primary_item;

    // Initialize rav1d decoder
    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    let settings_ptr = NonNull::new(settings.as_mut_ptr())
        .ok_or_else(|| BackendError::ProcessingFailed("rav1d settings unavailable".into()))?;
    unsafe { rav1d::src::lib::dav1d_default_settings(settings_ptr) };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc =
        unsafe { rav1d::src::lib::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(BackendError::ProcessingFailed(format!(
            "rav1d open failed ({})",
            rc.0
        )));
    }

    // Create data buffer and copy AV1 bytes
    let mut data = Dav1dData::default();
    let buf_ptr =
        unsafe { rav1d::src::lib::dav1d_data_create(NonNull::new(&mut data), av1_bytes.len()) };
    if buf_ptr.is_null() {
        unsafe { rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(BackendError::ProcessingFailed(
            "rav1d data_create failed".into(),
        ));
    }
    unsafe { std::ptr::copy_nonoverlapping(av1_bytes.as_ptr(), buf_ptr, av1_bytes.len()) };

    // Feed data to decoder
    let rc = unsafe { rav1d::src::lib::dav1d_send_data(ctx, NonNull::new(&mut data)) };
    if rc.0 != 0 {
        unsafe {
            rav1d::src::lib::dav1d_data_unref(NonNull::new(&mut data));
            rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx));
        }
        return Err(BackendError::ProcessingFailed(format!(
            "rav1d send_data failed ({})",
            rc.0
        )));
    }

    // Get decoded picture
    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { rav1d::src::lib::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
    if rc.0 != 0 {
        unsafe { rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(BackendError::ProcessingFailed(format!(
            "rav1d get_picture failed ({})",
            rc.0
        )));
    }

    let frame = picture_to_frame(&pic);

    unsafe {
        rav1d::src::lib::dav1d_picture_unref(NonNull::new(&mut pic));
        rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx));
    }

    frame
}

/// Convert a decoded picture to RGB. The picture is still owned by rav1d.
#[cfg(feature = "avif-decode")]
fn picture_to_frame(
    pic: &rav1d::include::dav1d::picture::Dav1dPicture,
) -> Result<Av1Frame, BackendError> {
    use rav1d::include::dav1d::headers::{
        DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
        DAV1D_PIXEL_LAYOUT_I444,
    };

    let missing = |plane: &str| BackendError::ProcessingFailed(format!("AVIF {plane} plane missing"));

    let w = pic.p.w as u32;
    let h = pic.p.h as u32;
    let bpc = pic.p.bpc as u32;
    let layout = pic.p.layout;
    let y_ptr = pic.data[0].ok_or_else(|| missing("luma"))?.as_ptr() as *const u8;

    let planes = if layout == DAV1D_PIXEL_LAYOUT_I400 {
        YuvPlanes {
            y_ptr,
            u_ptr: y_ptr,
            v_ptr: y_ptr,
            y_stride: pic.stride[0],
            uv_stride: 0,
            width: w,
            height: h,
            bpc,
            ss_x: false,
            ss_y: false,
            monochrome: true,
        }
    } else {
        let (ss_x, ss_y) = match layout {
            DAV1D_PIXEL_LAYOUT_I420 => (true, true),
            DAV1D_PIXEL_LAYOUT_I422 => (true, false),
            DAV1D_PIXEL_LAYOUT_I444 => (false, false),
            _ => {
                return Err(BackendError::ProcessingFailed(format!(
                    "Unsupported AVIF pixel layout: {layout}"
                )));
            }
        };
        YuvPlanes {
            y_ptr,
            u_ptr: pic.data[1].ok_or_else(|| missing("Cb"))?.as_ptr() as *const u8,
            v_ptr: pic.data[2].ok_or_else(|| missing("Cr"))?.as_ptr() as *const u8,
            y_stride: pic.stride[0],
            uv_stride: pic.stride[1],
            width: w,
            height: h,
            bpc,
            ss_x,
            ss_y,
            monochrome: false,
        }
    };

    Ok(Av1Frame {
        width: w,
        height: h,
        bit_depth: bpc as u8,
        rgb: planes.to_rgb(),
    })
}

/// Decoded YUV plane data from rav1d, ready for RGB conversion.
#[cfg(feature = "avif-decode")]
struct YuvPlanes {
    y_ptr: *const u8,
    u_ptr: *const u8,
    v_ptr: *const u8,
    y_stride: isize,
    uv_stride: isize,
    width: u32,
    height: u32,
    bpc: u32,
    /// Chroma subsampling: horizontal, vertical (e.g. I420 = true, true)
    ss_x: bool,
    ss_y: bool,
    monochrome: bool,
}

#[cfg(feature = "avif-decode")]
impl YuvPlanes {
    /// Convert YUV planes to interleaved RGB8 using BT.601 coefficients.
    fn to_rgb(&self) -> Vec<u8> {
        let scale = 255.0 / ((1u32 << self.bpc) - 1) as f32;
        let mut rgb = vec![0u8; rgb_offset(self.width, self.height, 0)];

        for row in 0..self.height {
            for col in 0..self.width {
                let y_val = read_pixel(self.y_ptr, self.y_stride, col, row, self.bpc);

                let pixel = if self.monochrome {
                    let v = (y_val * scale).clamp(0.0, 255.0) as u8;
                    [v, v, v]
                } else {
                    let u_col = if self.ss_x { col / 2 } else { col };
                    let u_row = if self.ss_y { row / 2 } else { row };
                    let cb = read_pixel(self.u_ptr, self.uv_stride, u_col, u_row, self.bpc);
                    let cr = read_pixel(self.v_ptr, self.uv_stride, u_col, u_row, self.bpc);
                    ycbcr_to_rgb(y_val, cb, cr, self.bpc)
                };

                let idx = rgb_offset(self.width, row, col);
                rgb[idx..idx + 3].copy_from_slice(&pixel);
            }
        }

        rgb
    }
}

/// Byte offset of pixel `(col, row)` in packed RGB8 rows of `width` pixels.
/// With `row == height` and `col == 0` this is the buffer length.
#[cfg(feature = "avif-decode")]
fn rgb_offset(width: u32, row: u32, col: u32) -> usize {
    (row as usize * width as usize + col as usize) * 3
}

/// BT.601 YCbCr → RGB for one pixel at `bpc` bits, scaled to 8-bit.
pub fn ycbcr_to_rgb(y: f32, cb: f32, cr: f32, bpc: u32) -> [u8; 3] {
    let scale = 255.0 / ((1u32 << bpc) - 1) as f32;
    let center = (1u32 << (bpc - 1)) as f32;
    let cb = cb - center;
    let cr = cr - center;
    [
        ((y + 1.402 * cr) * scale).clamp(0.0, 255.0) as u8,
        ((y - 0.344136 * cb - 0.714136 * cr) * scale).clamp(0.0, 255.0) as u8,
        ((y + 1.772 * cb) * scale).clamp(0.0, 255.0) as u8,
    ]
}

/// Read a single pixel value from a YUV plane, handling both 8-bit and 16-bit storage.
#[cfg(feature = "avif-decode")]
#[inline]
fn read_pixel(ptr: *const u8, stride: isize, x: u32, y: u32, bpc: u32) -> f32 {
    if bpc <= 8 {
        (unsafe { *ptr.offset(y as isize * stride + x as isize) }) as f32
    } else {
        // 10-bit and 12-bit are stored as u16
        let byte_offset = y as isize * stride + x as isize * 2;
        (unsafe { *(ptr.offset(byte_offset) as *const u16) }) as f32
    }
}

/// Registers `Av1Frame` and the metadata-only `get_size` on `AvifFile`.
pub struct AvifPlugin;

impl Plugin for AvifPlugin {
    fn name(&self) -> &'static str {
        "avif"
    }

    fn register(&self, registry: &mut Registry) {
        registry.register_class(
            ClassRegistration::new(AV1_FRAME)
                .probe(probe)
                .operation("get_size", |state, args| {
                    no_args("get_size", args)?;
                    let frame = downcast::<Av1Frame>(state)?;
                    Ok(Outcome::Value(Value::Size(frame.width, frame.height)))
                })
                .operation("get_frame_count", |state, args| {
                    no_args("get_frame_count", args)?;
                    downcast::<Av1Frame>(state)?;
                    Ok(Outcome::Value(Value::Int(1)))
                })
                .operation("has_alpha", |state, args| {
                    no_args("has_alpha", args)?;
                    downcast::<Av1Frame>(state)?;
                    Ok(Outcome::Value(Value::Bool(false)))
                })
                .operation("has_animation", |state, args| {
                    no_args("has_animation", args)?;
                    downcast::<Av1Frame>(state)?;
                    Ok(Outcome::Value(Value::Bool(false)))
                })
                .converter_from(AVIF_FILE, |state| {
                    let file = expect_file(state, FileFormat::Avif)?;
                    Ok(Box::new(decode_avif(file)?) as Box<dyn ImageState>)
                })
                .converter_to_with_cost(
                    RGB_BUFFER,
                    |state| {
                        let frame = downcast::<Av1Frame>(state)?;
                        let buffer =
                            PixelBuffer::new(Layout::Rgb, frame.width, frame.height, frame.rgb.clone())?;
                        Ok(Box::new(buffer) as Box<dyn ImageState>)
                    },
                    Some(FRAME_TO_BUFFER_COST),
                ),
        );

        registry.register_operation(
            AVIF_FILE,
            "get_size",
            std::sync::Arc::new(
                |state: &dyn ImageState, args: &[Value]| -> Result<Outcome, BackendError> {
                    no_args("get_size", args)?;
                    let (w, h) = identify_avif(expect_file(state, FileFormat::Avif)?)?;
                    Ok(Outcome::Value(Value::Size(w, h)))
                },
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::rust_backend::{RUST_IMAGE, RustImage, RustImagePlugin};
    use image::{DynamicImage, RgbImage};

    #[cfg(feature = "avif-decode")]
    #[test]
    fn rgb_offset_does_not_wrap_for_huge_frames() {
        assert_eq!(rgb_offset(4, 2, 1), 27);
        assert_eq!(rgb_offset(70_000, 70_000, 0), 14_700_000_000);
        assert_eq!(rgb_offset(70_000, 69_999, 69_999), 14_699_999_997);
    }

    /// Encode a small AVIF through the `image` backend's `save_as_avif`.
    fn create_test_avif(width: u32, height: u32) -> EncodedFile {
        let mut registry = Registry::new();
        registry.register_plugin(&RustImagePlugin::default());
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }));
        let save = registry.get_operation(RUST_IMAGE, "save_as_avif").unwrap();
        match save(&RustImage::new(img), &[]).unwrap() {
            Outcome::State(s) => downcast::<EncodedFile>(&*s).unwrap().clone(),
            Outcome::Value(v) => panic!("expected a file, got {v:?}"),
        }
    }

    #[test]
    fn identify_avif_dimensions() {
        let file = create_test_avif(120, 80);
        assert_eq!(identify_avif(&file).unwrap(), (120, 80));
    }

    #[test]
    fn identify_garbage_fails() {
        let file = EncodedFile::new(FileFormat::Avif, b"not an avif".to_vec());
        assert!(identify_avif(&file).is_err());
    }

    #[test]
    fn ycbcr_neutral_chroma_is_grey() {
        assert_eq!(ycbcr_to_rgb(128.0, 128.0, 128.0, 8), [128, 128, 128]);
        assert_eq!(ycbcr_to_rgb(0.0, 128.0, 128.0, 8), [0, 0, 0]);
        assert_eq!(ycbcr_to_rgb(255.0, 128.0, 128.0, 8), [255, 255, 255]);
    }

    #[test]
    fn ycbcr_ten_bit_scales_down() {
        assert_eq!(ycbcr_to_rgb(1023.0, 512.0, 512.0, 10), [255, 255, 255]);
    }

    #[test]
    fn plugin_registers_frame_class_and_file_size() {
        let mut registry = Registry::new();
        registry.register_plugin(&AvifPlugin);
        assert!(registry.is_registered(AV1_FRAME));
        assert!(registry.has_operation(AVIF_FILE, "get_size"));
        assert_eq!(registry.get_converter_cost(AV1_FRAME, RGB_BUFFER), 50);
        assert_eq!(registry.get_converter_cost(AVIF_FILE, AV1_FRAME), 100);
    }

    #[cfg(feature = "avif-decode")]
    #[test]
    fn decode_avif_roundtrip() {
        let decoded = decode_avif(&create_test_avif(64, 48)).unwrap();
        assert_eq!((decoded.width, decoded.height), (64, 48));
        assert_eq!(decoded.rgb().len(), 64 * 48 * 3);
        assert_eq!(decoded.bit_depth, 8);
    }

    #[cfg(not(feature = "avif-decode"))]
    #[test]
    fn probe_fails_without_decoder() {
        assert_eq!(probe(), Err("compiled without the avif-decode feature".into()));
    }
}
