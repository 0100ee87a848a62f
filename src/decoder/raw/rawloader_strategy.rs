//! Decode strategies backed by the rawloader library.
//!
//! Each strategy covers one container family (TIFF-based, RAF, CRW, ...). Recognition is
//! done here from magic bytes; the actual parsing is delegated to rawloader, reading from
//! the in-memory buffer through a `Cursor`.

use std::io::Cursor;

use rawloader::RawImageData as RawloaderImageData;
use tracing::debug;

use crate::decoder::buffer::{ByteOrder, RawBuffer};
use crate::decoder::common::error::BackendError;
use crate::decoder::dispatch::{DecodePolicy, DecodeStrategy};
use crate::decoder::raw::types::{
    BlackArea, CameraIdentity, CfaColor, CfaPattern, Dimensions, NativeDataType, NativeImage,
    Point, SupportStatus,
};

/// A TIFF header: byte order, magic and first IFD offset.
const TIFF_HEADER_LEN: usize = 8;
/// Entry count that opens every IFD.
const IFD_COUNT_LEN: usize = 2;
/// RAF directory fields (big-endian): embedded JPEG, CFA header and CFA data offsets.
const RAF_JPEG_OFFSET_FIELD: usize = 84;
const RAF_CFA_HEADER_OFFSET_FIELD: usize = 92;
const RAF_CFA_OFFSET_FIELD: usize = 100;
/// The EXIF TIFF header sits this far into the embedded JPEG.
const RAF_JPEG_EXIF_SKIP: usize = 12;
/// Byte order, header length and `HEAPCCDR` signature.
const CIFF_HEADER_LEN: usize = 14;
/// Smallest heap: directory count plus the trailing value-data size.
const CIFF_MIN_HEAP_LEN: usize = 6;
/// `\0MRM` plus the big-endian data offset.
const MRW_HEADER_LEN: usize = 8;
const ARI_HEADER_LEN: usize = 4096;

/// Raw container families recognized by their leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Fujifilm RAF
    Raf,
    /// Canon CIFF (CRW)
    Crw,
    /// Minolta MRW
    Mrw,
    /// ARRIRAW
    Ari,
    /// Olympus ORF (TIFF variant with its own magic)
    Orf,
    /// Panasonic RW2/RAW (TIFF variant with its own magic)
    Rw2,
    /// Plain TIFF containers: ARW, NEF, CR2, DNG, PEF, ERF, SRW, IIQ, ...
    Tiff,
}

impl ContainerKind {
    /// Registration order. Variants with a dedicated magic go before generic TIFF.
    pub const PRIORITY: [ContainerKind; 7] = [
        ContainerKind::Raf,
        ContainerKind::Crw,
        ContainerKind::Mrw,
        ContainerKind::Ari,
        ContainerKind::Orf,
        ContainerKind::Rw2,
        ContainerKind::Tiff,
    ];

    pub fn loader_tag(self) -> &'static str {
        match self {
            ContainerKind::Raf => "rawloader/raf",
            ContainerKind::Crw => "rawloader/crw",
            ContainerKind::Mrw => "rawloader/mrw",
            ContainerKind::Ari => "rawloader/ari",
            ContainerKind::Orf => "rawloader/orf",
            ContainerKind::Rw2 => "rawloader/rw2",
            ContainerKind::Tiff => "rawloader/tiff",
        }
    }

    /// Returns true when `buffer` carries this family's magic and its header offsets
    /// point inside the buffer.
    pub fn matches(self, buffer: RawBuffer<'_>) -> bool {
        self.has_magic(buffer) && self.has_plausible_structure(buffer)
    }

    fn has_magic(self, buffer: RawBuffer<'_>) -> bool {
        match self {
            ContainerKind::Raf => buffer.has_magic_at(0, b"FUJIFILM"),
            ContainerKind::Crw => buffer.has_magic_at(6, b"HEAPCCDR"),
            ContainerKind::Mrw => buffer.has_magic_at(0, b"\0MRM"),
            ContainerKind::Ari => buffer.has_magic_at(0, b"ARRI\x12\x34\x56\x78"),
            ContainerKind::Orf => {
                buffer.has_magic_at(0, b"IIRO")
                    || buffer.has_magic_at(0, b"IIRS")
                    || buffer.has_magic_at(0, b"MMOR")
            }
            ContainerKind::Rw2 => buffer.has_magic_at(0, b"IIU\0"),
            ContainerKind::Tiff => {
                buffer.has_magic_at(0, b"II*\0") || buffer.has_magic_at(0, b"MM\0*")
            }
        }
    }

    /// Checks the outermost header only; everything past it is left to the decoder.
    fn has_plausible_structure(self, buffer: RawBuffer<'_>) -> bool {
        let offset_at = |field: usize, order: ByteOrder| -> Option<usize> {
            buffer.u32_at(field, order).and_then(|v| usize::try_from(v).ok())
        };

        match self {
            ContainerKind::Raf => {
                let jpeg = offset_at(RAF_JPEG_OFFSET_FIELD, ByteOrder::Big);
                let cfa_header = offset_at(RAF_CFA_HEADER_OFFSET_FIELD, ByteOrder::Big);
                let cfa = offset_at(RAF_CFA_OFFSET_FIELD, ByteOrder::Big);
                match (jpeg, cfa_header, cfa) {
                    (Some(jpeg), Some(cfa_header), Some(cfa)) => {
                        buffer.contains_range(
                            jpeg.saturating_add(RAF_JPEG_EXIF_SKIP),
                            TIFF_HEADER_LEN,
                        ) && cfa_header < buffer.len()
                            && cfa < buffer.len()
                    }
                    _ => false,
                }
            }
            ContainerKind::Crw => offset_at(2, ByteOrder::Little).is_some_and(|heap| {
                heap >= CIFF_HEADER_LEN && buffer.contains_range(heap, CIFF_MIN_HEAP_LEN)
            }),
            ContainerKind::Mrw => offset_at(4, ByteOrder::Big)
                .is_some_and(|data| buffer.contains_range(MRW_HEADER_LEN, data)),
            ContainerKind::Ari => offset_at(8, ByteOrder::Little).is_some_and(|data| {
                buffer.contains_range(0, ARI_HEADER_LEN) && data < buffer.len()
            }),
            ContainerKind::Orf | ContainerKind::Rw2 | ContainerKind::Tiff => {
                let order = if buffer.has_magic_at(0, b"II") {
                    ByteOrder::Little
                } else {
                    ByteOrder::Big
                };
                offset_at(4, order).is_some_and(|ifd| {
                    ifd >= TIFF_HEADER_LEN && buffer.contains_range(ifd, IFD_COUNT_LEN)
                })
            }
        }
    }
}

/// Strategy decoding one [`ContainerKind`] through rawloader.
#[derive(Debug, Clone, Copy)]
pub struct RawloaderStrategy {
    kind: ContainerKind,
}

impl RawloaderStrategy {
    pub fn new(kind: ContainerKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }
}

impl DecodeStrategy for RawloaderStrategy {
    fn name(&self) -> &'static str {
        self.kind.loader_tag()
    }

    fn identify(&self, buffer: RawBuffer<'_>) -> bool {
        self.kind.matches(buffer)
    }

    /// Decodes the buffer with rawloader and converts the result to a [`NativeImage`].
    ///
    /// rawloader refuses cameras missing from its database (DNG being self-describing),
    /// which is the fail-closed behaviour the policy requires.
    fn decode(
        &self,
        buffer: RawBuffer<'_>,
        policy: DecodePolicy,
    ) -> Result<NativeImage, BackendError> {
        debug!(
            "Decoding {:?} container, {} bytes, fail_on_unknown={}",
            self.kind,
            buffer.len(),
            policy.fail_on_unknown()
        );

        let decoded = rawloader::decode(&mut Cursor::new(buffer.as_bytes()))
            .map_err(|e| backend_error_from_message(&e.to_string()))?;

        native_from_rawloader(decoded)
    }
}

/// Sorts a rawloader error message into its failure origin.
///
/// rawloader turns its own out-of-range reads into a caught panic. The container has
/// already passed header sniffing at that point, so the structure behind the header is
/// what is broken.
pub(crate) fn backend_error_from_message(msg: &str) -> BackendError {
    let lowered = msg.to_lowercase();

    if lowered.contains("ioerror")
        || lowered.contains("io error")
        || lowered.contains("failed to fill")
    {
        BackendError::Io(msg.to_string())
    } else if lowered.contains("couldn't find a decoder") || lowered.contains("not a tiff") {
        BackendError::Parser(msg.to_string())
    } else if lowered.contains("couldn't find camera") {
        BackendError::Decoder(format!("Camera not supported: {msg}"))
    } else if lowered.contains("panic") {
        BackendError::Other(format!("container structure is truncated or out of range: {msg}"))
    } else {
        BackendError::Decoder(msg.to_string())
    }
}

fn native_from_rawloader(decoded: rawloader::RawImage) -> Result<NativeImage, BackendError> {
    let width = decoded.width;
    let height = decoded.height;
    let cpp = decoded.cpp;

    // crops are top, right, bottom, left
    let [top, right, bottom, left] = decoded.crops;
    let cropped = width
        .checked_sub(left + right)
        .zip(height.checked_sub(top + bottom))
        .map(|(w, h)| Dimensions::new(w, h))
        .ok_or_else(|| {
            BackendError::Decoder(format!(
                "crop {:?} exceeds image size {}x{}",
                decoded.crops, width, height
            ))
        })?;

    debug!("Decoded image: {}x{}, cpp={}, crops={:?}", width, height, cpp, decoded.crops);

    let cfa = if cpp == 1 {
        cfa_from_rawloader(&decoded.cropped_cfa())?
    } else {
        None
    };

    let (pixels, data_type, white_point, bytes_per_sample) = match decoded.data {
        RawloaderImageData::Integer(values) => {
            // The white level is the largest value the sensor can produce.
            let max_white_level = decoded.whitelevels.iter().max().copied().unwrap_or(u16::MAX);
            let white_point = (max_white_level != 0).then_some(u32::from(max_white_level));
            (
                bytemuck::cast_slice::<u16, u8>(&values).to_vec(),
                NativeDataType::UShort16,
                white_point,
                2,
            )
        }
        // Float data is normalized to 0.0-1.0, so its white point is 1.0.
        RawloaderImageData::Float(values) => (
            bytemuck::cast_slice::<f32, u8>(&values).to_vec(),
            NativeDataType::Float32,
            Some(1.0f32.to_bits()),
            4,
        ),
    };

    let wb_coeffs = wb_from_rawloader(decoded.wb_coeffs);

    let mut color_matrix: Vec<f32> = decoded.xyz_to_cam.iter().flatten().copied().collect();
    while color_matrix.len() >= 3
        && color_matrix[color_matrix.len() - 3..].iter().all(|&v| v == 0.0)
    {
        color_matrix.truncate(color_matrix.len() - 3);
    }

    let black_areas: Vec<BlackArea> =
        decoded.blackareas.iter().filter_map(|&area| black_area_from_rawloader(area)).collect();
    // Zero levels next to masked areas mean the file left the measuring to us.
    let black_level_separate = if decoded.blacklevels == [0; 4] && !black_areas.is_empty() {
        None
    } else {
        Some(decoded.blacklevels.map(i32::from))
    };

    let camera = CameraIdentity {
        make: decoded.make,
        model: decoded.model,
        mode: String::new(),
        canonical_make: decoded.clean_make,
        canonical_alias: decoded.clean_model.clone(),
        canonical_model: decoded.clean_model,
    };

    Ok(NativeImage {
        pixels,
        pitch: width * cpp * bytes_per_sample,
        uncropped: Dimensions::new(width, height),
        cropped,
        crop_offset: Point::new(left, top),
        data_type,
        bytes_per_pixel: cpp * bytes_per_sample,
        samples_per_pixel: cpp,
        cfa,
        black_level: None,
        black_level_separate,
        black_areas,
        white_point,
        color_matrix,
        wb_coeffs,
        camera,
        support: SupportStatus::Supported,
        fuji_rotation_pos: 0,
        pixel_aspect_ratio: 1.0,
        warnings: Vec::new(),
    })
}

/// rawloader marks coefficients a camera does not have (the fourth one of every
/// three-colour sensor) as NaN. Those become zero; only an all-NaN set counts as missing.
fn wb_from_rawloader(coeffs: [f32; 4]) -> Option<[f32; 4]> {
    if !coeffs.iter().any(|c| c.is_finite()) {
        return None;
    }
    Some(coeffs.map(|c| if c.is_finite() { c } else { 0.0 }))
}

/// Masked areas arrive as absolute `(top, right, bottom, left)` edges.
fn black_area_from_rawloader(area: (u64, u64, u64, u64)) -> Option<BlackArea> {
    let (top, right, bottom, left) = area;
    let top = usize::try_from(top).ok()?;
    let right = usize::try_from(right).ok()?;
    let bottom = usize::try_from(bottom).ok()?;
    let left = usize::try_from(left).ok()?;

    if right <= left || bottom <= top {
        return None;
    }
    Some(BlackArea { x: left, y: top, width: right - left, height: bottom - top })
}

fn cfa_from_rawloader(cfa: &rawloader::CFA) -> Result<Option<CfaPattern>, BackendError> {
    if cfa.width == 0 || cfa.height == 0 {
        return Ok(None);
    }

    let mut colors = Vec::with_capacity(cfa.width * cfa.height);
    for row in 0..cfa.height {
        for col in 0..cfa.width {
            let color = match cfa.color_at(row, col) {
                0 => CfaColor::Red,
                1 => CfaColor::Green,
                2 => CfaColor::Blue,
                3 => CfaColor::Emerald,
                other => {
                    return Err(BackendError::Metadata(format!(
                        "CFA colour index {other} is not supported"
                    )));
                }
            };
            colors.push(color);
        }
    }

    Ok(CfaPattern::new(cfa.width, cfa.height, colors))
}
