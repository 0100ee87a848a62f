//! Layout transformation
//!
//! Moves decoder-native rows into a caller-owned destination plane whose row pitch is
//! chosen by the destination's allocator, not by the decoder.

use std::collections::HashMap;

use tracing::debug;

use crate::decoder::common::error::{DecodeError, Result};
use crate::decoder::metadata::types::SampleType;

/// Orientation correction applied while copying. The default is no transform.
///
/// The flips mirror the source axes; `swap_xy` then transposes the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Orientation {
    pub flip_x: bool,
    pub flip_y: bool,
    pub swap_xy: bool,
}

impl Orientation {
    pub const NONE: Orientation = Orientation { flip_x: false, flip_y: false, swap_xy: false };
    pub const ROTATE_180: Orientation = Orientation { flip_x: true, flip_y: true, swap_xy: false };
    pub const ROTATE_CW: Orientation = Orientation { flip_x: false, flip_y: true, swap_xy: true };
    pub const ROTATE_CCW: Orientation = Orientation { flip_x: true, flip_y: false, swap_xy: true };

    pub fn is_none(&self) -> bool {
        *self == Orientation::NONE
    }
}

/// Opaque key the destination allocator files a plane under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(pub u64);

/// What the decoder asks the destination allocator for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneRequest {
    pub image_id: ImageId,
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub sample_type: SampleType,
}

impl PlaneRequest {
    pub fn bytes_per_pixel(&self) -> usize {
        self.channels * self.sample_type.bytes()
    }

    /// Row length without padding.
    pub fn row_bytes(&self) -> usize {
        self.width * self.bytes_per_pixel()
    }
}

/// Writable destination region, borrowed from the allocator for one decode call.
#[derive(Debug)]
pub struct PixelPlane<'a> {
    bytes: &'a mut [u8],
    pitch: usize,
}

impl<'a> PixelPlane<'a> {
    pub fn new(bytes: &'a mut [u8], pitch: usize) -> Self {
        Self { bytes, pitch }
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        self.bytes
    }

    /// Fails with `DestinationUnavailable` unless `height` rows of `pitch` bytes fit.
    pub(crate) fn ensure_rows(&self, height: usize) -> Result<()> {
        let needed = self.pitch.checked_mul(height);
        match needed {
            Some(needed) if self.pitch > 0 && needed <= self.bytes.len() => Ok(()),
            _ => Err(DecodeError::DestinationUnavailable(format!(
                "plane of {} bytes cannot hold {} rows of {} bytes",
                self.bytes.len(),
                height,
                self.pitch
            ))),
        }
    }
}

/// External collaborator that owns destination memory.
///
/// Allocation is a single blocking call. Returning `None` means the request cannot be
/// satisfied; the decoder reports that as a full cache and never retries.
pub trait PlaneAllocator {
    fn allocate(&mut self, request: &PlaneRequest) -> Option<PixelPlane<'_>>;
}

/// Heap-backed allocator keeping one plane per image id, with an optional byte budget.
#[derive(Debug, Default)]
pub struct HeapPlaneAllocator {
    planes: HashMap<ImageId, (Vec<u8>, usize)>,
    row_alignment: usize,
    capacity: Option<usize>,
}

impl HeapPlaneAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rounds every row up to a multiple of `alignment` bytes.
    pub fn with_row_alignment(mut self, alignment: usize) -> Self {
        self.row_alignment = alignment;
        self
    }

    /// Refuses allocations that would take the total past `bytes`.
    pub fn with_capacity(mut self, bytes: usize) -> Self {
        self.capacity = Some(bytes);
        self
    }

    pub fn plane(&self, id: ImageId) -> Option<&[u8]> {
        self.planes.get(&id).map(|(bytes, _)| bytes.as_slice())
    }

    pub fn pitch(&self, id: ImageId) -> Option<usize> {
        self.planes.get(&id).map(|&(_, pitch)| pitch)
    }

    pub fn release(&mut self, id: ImageId) -> Option<Vec<u8>> {
        self.planes.remove(&id).map(|(bytes, _)| bytes)
    }

    fn used_bytes(&self) -> usize {
        self.planes.values().map(|(bytes, _)| bytes.len()).sum()
    }
}

impl PlaneAllocator for HeapPlaneAllocator {
    fn allocate(&mut self, request: &PlaneRequest) -> Option<PixelPlane<'_>> {
        let row_bytes = request.row_bytes();
        let pitch = if self.row_alignment > 1 {
            row_bytes.div_ceil(self.row_alignment) * self.row_alignment
        } else {
            row_bytes
        };
        let size = pitch.checked_mul(request.height)?;

        let reused = self.planes.get(&request.image_id).map_or(0, |(bytes, _)| bytes.len());
        if let Some(capacity) = self.capacity {
            if self.used_bytes() - reused + size > capacity {
                debug!(image_id = ?request.image_id, size, capacity, "Plane allocation refused");
                return None;
            }
        }

        let entry = self.planes.entry(request.image_id).or_default();
        entry.0 = vec![0u8; size];
        entry.1 = pitch;
        Some(PixelPlane::new(&mut entry.0, pitch))
    }
}

/// Decoder-native rows to copy from.
#[derive(Debug, Clone, Copy)]
pub struct SourcePlane<'a> {
    pub bytes: &'a [u8],
    pub pitch: usize,
    pub width: usize,
    pub height: usize,
    pub bytes_per_pixel: usize,
}

impl SourcePlane<'_> {
    fn row_bytes(&self) -> usize {
        self.width * self.bytes_per_pixel
    }

    fn validate(&self) -> Result<()> {
        let row_bytes = self.row_bytes();
        let needed = self.pitch * (self.height - 1) + row_bytes;
        if self.pitch < row_bytes || self.bytes.len() < needed {
            return Err(DecodeError::LoadFailed(format!(
                "decoded plane of {} bytes does not cover {} rows of {} bytes at pitch {}",
                self.bytes.len(),
                self.height,
                row_bytes,
                self.pitch
            )));
        }
        Ok(())
    }
}

/// How a transfer was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPath {
    /// One contiguous copy of `bytes` bytes.
    Bulk { bytes: usize },
    /// Row-by-row copy, padded or truncated to the destination pitch.
    Reflow { rows: usize },
    /// Pixel-by-pixel copy with an orientation transform.
    Oriented { pixels: usize },
}

/// Copies `src` into `dst`.
///
/// When the destination's expected size (its pitch times the height; width x height x
/// bytes-per-pixel for a tightly packed plane) equals the native pitch times the height,
/// the rows are copied in one block. Otherwise each row is copied on its own, truncated
/// to the destination pitch and zero-padded beyond the source row. Both planes are
/// bounds-checked before anything is written.
///
/// # Arguments
///
/// * `src` - Decoder-native pixels with their pitch and uncropped geometry
/// * `dst` - Destination plane, sized for the oriented image
/// * `orientation` - Transform applied while copying; [`Orientation::NONE`] keeps the layout
///
/// # Returns
///
/// * `Ok(TransferPath)` - Which copy path wrote the plane
/// * `Err(DecodeError)` - Either plane is too small for the geometry it claims
pub fn transfer(
    src: &SourcePlane<'_>,
    dst: &mut PixelPlane<'_>,
    orientation: Orientation,
) -> Result<TransferPath> {
    if src.width == 0 || src.height == 0 {
        return Ok(TransferPath::Bulk { bytes: 0 });
    }
    src.validate()?;

    if !orientation.is_none() {
        return transfer_oriented(src, dst, orientation);
    }

    dst.ensure_rows(src.height)?;

    let expected = dst.pitch * src.height;
    let native = src.pitch * src.height;
    if expected == native && src.bytes.len() >= native {
        dst.bytes[..native].copy_from_slice(&src.bytes[..native]);
        debug!(bytes = native, "Plane copied in bulk");
        return Ok(TransferPath::Bulk { bytes: native });
    }

    let row_bytes = src.row_bytes();
    let copied = row_bytes.min(dst.pitch);
    for (j, dst_row) in dst.bytes.chunks_exact_mut(dst.pitch).take(src.height).enumerate() {
        let src_row = &src.bytes[j * src.pitch..j * src.pitch + row_bytes];
        dst_row[..copied].copy_from_slice(&src_row[..copied]);
        dst_row[copied..].fill(0);
    }

    debug!(
        rows = src.height,
        src_pitch = src.pitch,
        dst_pitch = dst.pitch,
        "Plane reflowed row by row"
    );
    Ok(TransferPath::Reflow { rows: src.height })
}

fn transfer_oriented(
    src: &SourcePlane<'_>,
    dst: &mut PixelPlane<'_>,
    orientation: Orientation,
) -> Result<TransferPath> {
    let bpp = src.bytes_per_pixel;
    let (out_width, out_height) = if orientation.swap_xy {
        (src.height, src.width)
    } else {
        (src.width, src.height)
    };

    dst.ensure_rows(out_height)?;
    let dst_pitch = dst.pitch;
    let visible_columns = (dst_pitch / bpp.max(1)).min(out_width);
    dst.bytes[..dst_pitch * out_height].fill(0);

    let mut pixels = 0;
    for j in 0..src.height {
        for i in 0..src.width {
            let (x, y) = if orientation.swap_xy { (j, i) } else { (i, j) };
            let x = if flips_columns(orientation) { out_width - 1 - x } else { x };
            let y = if flips_rows(orientation) { out_height - 1 - y } else { y };
            if x >= visible_columns {
                continue;
            }

            let from = j * src.pitch + i * bpp;
            let to = y * dst_pitch + x * bpp;
            dst.bytes[to..to + bpp].copy_from_slice(&src.bytes[from..from + bpp]);
            pixels += 1;
        }
    }

    debug!(?orientation, pixels, "Plane copied with orientation");
    Ok(TransferPath::Oriented { pixels })
}

// After a transpose the source rows are output columns.
fn flips_columns(orientation: Orientation) -> bool {
    if orientation.swap_xy { orientation.flip_y } else { orientation.flip_x }
}

fn flips_rows(orientation: Orientation) -> bool {
    if orientation.swap_xy { orientation.flip_x } else { orientation.flip_y }
}
