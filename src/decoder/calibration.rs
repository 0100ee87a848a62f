//! Calibration resolution
//!
//! Fills in what the source leaves implicit: per-channel and global black levels, the
//! floating point white point convention, and the mosaic pattern of the uncropped plane.

mod filters;

pub use filters::{crop_dcraw_filters, dcraw_filters, is_four_bayer};

use tracing::debug;

use crate::decoder::metadata::types::{DecodedImageMetadata, MosaicPattern, XTRANS_FILTERS};
use crate::decoder::raw::types::{BlackArea, CfaPattern, NativeDataType, NativeImage, Point};

/// Bit pattern of `1.0f32`, the white point of normalized float data.
const FLOAT_ONE_BITS: u32 = 0x3F80_0000;

/// Resolves the four per-channel black levels and the global black level.
///
/// Missing per-channel levels take the scalar level; if that is unknown too they are
/// measured from the masked black areas. An unknown scalar level is the rounded mean of
/// the per-channel levels.
pub fn resolve_black_levels(native: &NativeImage, metadata: &mut DecodedImageMetadata) {
    let separate = match (native.black_level_separate, native.black_level) {
        (Some(separate), _) => separate,
        (None, Some(scalar)) => [scalar; 4],
        (None, None) => measure_black_areas(native).unwrap_or([0; 4]),
    };

    metadata.black_level_separate = separate.map(clamp_to_u16);

    metadata.black_level = match native.black_level {
        Some(scalar) => clamp_to_u16(scalar),
        None => {
            let sum: f32 = metadata.black_level_separate.iter().map(|&b| f32::from(b)).sum();
            let mean = sum / 4.0;
            mean.round().clamp(0.0, f32::from(u16::MAX)) as u16
        }
    };

    debug!(
        black_level = metadata.black_level,
        black_level_separate = ?metadata.black_level_separate,
        "Black levels resolved"
    );
}

/// Flags float data as HDR and applies the normalized white point convention.
pub fn resolve_white_point(native: &NativeImage, metadata: &mut DecodedImageMetadata) {
    if native.data_type != NativeDataType::Float32 {
        return;
    }

    metadata.flags.hdr = true;

    if native.white_point == Some(FLOAT_ONE_BITS) {
        metadata.white_point = 1;
    }
    if metadata.white_point == 1 {
        metadata.processed_maximum = [1.0; 4];
    }
}

/// Mosaic pattern of the uncropped plane for a CFA given relative to the crop origin.
pub fn resolve_pattern(cfa: &CfaPattern, crop_offset: Point) -> MosaicPattern {
    let filters = crop_dcraw_filters(dcraw_filters(cfa), crop_offset.x, crop_offset.y);

    match filters {
        0 => MosaicPattern::None,
        XTRANS_FILTERS => {
            let mut tile = [[0u8; 6]; 6];
            for (row, line) in tile.iter_mut().enumerate() {
                for (col, entry) in line.iter_mut().enumerate() {
                    *entry = cfa.color_at(col, row) as u8;
                }
            }
            MosaicPattern::XTrans(tile)
        }
        filters => MosaicPattern::Bayer(filters),
    }
}

/// Stores `pattern` and derives the mosaic-related flags from it.
pub fn apply_pattern(metadata: &mut DecodedImageMetadata, pattern: MosaicPattern) {
    metadata.pattern = pattern;

    let filters = pattern.filters();
    metadata.flags.four_bayer = is_four_bayer(filters);
    if filters != 0 {
        metadata.flags.ldr = false;
        metadata.flags.raw = true;
    }
}

/// Averages the masked black areas per 2x2 CFA position.
fn measure_black_areas(native: &NativeImage) -> Option<[i32; 4]> {
    if native.black_areas.is_empty() {
        return None;
    }

    let mut sums = [0u64; 4];
    let mut counts = [0u64; 4];
    for area in &native.black_areas {
        for (x, y) in area_pixels(*area, native.uncropped.width, native.uncropped.height) {
            if let Some(value) = native.u16_sample(x, y, 0) {
                let channel = ((y & 1) << 1) | (x & 1);
                sums[channel] += u64::from(value);
                counts[channel] += 1;
            }
        }
    }

    let total: u64 = counts.iter().sum();
    if total == 0 {
        return None;
    }
    let overall = sums.iter().sum::<u64>() as f64 / total as f64;

    let mut levels = [0i32; 4];
    for (level, (&sum, &count)) in levels.iter_mut().zip(sums.iter().zip(counts.iter())) {
        let mean = if count == 0 { overall } else { sum as f64 / count as f64 };
        *level = mean.round() as i32;
    }

    debug!(?levels, "Black levels measured from {} masked areas", native.black_areas.len());
    Some(levels)
}

/// Pixels of `area` clipped to a `width` x `height` image.
fn area_pixels(
    area: BlackArea,
    width: usize,
    height: usize,
) -> impl Iterator<Item = (usize, usize)> {
    let x_end = (area.x + area.width).min(width);
    let y_end = (area.y + area.height).min(height);
    (area.y..y_end).flat_map(move |y| (area.x..x_end).map(move |x| (x, y)))
}

fn clamp_to_u16(value: i32) -> u16 {
    value.clamp(0, i32::from(u16::MAX)) as u16
}
