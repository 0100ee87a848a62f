//! Non-mosaic images (sRAW, linear DNG, monochrome without CFA).
//!
//! These are normalized to four-channel float RGBA instead of a single-channel mosaic.

use tracing::debug;

use crate::decoder::common::error::{DecodeError, Result};
use crate::decoder::layout::PixelPlane;
use crate::decoder::metadata::types::{DecodedImageMetadata, MosaicPattern, SampleType};
use crate::decoder::raw::types::{NativeDataType, NativeImage};

const OUTPUT_CHANNELS: usize = 4;

/// Sets the plane description for a non-mosaic image, rejecting layouts that cannot be
/// expanded to RGBA.
pub fn resolve_sraw(native: &NativeImage, metadata: &mut DecodedImageMetadata) -> Result<()> {
    let cpp = native.samples_per_pixel;
    if cpp != 1 && cpp != 3 {
        return Err(DecodeError::UnsupportedFeature(format!(
            "{cpp} samples per pixel in a non-mosaic image"
        )));
    }
    sample_width(native.data_type)?;

    metadata.channels = OUTPUT_CHANNELS;
    metadata.sample_type = SampleType::F32;
    metadata.pattern = MosaicPattern::None;
    metadata.flags.raw = false;
    metadata.flags.s_raw = true;
    metadata.flags.monochrome = cpp == 1;

    debug!(cpp, "Non-mosaic image, expanding to RGBA");
    Ok(())
}

/// Writes `native` into `dst` as RGBA float rows. 16-bit samples are scaled to 0.0-1.0,
/// float samples are copied, single-sample pixels are replicated, and alpha is zero.
pub fn expand_to_rgba(native: &NativeImage, dst: &mut PixelPlane<'_>) -> Result<()> {
    let width = native.uncropped.width;
    let height = native.uncropped.height;
    let cpp = native.samples_per_pixel;
    let sample_bytes = sample_width(native.data_type)?;

    let src_row_bytes = width * cpp * sample_bytes;
    if native.pitch < src_row_bytes || native.pixels.len() < native.pitch * height {
        return Err(DecodeError::LoadFailed(format!(
            "decoded plane of {} bytes does not cover {}x{} at pitch {}",
            native.pixels.len(),
            width,
            height,
            native.pitch
        )));
    }
    dst.ensure_rows(height)?;

    let pixel_bytes = OUTPUT_CHANNELS * 4;
    let dst_pitch = dst.pitch();
    let columns = width.min(dst_pitch / pixel_bytes);

    for (y, dst_row) in dst.bytes_mut().chunks_exact_mut(dst_pitch).take(height).enumerate() {
        dst_row.fill(0);
        let src_row = &native.pixels[y * native.pitch..y * native.pitch + src_row_bytes];
        for x in 0..columns {
            for c in 0..3 {
                let sample = if cpp == 1 { 0 } else { c };
                let offset = (x * cpp + sample) * sample_bytes;
                let value = read_sample(native.data_type, &src_row[offset..offset + sample_bytes]);
                let out = x * pixel_bytes + c * 4;
                dst_row[out..out + 4].copy_from_slice(&value.to_ne_bytes());
            }
        }
    }

    Ok(())
}

fn sample_width(data_type: NativeDataType) -> Result<usize> {
    match data_type {
        NativeDataType::UShort16 => Ok(2),
        NativeDataType::Float32 => Ok(4),
        NativeDataType::Other(bits) => Err(DecodeError::UnsupportedFeature(format!(
            "{bits}-bit samples"
        ))),
    }
}

fn read_sample(data_type: NativeDataType, bytes: &[u8]) -> f32 {
    match data_type {
        NativeDataType::UShort16 => {
            f32::from(u16::from_ne_bytes([bytes[0], bytes[1]])) / f32::from(u16::MAX)
        }
        _ => f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
    }
}
