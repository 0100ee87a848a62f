use tracing::debug;

use crate::decoder::common::error::{DecodeError, Result};
use crate::decoder::metadata::types::{CameraName, CropMargins, DecodedImageMetadata};
use crate::decoder::raw::types::NativeImage;

/// White point assumed when the source reports none.
const DEFAULT_WHITE_POINT: u32 = (1 << 16) - 1;

/// Copies identity, geometry and colour data out of `native`.
///
/// Black levels, HDR handling and the mosaic pattern are left to the calibration stage.
///
/// # Arguments
///
/// * `native` - Image produced by a decode strategy
/// * `loader` - Tag of the strategy that produced it
///
/// # Returns
///
/// * `Ok(DecodedImageMetadata)` - Record with missing colour data zero-filled
/// * `Err(DecodeError)` - The crop window does not fit inside the uncropped image
pub fn extract_metadata(
    native: &NativeImage,
    loader: &'static str,
) -> Result<DecodedImageMetadata> {
    let crop = crop_margins(native)?;

    let mut xyz_to_cam = [[0.0f32; 3]; 4];
    for (k, row) in xyz_to_cam.iter_mut().enumerate() {
        for (i, entry) in row.iter_mut().enumerate() {
            *entry = native.color_matrix.get(k * 3 + i).copied().unwrap_or(0.0);
        }
    }

    let metadata = DecodedImageMetadata {
        width: native.uncropped.width,
        height: native.uncropped.height,
        cropped_width: native.uncropped.width - crop.left - crop.right,
        cropped_height: native.uncropped.height - crop.top - crop.bottom,
        crop,
        camera_maker: CameraName::new(&native.camera.canonical_make),
        camera_model: CameraName::new(&native.camera.canonical_model),
        camera_alias: CameraName::new(&native.camera.canonical_alias),
        white_point: native.white_point.unwrap_or(DEFAULT_WHITE_POINT),
        xyz_to_cam,
        wb_coeffs: native.wb_coeffs.unwrap_or([0.0; 4]),
        fuji_rotation_pos: native.fuji_rotation_pos,
        pixel_aspect_ratio: native.pixel_aspect_ratio as f32,
        loader,
        ..DecodedImageMetadata::default()
    };

    debug!(
        camera = %metadata.maker_model(),
        width = metadata.width,
        height = metadata.height,
        cropped_width = metadata.cropped_width,
        cropped_height = metadata.cropped_height,
        "Metadata extracted"
    );

    Ok(metadata)
}

/// Bottom and right margins are derived from the cropped size, never read from the source.
fn crop_margins(native: &NativeImage) -> Result<CropMargins> {
    let uncropped = native.uncropped;
    let cropped = native.cropped;
    let offset = native.crop_offset;

    let right = uncropped
        .width
        .checked_sub(cropped.width)
        .and_then(|w| w.checked_sub(offset.x));
    let bottom = uncropped
        .height
        .checked_sub(cropped.height)
        .and_then(|h| h.checked_sub(offset.y));

    match (right, bottom) {
        (Some(right), Some(bottom)) => Ok(CropMargins {
            top: offset.y,
            left: offset.x,
            bottom,
            right,
        }),
        _ => Err(DecodeError::FileCorrupted(format!(
            "crop {}x{}+{}+{} does not fit in {}x{}",
            cropped.width, cropped.height, offset.x, offset.y, uncropped.width, uncropped.height
        ))),
    }
}
