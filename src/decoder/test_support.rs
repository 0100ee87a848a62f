//! Fixtures shared by the decoder unit tests.

use crate::decoder::raw::types::{
    CameraIdentity, CfaPattern, Dimensions, NativeDataType, NativeImage, Point, SupportStatus,
};

/// 16-bit RGGB mosaic where sample `(x, y)` holds `y * width + x`.
pub(crate) fn native_u16(width: usize, height: usize) -> NativeImage {
    let samples: Vec<u16> = (0..width * height).map(|i| i as u16).collect();
    NativeImage {
        pixels: bytemuck::cast_slice::<u16, u8>(&samples).to_vec(),
        pitch: width * 2,
        uncropped: Dimensions::new(width, height),
        cropped: Dimensions::new(width, height),
        crop_offset: Point::new(0, 0),
        data_type: NativeDataType::UShort16,
        bytes_per_pixel: 2,
        samples_per_pixel: 1,
        cfa: CfaPattern::from_letters(2, 2, "RGGB"),
        black_level: Some(256),
        black_level_separate: Some([256; 4]),
        black_areas: Vec::new(),
        white_point: Some(4095),
        color_matrix: vec![0.5, -0.1, 0.0, -0.3, 1.2, 0.1, 0.0, 0.2, 0.6],
        wb_coeffs: Some([2.0, 1.0, 1.5, 0.0]),
        camera: CameraIdentity {
            make: "ACME CORPORATION".to_string(),
            model: "X-1 MARK II".to_string(),
            mode: String::new(),
            canonical_make: "Acme".to_string(),
            canonical_model: "X-1 Mark II".to_string(),
            canonical_alias: "X-1 II".to_string(),
        },
        support: SupportStatus::Supported,
        fuji_rotation_pos: 0,
        pixel_aspect_ratio: 1.0,
        warnings: Vec::new(),
    }
}

/// Float RGGB mosaic with the normalized 1.0 white point.
pub(crate) fn native_f32(width: usize, height: usize) -> NativeImage {
    let count = (width * height) as f32;
    let samples: Vec<f32> = (0..width * height).map(|i| i as f32 / count).collect();
    NativeImage {
        pixels: bytemuck::cast_slice::<f32, u8>(&samples).to_vec(),
        pitch: width * 4,
        data_type: NativeDataType::Float32,
        bytes_per_pixel: 4,
        white_point: Some(1.0f32.to_bits()),
        ..native_u16(width, height)
    }
}

/// TIFF-style header (plain TIFF, ORF or RW2 magic) followed by an empty first IFD.
pub(crate) fn tiff_header(magic: &[u8; 4]) -> Vec<u8> {
    let mut bytes = magic.to_vec();
    if magic.starts_with(b"MM") {
        bytes.extend_from_slice(&8u32.to_be_bytes());
    } else {
        bytes.extend_from_slice(&8u32.to_le_bytes());
    }
    // No entries and no next IFD.
    bytes.extend_from_slice(&[0; 6]);
    bytes
}

/// RAF header whose directory points at an embedded JPEG and CFA inside the buffer.
pub(crate) fn raf_header() -> Vec<u8> {
    let mut bytes = vec![0u8; 128];
    bytes[..16].copy_from_slice(b"FUJIFILMCCD-RAW ");
    bytes[84..88].copy_from_slice(&104u32.to_be_bytes());
    bytes[92..96].copy_from_slice(&110u32.to_be_bytes());
    bytes[100..104].copy_from_slice(&120u32.to_be_bytes());
    bytes
}

/// CIFF header with a minimal heap right after it.
pub(crate) fn crw_header() -> Vec<u8> {
    let mut bytes = vec![0u8; 32];
    bytes[..2].copy_from_slice(b"II");
    bytes[2..6].copy_from_slice(&26u32.to_le_bytes());
    bytes[6..14].copy_from_slice(b"HEAPCCDR");
    bytes
}

pub(crate) fn mrw_header() -> Vec<u8> {
    let mut bytes = b"\0MRM".to_vec();
    bytes.extend_from_slice(&8u32.to_be_bytes());
    bytes.extend_from_slice(&[0; 8]);
    bytes
}

pub(crate) fn ari_header() -> Vec<u8> {
    let mut bytes = vec![0u8; 4096 + 16];
    bytes[..8].copy_from_slice(b"ARRI\x12\x34\x56\x78");
    bytes[8..12].copy_from_slice(&4096u32.to_le_bytes());
    bytes
}
