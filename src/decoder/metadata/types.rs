//! Metadata record handed back to callers

/// Filter code reserved for extended 6x6 (X-Trans) mosaics.
pub const XTRANS_FILTERS: u32 = 9;

/// Capacity of camera name fields, terminator included.
const CAMERA_NAME_CAPACITY: usize = 64;

/// Fixed-capacity camera name. Longer inputs are truncated on a character boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CameraName(String);

impl CameraName {
    pub fn new(name: &str) -> Self {
        let max = CAMERA_NAME_CAPACITY - 1;
        if name.len() <= max {
            return Self(name.to_string());
        }
        let mut end = max;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        Self(name[..end].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CameraName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sample storage of the normalized pixel plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SampleType {
    #[default]
    U16,
    F32,
}

impl SampleType {
    pub fn bytes(self) -> usize {
        match self {
            SampleType::U16 => 2,
            SampleType::F32 => 4,
        }
    }
}

/// Mosaic layout of the uncropped plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MosaicPattern {
    /// Not a mosaic (or not decoded far enough to know).
    #[default]
    None,
    /// dcraw-style 32-bit filter word.
    Bayer(u32),
    /// 6x6 colour index tile, indexed `[row][col]`.
    XTrans([[u8; 6]; 6]),
}

impl MosaicPattern {
    /// Integer filter code; [`XTRANS_FILTERS`] for extended tiles.
    pub fn filters(&self) -> u32 {
        match self {
            MosaicPattern::None => 0,
            MosaicPattern::Bayer(filters) => *filters,
            MosaicPattern::XTrans(_) => XTRANS_FILTERS,
        }
    }
}

/// Crop margins in pixels, relative to the uncropped image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CropMargins {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageFlags {
    /// Floating point samples.
    pub hdr: bool,
    /// Mosaic sensor data.
    pub raw: bool,
    /// Low dynamic range; cleared for mosaic data.
    pub ldr: bool,
    /// Four-colour filter array (CYGM or RGBE).
    pub four_bayer: bool,
    /// Demosaiced or non-mosaic raw (sRAW, linear DNG).
    pub s_raw: bool,
    pub monochrome: bool,
    /// Camera is supported but has no reference samples.
    pub missing_samples: bool,
}

/// Metadata produced by a successful decode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedImageMetadata {
    /// Uncropped width in pixels.
    pub width: usize,
    /// Uncropped height in pixels.
    pub height: usize,
    pub cropped_width: usize,
    pub cropped_height: usize,
    pub crop: CropMargins,

    pub camera_maker: CameraName,
    pub camera_model: CameraName,
    pub camera_alias: CameraName,

    pub sample_type: SampleType,
    pub channels: usize,
    pub pattern: MosaicPattern,

    pub black_level_separate: [u16; 4],
    pub black_level: u16,
    pub white_point: u32,
    pub processed_maximum: [f32; 4],
    /// XYZ to camera matrix, rows beyond the supplied entries zero-filled.
    pub xyz_to_cam: [[f32; 3]; 4],
    /// White balance coefficients, all zero when the source has none.
    pub wb_coeffs: [f32; 4],

    pub fuji_rotation_pos: u32,
    pub pixel_aspect_ratio: f32,

    pub flags: ImageFlags,
    /// Strategy that produced this record.
    pub loader: &'static str,
}

impl DecodedImageMetadata {
    /// `"<maker> <model>"`, as used for camera lookups by the host.
    pub fn maker_model(&self) -> String {
        format!("{} {}", self.camera_maker, self.camera_model)
    }

    pub fn filters(&self) -> u32 {
        self.pattern.filters()
    }

    /// Bytes per pixel of the normalized plane.
    pub fn bytes_per_pixel(&self) -> usize {
        self.channels * self.sample_type.bytes()
    }
}
