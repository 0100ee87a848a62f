//! Decoder-native image representation
//!
//! A [`NativeImage`] is what a decode strategy hands back: pixel bytes in the strategy's
//! own geometry and pitch, plus everything it learned about the camera.

/// Width/height pair in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
}

impl Dimensions {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }
}

/// Pixel offset inside the uncropped image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Sample storage the strategy produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeDataType {
    UShort16,
    Float32,
    /// Anything else, by bit width. Always rejected by the pipeline.
    Other(u32),
}

/// How well the calibration database knows the camera.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SupportStatus {
    #[default]
    Supported,
    /// Known and supported, but no reference samples exist for it.
    SupportedNoSamples,
    /// Listed as explicitly unsupported.
    Unsupported,
    /// Not listed at all.
    Unknown,
}

/// Colour of a single CFA site.
///
/// Discriminants are the colour indices written into extended (6x6) pattern tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CfaColor {
    Red = 0,
    Green = 1,
    Blue = 2,
    Cyan = 3,
    Magenta = 4,
    Yellow = 5,
    White = 6,
    FujiGreen = 7,
    Emerald = 8,
}

impl CfaColor {
    /// Two-bit colour code used by dcraw-style filter words.
    pub fn dcraw_code(self) -> u32 {
        match self {
            CfaColor::Red | CfaColor::FujiGreen => 0,
            CfaColor::Green | CfaColor::Magenta => 1,
            CfaColor::Blue | CfaColor::Cyan => 2,
            CfaColor::Yellow | CfaColor::White | CfaColor::Emerald => 3,
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'R' => Some(CfaColor::Red),
            'G' => Some(CfaColor::Green),
            'B' => Some(CfaColor::Blue),
            'C' => Some(CfaColor::Cyan),
            'M' => Some(CfaColor::Magenta),
            'Y' => Some(CfaColor::Yellow),
            'W' => Some(CfaColor::White),
            'F' => Some(CfaColor::FujiGreen),
            'E' => Some(CfaColor::Emerald),
            _ => None,
        }
    }
}

/// Colour filter array layout, relative to the cropped image origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfaPattern {
    width: usize,
    height: usize,
    colors: Vec<CfaColor>,
}

impl CfaPattern {
    /// Builds a pattern from row-major colours. Returns `None` when the colour count does
    /// not match the size or the size is empty.
    pub fn new(width: usize, height: usize, colors: Vec<CfaColor>) -> Option<Self> {
        if width == 0 || height == 0 || colors.len() != width * height {
            return None;
        }
        Some(Self { width, height, colors })
    }

    /// Parses a row-major letter string such as `"RGGB"`.
    pub fn from_letters(width: usize, height: usize, letters: &str) -> Option<Self> {
        let colors = letters
            .chars()
            .map(CfaColor::from_letter)
            .collect::<Option<Vec<_>>>()?;
        Self::new(width, height, colors)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Colour at column `x`, row `y`; coordinates wrap around the pattern size.
    pub fn color_at(&self, x: usize, y: usize) -> CfaColor {
        self.colors[(y % self.height) * self.width + (x % self.width)]
    }
}

/// Masked sensor region used to measure black levels, in uncropped coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlackArea {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// Camera naming as reported by the file and as canonicalized by the calibration data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraIdentity {
    pub make: String,
    pub model: String,
    pub mode: String,
    pub canonical_make: String,
    pub canonical_model: String,
    pub canonical_alias: String,
}

/// Image as produced by a decode strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeImage {
    /// Uncropped pixel bytes, `pitch` bytes per row.
    pub pixels: Vec<u8>,
    pub pitch: usize,
    pub uncropped: Dimensions,
    pub cropped: Dimensions,
    /// Top-left corner of the cropped area.
    pub crop_offset: Point,
    pub data_type: NativeDataType,
    /// Bytes per pixel, all samples included.
    pub bytes_per_pixel: usize,
    pub samples_per_pixel: usize,
    /// `None` for images that are not a colour filter mosaic.
    pub cfa: Option<CfaPattern>,
    /// Scalar black level; `None` when the source does not know it.
    pub black_level: Option<i32>,
    /// Per-channel black levels, when the source reports them separately.
    pub black_level_separate: Option<[i32; 4]>,
    pub black_areas: Vec<BlackArea>,
    pub white_point: Option<u32>,
    /// XYZ to camera matrix, row-major, three entries per row.
    pub color_matrix: Vec<f32>,
    pub wb_coeffs: Option<[f32; 4]>,
    pub camera: CameraIdentity,
    pub support: SupportStatus,
    pub fuji_rotation_pos: u32,
    pub pixel_aspect_ratio: f64,
    /// Non-fatal problems found while decoding.
    pub warnings: Vec<String>,
}

impl NativeImage {
    pub fn is_cfa(&self) -> bool {
        self.cfa.is_some()
    }

    /// Reads a 16-bit sample at pixel `(x, y)`, sample index `c`, for black-area statistics.
    pub(crate) fn u16_sample(&self, x: usize, y: usize, c: usize) -> Option<u16> {
        if self.data_type != NativeDataType::UShort16 {
            return None;
        }
        let offset = y * self.pitch + (x * self.samples_per_pixel + c) * 2;
        let bytes = self.pixels.get(offset..offset + 2)?;
        Some(u16::from_ne_bytes([bytes[0], bytes[1]]))
    }
}
