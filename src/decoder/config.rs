//! Decoder configuration types

use crate::decoder::layout::{ImageId, Orientation, PlaneAllocator};

/// Configuration for buffer decoding
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Orientation correction applied when copying pixels (none by default)
    pub orientation: Orientation,
    /// Whether to reject images with zero width or height
    pub validate_dimensions: bool,
    /// Largest accepted width or height, if any
    pub max_dimension: Option<usize>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            orientation: Orientation::NONE,
            validate_dimensions: true,
            max_dimension: None,
        }
    }
}

impl DecoderConfig {
    pub fn builder() -> DecoderConfigBuilder {
        DecoderConfigBuilder::default()
    }
}

/// Builder for DecoderConfig
#[derive(Default)]
pub struct DecoderConfigBuilder {
    orientation: Option<Orientation>,
    validate_dimensions: Option<bool>,
    max_dimension: Option<Option<usize>>,
}

impl DecoderConfigBuilder {
    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn max_dimension(mut self, max: Option<usize>) -> Self {
        self.max_dimension = Some(max);
        self
    }

    pub fn build(self) -> DecoderConfig {
        let default = DecoderConfig::default();
        DecoderConfig {
            orientation: self.orientation.unwrap_or(default.orientation),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
            max_dimension: self.max_dimension.unwrap_or(default.max_dimension),
        }
    }
}

/// What a decode call produces besides metadata.
pub enum DecodeMode<'a> {
    /// Stop once the metadata is complete; nothing is allocated or written.
    MetadataOnly,
    /// Also write the normalized plane into memory obtained from `allocator`.
    WithPixels {
        image_id: ImageId,
        allocator: &'a mut dyn PlaneAllocator,
    },
}

impl std::fmt::Debug for DecodeMode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeMode::MetadataOnly => f.write_str("MetadataOnly"),
            DecodeMode::WithPixels { image_id, .. } => {
                f.debug_struct("WithPixels").field("image_id", image_id).finish_non_exhaustive()
            }
        }
    }
}
