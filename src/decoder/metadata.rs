//! Output metadata record and its extraction from a
//! [`NativeImage`](crate::decoder::raw::NativeImage).

mod extract;
pub mod types;

pub use extract::extract_metadata;
pub use types::{
    CameraName, CropMargins, DecodedImageMetadata, ImageFlags, MosaicPattern, SampleType,
    XTRANS_FILTERS,
};
