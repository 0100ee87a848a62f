//! Raw buffer decoding
//!
//! Turns a raw camera file held in memory into a metadata record and, when asked, a
//! normalized pixel plane written into caller-owned memory. The stages are split into
//! modules: format dispatch, the decode strategies, metadata extraction, calibration,
//! layout transformation and failure classification.

pub mod buffer;
pub mod calibration;
pub mod classify;
pub mod common;
pub mod config;
pub mod dispatch;
pub mod layout;
pub mod metadata;
pub mod pipeline;
pub mod raw;
pub mod sraw;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;

pub use buffer::RawBuffer;
pub use common::{BackendError, DecodeError, LoadStatus, Result};
pub use config::{DecodeMode, DecoderConfig, DecoderConfigBuilder};
pub use dispatch::{DecodePolicy, DecodeStrategy, StrategyRegistry};
pub use layout::{
    HeapPlaneAllocator, ImageId, Orientation, PixelPlane, PlaneAllocator, PlaneRequest,
    SourcePlane, TransferPath,
};
pub use metadata::{
    CameraName, CropMargins, DecodedImageMetadata, ImageFlags, MosaicPattern, SampleType,
};
pub use pipeline::RawBufferDecoder;
pub use raw::{ContainerKind, NativeImage, RawloaderStrategy};
