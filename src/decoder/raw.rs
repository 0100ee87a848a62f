//! Decoder-native image types and the rawloader-backed strategies.

mod rawloader_strategy;
pub mod types;

pub use rawloader_strategy::{ContainerKind, RawloaderStrategy};
pub use types::{
    BlackArea, CameraIdentity, CfaColor, CfaPattern, Dimensions, NativeDataType, NativeImage,
    Point, SupportStatus,
};
