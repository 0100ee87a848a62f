use crate::decoder::buffer::RawBuffer;
use crate::decoder::common::error::BackendError;
use crate::decoder::raw::types::NativeImage;

/// Decoding policy handed to every strategy.
///
/// Unknown content and unknown cameras are always rejected rather than guessed; the
/// value cannot be built with that behaviour turned off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodePolicy {
    _sealed: (),
}

impl DecodePolicy {
    pub(crate) fn fail_closed() -> Self {
        Self { _sealed: () }
    }

    pub fn fail_on_unknown(&self) -> bool {
        true
    }
}

/// One raw-format parsing strategy.
pub trait DecodeStrategy: Send + Sync {
    /// Loader tag recorded in the metadata of images this strategy produced.
    fn name(&self) -> &'static str;

    /// Content-based recognition; must not touch anything but the bytes.
    fn identify(&self, buffer: RawBuffer<'_>) -> bool;

    fn decode(
        &self,
        buffer: RawBuffer<'_>,
        policy: DecodePolicy,
    ) -> Result<NativeImage, BackendError>;
}
