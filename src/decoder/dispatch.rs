//! Format dispatch
//!
//! Picks one decode strategy for a buffer by content sniffing alone, then runs it.

mod registry;
mod strategy;

pub use registry::StrategyRegistry;
pub use strategy::{DecodePolicy, DecodeStrategy};

use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use crate::decoder::buffer::RawBuffer;
use crate::decoder::common::error::BackendError;
use crate::decoder::raw::types::NativeImage;

/// Runs `strategy` on `buffer`, turning a panic inside the backend into
/// [`BackendError::Unknown`].
pub(crate) fn run_strategy(
    strategy: &dyn DecodeStrategy,
    buffer: RawBuffer<'_>,
    policy: DecodePolicy,
) -> Result<NativeImage, BackendError> {
    debug!(strategy = strategy.name(), "Running decode strategy");
    panic::catch_unwind(AssertUnwindSafe(|| strategy.decode(buffer, policy)))
        .unwrap_or(Err(BackendError::Unknown))
}
