use tracing::debug;

use crate::decoder::buffer::RawBuffer;
use crate::decoder::common::error::{DecodeError, Result};
use crate::decoder::dispatch::strategy::DecodeStrategy;
use crate::decoder::raw::{ContainerKind, RawloaderStrategy};

/// Ordered set of decode strategies. The first strategy that identifies a buffer wins.
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn DecodeStrategy>>,
}

impl StrategyRegistry {
    /// Registry with no strategies; every buffer is reported as an unsupported format.
    pub fn empty() -> Self {
        Self { strategies: Vec::new() }
    }

    /// The built-in container families, most specific magic first.
    pub fn with_default_strategies() -> Self {
        ContainerKind::PRIORITY
            .iter()
            .fold(Self::empty(), |registry, &kind| {
                registry.register(RawloaderStrategy::new(kind))
            })
    }

    /// Appends `strategy` at the lowest priority.
    pub fn register<S: DecodeStrategy + 'static>(mut self, strategy: S) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.strategies.iter().map(|s| s.name())
    }

    /// Selects the strategy for `buffer`, or fails with `UnsupportedFormat`.
    pub fn select(&self, buffer: RawBuffer<'_>) -> Result<&dyn DecodeStrategy> {
        let selected = self
            .strategies
            .iter()
            .find(|s| s.identify(buffer))
            .map(|s| s.as_ref());

        match selected {
            Some(strategy) => {
                debug!(strategy = strategy.name(), "Format identified");
                Ok(strategy)
            }
            None => Err(DecodeError::UnsupportedFormat(format!(
                "no decoder recognizes this {} byte buffer",
                buffer.len()
            ))),
        }
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_default_strategies()
    }
}
