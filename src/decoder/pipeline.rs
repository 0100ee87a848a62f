use tracing::{debug, info, instrument, warn};

use crate::decoder::{
    buffer::RawBuffer,
    calibration::{apply_pattern, resolve_black_levels, resolve_pattern, resolve_white_point},
    classify::classify,
    common::error::{DecodeError, LoadStatus, Result},
    config::{DecodeMode, DecoderConfig},
    dispatch::{DecodePolicy, StrategyRegistry, run_strategy},
    layout::{ImageId, PlaneAllocator, PlaneRequest, SourcePlane, TransferPath, transfer},
    metadata::{DecodedImageMetadata, SampleType, extract_metadata},
    raw::types::{NativeDataType, NativeImage, SupportStatus},
    sraw::{expand_to_rgba, resolve_sraw},
};

/// Decodes raw files held in memory into a metadata record and, optionally, a pixel plane.
///
/// A decoder holds no per-call state and can be shared between threads.
pub struct RawBufferDecoder {
    registry: StrategyRegistry,
    config: DecoderConfig,
}

impl RawBufferDecoder {
    /// Decoder with the built-in strategies.
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            registry: StrategyRegistry::default(),
            config,
        }
    }

    pub fn with_registry(registry: StrategyRegistry, config: DecoderConfig) -> Self {
        Self { registry, config }
    }

    /// Decodes `data`.
    ///
    /// In [`DecodeMode::MetadataOnly`] the call returns as soon as the metadata is
    /// complete. With [`DecodeMode::WithPixels`] the plane is requested from the allocator
    /// once and written exactly once; nothing is retained after the call returns.
    ///
    /// # Arguments
    ///
    /// * `data` - Complete raw file held in memory
    /// * `mode` - Whether to stop after the metadata or also fill a pixel plane
    ///
    /// # Returns
    ///
    /// * `Ok(DecodedImageMetadata)` - Fully populated metadata record
    /// * `Err(DecodeError)` - The first failure, already classified; see
    ///   [`DecodeError::status`] for the flat result code
    #[instrument(skip(self, data, mode), fields(input_size = data.len()))]
    pub fn decode(&self, data: &[u8], mode: DecodeMode<'_>) -> Result<DecodedImageMetadata> {
        let buffer = RawBuffer::new(data)?;
        self.decode_buffer(buffer, mode)
    }

    /// Flat-status variant for callers that may pass no buffer at all.
    pub fn decode_status(
        &self,
        data: Option<&[u8]>,
        mode: DecodeMode<'_>,
    ) -> (LoadStatus, Option<DecodedImageMetadata>) {
        let result =
            RawBuffer::from_option(data).and_then(|buffer| self.decode_buffer(buffer, mode));
        (LoadStatus::of(&result), result.ok())
    }

    pub fn decode_buffer(
        &self,
        buffer: RawBuffer<'_>,
        mode: DecodeMode<'_>,
    ) -> Result<DecodedImageMetadata> {
        info!("Starting raw buffer decode");

        let strategy = {
            let _span = tracing::info_span!("identify").entered();
            self.registry.select(buffer)?
        };

        let native = {
            let _span = tracing::info_span!("decode_raw", strategy = strategy.name()).entered();
            run_strategy(strategy, buffer, DecodePolicy::fail_closed())
                .map_err(|e| classify(e, "", ""))?
        };

        check_support(&native, DecodePolicy::fail_closed())?;

        for warning in &native.warnings {
            warn!("Decoder warning: {}", warning);
        }

        self.validate_dimensions(native.uncropped.width, native.uncropped.height)?;

        let mut metadata = {
            let _span = tracing::info_span!("extract_metadata").entered();
            extract_metadata(&native, strategy.name())?
        };

        {
            let _span = tracing::info_span!("resolve_calibration").entered();
            resolve_black_levels(&native, &mut metadata);
            resolve_white_point(&native, &mut metadata);
            metadata.flags.missing_samples = native.support == SupportStatus::SupportedNoSamples;

            match &native.cfa {
                Some(cfa) => {
                    let sample_type = validate_mosaic_layout(&native)?;
                    metadata.channels = 1;
                    metadata.sample_type = sample_type;
                    apply_pattern(&mut metadata, resolve_pattern(cfa, native.crop_offset));
                }
                None => resolve_sraw(&native, &mut metadata)?,
            }
        }

        match mode {
            DecodeMode::MetadataOnly => {
                debug!("Metadata-only decode, no pixel plane requested");
            }
            DecodeMode::WithPixels { image_id, allocator } => {
                let _span = tracing::info_span!("write_pixels").entered();
                self.write_pixels(&native, &metadata, image_id, allocator)?;
            }
        }

        info!(
            camera = %metadata.maker_model(),
            width = metadata.width,
            height = metadata.height,
            filters = metadata.filters(),
            "Decode complete"
        );
        Ok(metadata)
    }

    fn write_pixels(
        &self,
        native: &NativeImage,
        metadata: &DecodedImageMetadata,
        image_id: ImageId,
        allocator: &mut dyn PlaneAllocator,
    ) -> Result<()> {
        let (width, height) = if native.is_cfa() && self.config.orientation.swap_xy {
            (metadata.height, metadata.width)
        } else {
            (metadata.width, metadata.height)
        };
        let request = PlaneRequest {
            image_id,
            width,
            height,
            channels: metadata.channels,
            sample_type: metadata.sample_type,
        };

        let mut plane = allocator.allocate(&request).ok_or_else(|| {
            DecodeError::DestinationUnavailable(format!(
                "no {}x{} plane available for image {:?}",
                width, height, image_id
            ))
        })?;

        if !native.is_cfa() {
            return expand_to_rgba(native, &mut plane);
        }

        let source = SourcePlane {
            bytes: &native.pixels,
            pitch: native.pitch,
            width: native.uncropped.width,
            height: native.uncropped.height,
            bytes_per_pixel: native.bytes_per_pixel,
        };
        let path: TransferPath = transfer(&source, &mut plane, self.config.orientation)?;
        debug!(?path, "Pixel plane written");
        Ok(())
    }

    fn validate_dimensions(&self, width: usize, height: usize) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if width == 0 || height == 0 {
            return Err(DecodeError::InvalidDimensions(width, height));
        }

        if let Some(max) = self.config.max_dimension {
            if width > max || height > max {
                warn!("Image dimensions {}x{} exceed maximum {}", width, height, max);
                return Err(DecodeError::UnsupportedFeature(format!(
                    "image of {}x{} exceeds the {} pixel limit",
                    width, height, max
                )));
            }
        }

        Ok(())
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: DecoderConfig) {
        self.config = config;
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }
}

impl Default for RawBufferDecoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

/// Rejects cameras the calibration data does not vouch for.
fn check_support(native: &NativeImage, policy: DecodePolicy) -> Result<()> {
    let rejected = match native.support {
        SupportStatus::Supported | SupportStatus::SupportedNoSamples => false,
        SupportStatus::Unsupported => true,
        SupportStatus::Unknown => policy.fail_on_unknown(),
    };

    if rejected {
        warn!(
            make = %native.camera.make,
            model = %native.camera.model,
            mode = %native.camera.mode,
            support = ?native.support,
            "Camera not supported, and not allowed to guess"
        );
        return Err(DecodeError::UnsupportedCamera {
            make: native.camera.make.clone(),
            model: native.camera.model.clone(),
        });
    }
    Ok(())
}

/// Checks sample type, width and count of a mosaic image and returns its sample type.
fn validate_mosaic_layout(native: &NativeImage) -> Result<SampleType> {
    let bpp = native.bytes_per_pixel;

    let sample_type = match (native.data_type, bpp) {
        (NativeDataType::UShort16, 2) => SampleType::U16,
        (NativeDataType::Float32, 4) => SampleType::F32,
        (data_type, bpp) => {
            return Err(DecodeError::UnsupportedFeature(format!(
                "{:?} samples at {} bytes per pixel",
                data_type, bpp
            )));
        }
    };

    if native.samples_per_pixel != 1 {
        return Err(DecodeError::LoadFailed(format!(
            "mosaic image with {} samples per pixel",
            native.samples_per_pixel
        )));
    }

    Ok(sample_type)
}
