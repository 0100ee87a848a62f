use anyhow::{Context, bail};
use rawbuffer_decoder::decoder::{
    DecodeMode, DecoderConfig, HeapPlaneAllocator, ImageId, LoadStatus, RawBufferDecoder,
};
use rawbuffer_decoder::logger;

use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    logger::init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: rawbuffer_decoder <raw file> [--pixels]");
    };
    let with_pixels = args.any(|arg| arg == "--pixels");

    // The decoder never sees the path; the file is handed over as bytes.
    let data = std::fs::read(&path).with_context(|| format!("reading {path}"))?;
    info!("Loaded {} ({} bytes)", path, data.len());

    let decoder = RawBufferDecoder::new(DecoderConfig::default());
    let mut allocator = HeapPlaneAllocator::new();
    let image_id = ImageId(1);

    let mode = if with_pixels {
        DecodeMode::WithPixels { image_id, allocator: &mut allocator }
    } else {
        DecodeMode::MetadataOnly
    };

    let (status, metadata) = decoder.decode_status(Some(data.as_slice()), mode);
    let Some(metadata) = metadata else {
        error!("Decode failed: {:?}", status);
        bail!("decode failed with status {status:?}");
    };

    info!("Status: {:?}", status);
    info!("Camera: {} (alias {})", metadata.maker_model(), metadata.camera_alias);
    info!("Loader: {}", metadata.loader);
    info!(
        "Size: {}x{} uncropped, {}x{} cropped, margins {:?}",
        metadata.width,
        metadata.height,
        metadata.cropped_width,
        metadata.cropped_height,
        metadata.crop
    );
    info!(
        "Samples: {:?} x {} channel(s), filters 0x{:08x}",
        metadata.sample_type,
        metadata.channels,
        metadata.filters()
    );
    info!(
        "Black: {} {:?}, white: {}",
        metadata.black_level, metadata.black_level_separate, metadata.white_point
    );
    info!("WB: {:?}", metadata.wb_coeffs);
    info!("Flags: {:?}", metadata.flags);

    if status == LoadStatus::Ok && with_pixels {
        if let (Some(plane), Some(pitch)) = (allocator.plane(image_id), allocator.pitch(image_id)) {
            info!("Pixel plane: {} bytes, pitch {}", plane.len(), pitch);
        }
    }

    Ok(())
}
