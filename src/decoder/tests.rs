use std::sync::atomic::{AtomicUsize, Ordering};

use crate::decoder::buffer::RawBuffer;
use crate::decoder::common::error::{BackendError, DecodeError, LoadStatus};
use crate::decoder::config::{DecodeMode, DecoderConfig};
use crate::decoder::dispatch::{DecodePolicy, DecodeStrategy, StrategyRegistry};
use crate::decoder::layout::{
    HeapPlaneAllocator, ImageId, Orientation, PixelPlane, PlaneAllocator, PlaneRequest,
};
use crate::decoder::metadata::{MosaicPattern, SampleType};
use crate::decoder::pipeline::RawBufferDecoder;
use crate::decoder::raw::types::{
    CfaPattern, Dimensions, NativeDataType, NativeImage, Point, SupportStatus,
};
use crate::decoder::test_support::{native_f32, native_u16};

const MOCK_MAGIC: &[u8] = b"MOCKRAW\0";

struct MockStrategy {
    outcome: Result<NativeImage, BackendError>,
    should_panic: bool,
    calls: AtomicUsize,
}

impl MockStrategy {
    fn returning(native: NativeImage) -> Self {
        Self { outcome: Ok(native), should_panic: false, calls: AtomicUsize::new(0) }
    }

    fn failing(error: BackendError) -> Self {
        Self { outcome: Err(error), should_panic: false, calls: AtomicUsize::new(0) }
    }

    fn panicking() -> Self {
        Self { outcome: Err(BackendError::Unknown), should_panic: true, calls: AtomicUsize::new(0) }
    }
}

impl DecodeStrategy for MockStrategy {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn identify(&self, buffer: RawBuffer<'_>) -> bool {
        buffer.has_magic_at(0, MOCK_MAGIC)
    }

    fn decode(
        &self,
        _buffer: RawBuffer<'_>,
        policy: DecodePolicy,
    ) -> Result<NativeImage, BackendError> {
        assert!(policy.fail_on_unknown());
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_panic {
            panic!("mock decoder blew up");
        }
        self.outcome.clone()
    }
}

/// Allocator that counts requests and can refuse them.
struct RecordingAllocator {
    inner: HeapPlaneAllocator,
    requests: Vec<PlaneRequest>,
    refuse: bool,
}

impl RecordingAllocator {
    fn new(inner: HeapPlaneAllocator) -> Self {
        Self { inner, requests: Vec::new(), refuse: false }
    }
}

impl PlaneAllocator for RecordingAllocator {
    fn allocate(&mut self, request: &PlaneRequest) -> Option<PixelPlane<'_>> {
        self.requests.push(*request);
        if self.refuse {
            return None;
        }
        self.inner.allocate(request)
    }
}

fn decoder_for(strategy: MockStrategy) -> RawBufferDecoder {
    let registry = StrategyRegistry::empty().register(strategy);
    RawBufferDecoder::with_registry(registry, DecoderConfig::default())
}

fn mock_file() -> Vec<u8> {
    let mut bytes = MOCK_MAGIC.to_vec();
    bytes.extend_from_slice(&[0u8; 24]);
    bytes
}

fn status_for(native: NativeImage) -> LoadStatus {
    let decoder = decoder_for(MockStrategy::returning(native));
    LoadStatus::of(&decoder.decode(&mock_file(), DecodeMode::MetadataOnly))
}

#[test]
fn test_metadata_only_decode() {
    let decoder = decoder_for(MockStrategy::returning(native_u16(8, 6)));

    let metadata = decoder.decode(&mock_file(), DecodeMode::MetadataOnly).unwrap();
    assert_eq!(metadata.loader, "mock");
    assert_eq!(metadata.camera_maker.as_str(), "Acme");
    assert_eq!(metadata.camera_model.as_str(), "X-1 Mark II");
    assert_eq!(metadata.camera_alias.as_str(), "X-1 II");
    assert_eq!(metadata.maker_model(), "Acme X-1 Mark II");
    assert_eq!((metadata.width, metadata.height), (8, 6));
    assert_eq!(metadata.channels, 1);
    assert_eq!(metadata.sample_type, SampleType::U16);
    assert_eq!(metadata.pattern, MosaicPattern::Bayer(0x9494_9494));
    assert_eq!(metadata.white_point, 4095);
    assert_eq!(metadata.wb_coeffs, [2.0, 1.0, 1.5, 0.0]);
    assert_eq!(metadata.xyz_to_cam[3], [0.0; 3]);
    assert!(metadata.flags.raw);
    assert!(!metadata.flags.hdr);
    assert!(!metadata.flags.four_bayer);
}

#[test]
fn test_metadata_only_never_allocates() {
    let decoder = decoder_for(MockStrategy::returning(native_u16(8, 6)));
    let mut allocator = RecordingAllocator::new(HeapPlaneAllocator::new());

    let (status, metadata) =
        decoder.decode_status(Some(mock_file().as_slice()), DecodeMode::MetadataOnly);
    assert_eq!(status, LoadStatus::Ok);
    let metadata_only = metadata.unwrap();

    let mode = DecodeMode::WithPixels { image_id: ImageId(2), allocator: &mut allocator };
    let (status, metadata) = decoder.decode_status(Some(mock_file().as_slice()), mode);
    assert_eq!(status, LoadStatus::Ok);
    assert_eq!(metadata.unwrap(), metadata_only);
    assert_eq!(allocator.requests.len(), 1);
    assert_eq!(allocator.requests[0].image_id, ImageId(2));
}

#[test]
fn test_crop_geometry_is_closed() {
    let mut native = native_u16(16, 12);
    native.cropped = Dimensions::new(11, 8);
    native.crop_offset = Point::new(3, 1);
    let decoder = decoder_for(MockStrategy::returning(native));

    let metadata = decoder.decode(&mock_file(), DecodeMode::MetadataOnly).unwrap();
    assert_eq!(metadata.cropped_width + metadata.crop.left + metadata.crop.right, metadata.width);
    assert_eq!(metadata.cropped_height + metadata.crop.top + metadata.crop.bottom, metadata.height);
    assert_eq!((metadata.crop.right, metadata.crop.bottom), (2, 3));
    // RGGB at an odd x and odd y offset reads as BGGR from the uncropped origin
    assert_eq!(metadata.filters(), 0x1616_1616);
}

#[test]
fn test_black_level_derivations() {
    let mut native = native_u16(4, 4);
    native.black_level = Some(1024);
    native.black_level_separate = None;
    let metadata = decoder_for(MockStrategy::returning(native))
        .decode(&mock_file(), DecodeMode::MetadataOnly)
        .unwrap();
    assert_eq!(metadata.black_level_separate, [1024; 4]);

    let mut native = native_u16(4, 4);
    native.black_level = None;
    native.black_level_separate = Some([510, 512, 512, 513]);
    let metadata = decoder_for(MockStrategy::returning(native))
        .decode(&mock_file(), DecodeMode::MetadataOnly)
        .unwrap();
    assert_eq!(metadata.black_level, 512);
}

#[test]
fn test_float_mosaic_white_point() {
    let decoder = decoder_for(MockStrategy::returning(native_f32(4, 4)));

    let metadata = decoder.decode(&mock_file(), DecodeMode::MetadataOnly).unwrap();
    assert_eq!(metadata.sample_type, SampleType::F32);
    assert!(metadata.flags.hdr);
    assert_eq!(metadata.white_point, 1);
    assert_eq!(metadata.processed_maximum, [1.0; 4]);
}

#[test]
fn test_empty_input_is_precondition_failure() {
    let decoder = decoder_for(MockStrategy::returning(native_u16(4, 4)));

    let err = decoder.decode(&[], DecodeMode::MetadataOnly).unwrap_err();
    assert_eq!(err.status(), LoadStatus::InvalidInput);

    let (status, metadata) = decoder.decode_status(None, DecodeMode::MetadataOnly);
    assert_eq!(status, LoadStatus::InvalidInput);
    assert!(metadata.is_none());
}

#[test]
fn test_unrecognized_content_never_reaches_a_strategy() {
    let strategy = MockStrategy::returning(native_u16(4, 4));
    let registry = StrategyRegistry::empty().register(strategy);
    let decoder = RawBufferDecoder::with_registry(registry, DecoderConfig::default());

    let err = decoder.decode(b"\x89PNG\r\n\x1a\n", DecodeMode::MetadataOnly).unwrap_err();
    assert!(matches!(err, DecodeError::UnsupportedFormat(_)));
}

#[test]
fn test_default_registry_rejects_non_raw_content() {
    let decoder = RawBufferDecoder::default();
    let err = decoder
        .decode(b"just some text, not an image", DecodeMode::MetadataOnly)
        .unwrap_err();
    assert_eq!(err.status(), LoadStatus::UnsupportedFormat);
}

#[test]
fn test_unknown_camera_is_refused() {
    let mut native = native_u16(4, 4);
    native.support = SupportStatus::Unknown;
    assert_eq!(status_for(native), LoadStatus::UnsupportedCamera);

    let mut native = native_u16(4, 4);
    native.support = SupportStatus::Unsupported;
    assert_eq!(status_for(native), LoadStatus::UnsupportedCamera);
}

#[test]
fn test_camera_without_samples_is_flagged() {
    let mut native = native_u16(4, 4);
    native.support = SupportStatus::SupportedNoSamples;
    let metadata = decoder_for(MockStrategy::returning(native))
        .decode(&mock_file(), DecodeMode::MetadataOnly)
        .unwrap();
    assert!(metadata.flags.missing_samples);
}

#[test]
fn test_unsupported_sample_layouts() {
    let mut native = native_u16(4, 4);
    native.data_type = NativeDataType::Other(8);
    native.bytes_per_pixel = 1;
    assert_eq!(status_for(native), LoadStatus::UnsupportedFeature);

    let mut native = native_u16(4, 4);
    native.bytes_per_pixel = 4;
    assert_eq!(status_for(native), LoadStatus::UnsupportedFeature);

    let mut native = native_f32(4, 4);
    native.bytes_per_pixel = 2;
    assert_eq!(status_for(native), LoadStatus::UnsupportedFeature);

    let mut native = native_u16(4, 4);
    native.samples_per_pixel = 2;
    assert_eq!(status_for(native), LoadStatus::LoadFailed);
}

#[test]
fn test_backend_failures_are_classified() {
    let cases = [
        (BackendError::Io("read past end".into()), LoadStatus::IoError),
        (BackendError::Parser("bad CIFF heap".into()), LoadStatus::UnsupportedFormat),
        (BackendError::Decoder("Camera not supported".into()), LoadStatus::UnsupportedCamera),
        (
            BackendError::Decoder("bit depth 10 not supported".into()),
            LoadStatus::UnsupportedFeature,
        ),
        (BackendError::Decoder("strip offset out of range".into()), LoadStatus::FileCorrupted),
        (BackendError::Metadata("no hints for mode".into()), LoadStatus::UnsupportedFeature),
        (BackendError::Other("allocation failed".into()), LoadStatus::FileCorrupted),
        (BackendError::Unknown, LoadStatus::LoadFailed),
    ];

    for (error, expected) in cases {
        let decoder = decoder_for(MockStrategy::failing(error.clone()));
        let result = decoder.decode(&mock_file(), DecodeMode::MetadataOnly);
        assert_eq!(LoadStatus::of(&result), expected, "{:?}", error);
    }
}

#[test]
fn test_strategy_panic_is_load_failure() {
    let decoder = decoder_for(MockStrategy::panicking());
    let err = decoder.decode(&mock_file(), DecodeMode::MetadataOnly).unwrap_err();
    assert_eq!(err.status(), LoadStatus::LoadFailed);
}

#[test]
fn test_dimension_validation() {
    let native = native_u16(0, 0);
    assert_eq!(status_for(native), LoadStatus::FileCorrupted);

    let config = DecoderConfig::builder().max_dimension(Some(8)).build();
    let registry = StrategyRegistry::empty().register(MockStrategy::returning(native_u16(16, 4)));
    let decoder = RawBufferDecoder::with_registry(registry, config);
    let err = decoder.decode(&mock_file(), DecodeMode::MetadataOnly).unwrap_err();
    assert_eq!(err.status(), LoadStatus::UnsupportedFeature);
}

#[test]
fn test_pixels_bulk_copied_into_tight_plane() {
    let native = native_u16(6, 4);
    let expected = native.pixels.clone();
    let decoder = decoder_for(MockStrategy::returning(native));
    let mut allocator = RecordingAllocator::new(HeapPlaneAllocator::new());

    let mode = DecodeMode::WithPixels { image_id: ImageId(3), allocator: &mut allocator };
    decoder.decode(&mock_file(), mode).unwrap();

    assert_eq!(allocator.requests.len(), 1);
    assert_eq!(allocator.requests[0].row_bytes(), 12);
    assert_eq!(allocator.inner.plane(ImageId(3)).unwrap(), expected.as_slice());
}

#[test]
fn test_pixels_reflowed_into_padded_plane() {
    let native = native_u16(6, 4);
    let source = native.pixels.clone();
    let decoder = decoder_for(MockStrategy::returning(native));
    let mut allocator = RecordingAllocator::new(HeapPlaneAllocator::new().with_row_alignment(32));

    let mode = DecodeMode::WithPixels { image_id: ImageId(4), allocator: &mut allocator };
    decoder.decode(&mock_file(), mode).unwrap();

    let plane = allocator.inner.plane(ImageId(4)).unwrap();
    assert_eq!(allocator.inner.pitch(ImageId(4)), Some(32));
    for (row, dst_row) in plane.chunks_exact(32).enumerate() {
        assert_eq!(&dst_row[..12], &source[row * 12..row * 12 + 12]);
        assert!(dst_row[12..].iter().all(|&b| b == 0));
    }
}

#[test]
fn test_refused_allocation_is_cache_full() {
    let decoder = decoder_for(MockStrategy::returning(native_u16(6, 4)));
    let mut allocator = RecordingAllocator::new(HeapPlaneAllocator::new());
    allocator.refuse = true;

    let mode = DecodeMode::WithPixels { image_id: ImageId(5), allocator: &mut allocator };
    let err = decoder.decode(&mock_file(), mode).unwrap_err();
    assert_eq!(err.status(), LoadStatus::CacheFull);
    assert_eq!(allocator.requests.len(), 1);
}

#[test]
fn test_rotated_plane_request() {
    let config = DecoderConfig::builder().orientation(Orientation::ROTATE_CW).build();
    let registry = StrategyRegistry::empty().register(MockStrategy::returning(native_u16(6, 4)));
    let decoder = RawBufferDecoder::with_registry(registry, config);
    let mut allocator = RecordingAllocator::new(HeapPlaneAllocator::new());

    let mode = DecodeMode::WithPixels { image_id: ImageId(6), allocator: &mut allocator };
    let metadata = decoder.decode(&mock_file(), mode).unwrap();

    assert_eq!((metadata.width, metadata.height), (6, 4));
    assert_eq!((allocator.requests[0].width, allocator.requests[0].height), (4, 6));
    // bottom-left source sample (value 18) lands top-left after a clockwise turn
    let plane = allocator.inner.plane(ImageId(6)).unwrap();
    assert_eq!(u16::from_ne_bytes([plane[0], plane[1]]), 18);
}

#[test]
fn test_xtrans_through_pipeline() {
    let mut native = native_u16(12, 12);
    native.cfa = CfaPattern::from_letters(6, 6, "GGRGGBGGBGGRBRGRBGGGBGGRGGRGGBRBGBRG");
    let metadata = decoder_for(MockStrategy::returning(native))
        .decode(&mock_file(), DecodeMode::MetadataOnly)
        .unwrap();

    assert_eq!(metadata.filters(), 9);
    assert!(matches!(metadata.pattern, MosaicPattern::XTrans(tile) if tile[0][2] == 0));
    assert!(metadata.flags.raw);
}

#[test]
fn test_rgb_image_takes_sraw_path() {
    let mut native = native_u16(2, 2);
    native.cfa = None;
    native.samples_per_pixel = 3;
    native.bytes_per_pixel = 6;
    native.pitch = 12;
    native.pixels = bytemuck::cast_slice::<u16, u8>(&[65535u16; 12]).to_vec();
    let decoder = decoder_for(MockStrategy::returning(native));
    let mut allocator = RecordingAllocator::new(HeapPlaneAllocator::new());

    let mode = DecodeMode::WithPixels { image_id: ImageId(9), allocator: &mut allocator };
    let metadata = decoder.decode(&mock_file(), mode).unwrap();

    assert_eq!(metadata.channels, 4);
    assert_eq!(metadata.sample_type, SampleType::F32);
    assert_eq!(metadata.pattern, MosaicPattern::None);
    assert!(metadata.flags.s_raw);
    assert!(!metadata.flags.raw);
    assert_eq!(allocator.inner.plane(ImageId(9)).unwrap().len(), 2 * 2 * 16);
}

#[test]
fn test_decoding_is_repeatable() {
    let decoder = decoder_for(MockStrategy::returning(native_u16(10, 6)));
    let mut first = HeapPlaneAllocator::new().with_row_alignment(64);
    let mut second = HeapPlaneAllocator::new().with_row_alignment(64);

    let mode = DecodeMode::WithPixels { image_id: ImageId(1), allocator: &mut first };
    let a = decoder.decode(&mock_file(), mode).unwrap();
    let mode = DecodeMode::WithPixels { image_id: ImageId(1), allocator: &mut second };
    let b = decoder.decode(&mock_file(), mode).unwrap();

    assert_eq!(a, b);
    assert_eq!(first.plane(ImageId(1)), second.plane(ImageId(1)));
}

#[test]
fn test_concurrent_decodes() {
    let decoder = decoder_for(MockStrategy::returning(native_u16(8, 8)));
    let file = mock_file();

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let decoder = &decoder;
                let file = &file;
                scope.spawn(move || {
                    let mut allocator = HeapPlaneAllocator::new();
                    let mode =
                        DecodeMode::WithPixels { image_id: ImageId(i), allocator: &mut allocator };
                    let metadata = decoder.decode(file, mode).unwrap();
                    (metadata, allocator.release(ImageId(i)).unwrap())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.windows(2).all(|w| w[0] == w[1]));
}
