use thiserror::Error;

/// Outward-facing decode failure. Every stage re-expresses its failures as one of these
/// variants; no backend-specific error type crosses the decoder boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Invalid input buffer: {0}")]
    InvalidBuffer(&'static str),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported camera: {make} {model}")]
    UnsupportedCamera { make: String, model: String },

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("File corrupted: {0}")]
    FileCorrupted(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Destination unavailable: {0}")]
    DestinationUnavailable(String),

    #[error("Load failed: {0}")]
    LoadFailed(String),
}

/// Flat result code reported to callers that cannot consume a rich error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadStatus {
    Ok,
    /// Null or empty input; checked before any format work happens.
    InvalidInput,
    UnsupportedFormat,
    UnsupportedCamera,
    UnsupportedFeature,
    IoError,
    FileCorrupted,
    CacheFull,
    LoadFailed,
}

impl DecodeError {
    pub fn status(&self) -> LoadStatus {
        match self {
            DecodeError::InvalidBuffer(_) => LoadStatus::InvalidInput,
            DecodeError::UnsupportedFormat(_) => LoadStatus::UnsupportedFormat,
            DecodeError::UnsupportedCamera { .. } => LoadStatus::UnsupportedCamera,
            DecodeError::UnsupportedFeature(_) => LoadStatus::UnsupportedFeature,
            DecodeError::IoError(_) => LoadStatus::IoError,
            DecodeError::FileCorrupted(_) | DecodeError::InvalidDimensions(..) => {
                LoadStatus::FileCorrupted
            }
            DecodeError::DestinationUnavailable(_) => LoadStatus::CacheFull,
            DecodeError::LoadFailed(_) => LoadStatus::LoadFailed,
        }
    }
}

impl LoadStatus {
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => LoadStatus::Ok,
            Err(e) => e.status(),
        }
    }

    pub fn is_ok(self) -> bool {
        self == LoadStatus::Ok
    }
}

/// Failure raised inside a decode strategy, tagged with the origin it came from.
///
/// The classifier turns these into a [`DecodeError`]; they never leave the decoder.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Transport or read failure while the backend consults auxiliary resources.
    #[error("I/O failure: {0}")]
    Io(String),

    /// The outermost container could not be parsed.
    #[error("parser failure: {0}")]
    Parser(String),

    /// The decoder proper rejected the data; the message decides the category.
    #[error("decoder failure: {0}")]
    Decoder(String),

    /// The camera metadata database could not describe the image.
    #[error("camera metadata failure: {0}")]
    Metadata(String),

    #[error("{0}")]
    Other(String),

    #[error("unknown failure")]
    Unknown,
}

pub type Result<T> = std::result::Result<T, DecodeError>;
