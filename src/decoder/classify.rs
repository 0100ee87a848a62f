//! Failure classification.
//!
//! Strategies report failures tagged with their origin ([`BackendError`]). This module
//! maps each origin onto the fixed outward taxonomy of [`DecodeError`].

use tracing::warn;

use crate::decoder::common::error::{BackendError, DecodeError};

/// Decoder messages meaning the camera itself is not known to the calibration data.
const UNSUPPORTED_CAMERA_PHRASES: &[&str] = &[
    "camera not supported",
    "not supported, and not allowed to guess",
    "couldn't find camera",
];

/// Decoder messages meaning a known camera uses a feature the backend cannot handle.
const UNSUPPORTED_FEATURE_PHRASES: &[&str] = &["supported", "don't know how to"];

/// Maps a backend failure onto the outward error taxonomy.
///
/// `make` and `model` name the camera when the failure happened after identification;
/// they are empty otherwise.
pub fn classify(error: BackendError, make: &str, model: &str) -> DecodeError {
    let classified = match error {
        BackendError::Io(msg) => DecodeError::IoError(msg),
        BackendError::Parser(msg) => DecodeError::UnsupportedFormat(msg),
        BackendError::Decoder(msg) => classify_decoder_message(msg, make, model),
        BackendError::Metadata(msg) => DecodeError::UnsupportedFeature(msg),
        BackendError::Other(msg) => DecodeError::FileCorrupted(msg),
        BackendError::Unknown => DecodeError::LoadFailed("unhandled decoder failure".to_string()),
    };
    warn!(status = ?classified.status(), "Decode failed: {}", classified);
    classified
}

fn classify_decoder_message(msg: String, make: &str, model: &str) -> DecodeError {
    let lowered = msg.to_lowercase();

    if UNSUPPORTED_CAMERA_PHRASES.iter().any(|p| lowered.contains(p)) {
        let (make, model) = if make.is_empty() && model.is_empty() {
            (String::new(), msg)
        } else {
            (make.to_string(), model.to_string())
        };
        return DecodeError::UnsupportedCamera { make, model };
    }

    if UNSUPPORTED_FEATURE_PHRASES.iter().any(|p| lowered.contains(p)) {
        return DecodeError::UnsupportedFeature(msg);
    }

    DecodeError::FileCorrupted(msg)
}
