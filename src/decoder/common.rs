//! Common utilities module
//!
//! This module contains the error types shared by every decoder stage.

pub mod error;

pub use error::{BackendError, DecodeError, LoadStatus, Result};
