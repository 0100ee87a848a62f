pub mod decoder;
pub mod logger;
