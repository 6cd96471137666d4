//! Zip extraction that never writes outside its staging directory.

pub mod error;
pub mod extract;
pub mod path;

pub use error::ExtractError;
pub use extract::{SafeExtractor, StagedExtraction};
