pub mod dictionary;
pub mod distance;
pub mod error;
pub mod index;
pub mod preprocess;
