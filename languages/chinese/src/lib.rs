pub mod columns;
pub mod dictionary;
pub mod loader;
pub mod processor;
pub mod record;
pub mod sheet;

pub use dictionary::MoeDictionary;
pub use loader::XlsxLoader;
pub use processor::ChineseProcessor;
