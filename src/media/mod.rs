//! Media pipeline: the bounded download pool and the image converter.

pub mod convert;
pub mod fetcher;

pub use convert::{convert, ConvertedImage};
pub use fetcher::{MediaFetcher, MediaRunReport, WorkerStats};
