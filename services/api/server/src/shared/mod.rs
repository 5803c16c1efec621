pub mod cache;
pub mod extractors;
