//! Builders for remote records and subtitle payloads

pub mod fixtures;
mod search_record;

pub use search_record::SearchRecordBuilder;
