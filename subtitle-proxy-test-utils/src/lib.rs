//! Test utilities for the subtitle proxy
//!
//! This crate provides a scripted XML-RPC transport, a mock content fetcher
//! and builders for OpenSubtitles-shaped records and subtitle payloads.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::{SearchRecordBuilder, fixtures};
pub use mocks::{LoginBehavior, MockFetcher, MockTransport, RecordedCall};
