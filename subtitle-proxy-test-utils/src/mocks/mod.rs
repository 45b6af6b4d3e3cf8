//! Mock implementations for testing

mod fetcher;
mod transport;

pub use fetcher::MockFetcher;
pub use transport::{LoginBehavior, MockTransport, RecordedCall};
