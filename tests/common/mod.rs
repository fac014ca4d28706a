//! Common test utilities for url-fetcher integration tests

#[allow(dead_code)]
pub mod fixtures;
#[allow(dead_code)]
pub mod transport;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use transport::*;
