//! Scripted ADB peers and canned wire replies for unit tests.

pub mod fixtures;
pub mod mocks;

pub use mocks::{device_connection, pair, MockPeer, MockServer};
