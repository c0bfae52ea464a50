//! Client for the Android Debug Bridge server: host commands, shell v2
//! sessions and the sync file-transfer protocol.

pub mod adb;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod device;
pub mod error;
pub mod output;
pub mod types;

pub use client::Client;
pub use config::ClientConfig;
pub use device::{Device, ForwardOptions};
pub use error::{AdbError, ExitStatus, Result};

#[cfg(test)]
pub mod testing;

#[cfg(test)]
mod client_test;


#[cfg(test)]
mod error_test;
