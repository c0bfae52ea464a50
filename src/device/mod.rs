pub mod handle;

pub use handle::{Device, ForwardOptions};
