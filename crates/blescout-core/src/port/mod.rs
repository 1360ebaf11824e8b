//! Ports: traits implemented by the capture side.

pub mod fix_source;

pub use fix_source::{FixSource, NoFixSource, StaticFixSource};
