//! Identity resolving keys and private address resolution.

pub mod irk;
pub mod rpa;

pub use irk::{parse_irk_lines, IdentityResolvingKey};
pub use rpa::{ah, RpaResolver};
