#![doc = include_str!("../README.md")]

pub mod channel;
pub mod config;
pub mod error;
pub mod harness;
pub mod link;
pub mod monitor;
pub mod reply;
pub mod serial;
pub mod util;

#[cfg(test)]
mod test_util;

// Codec types that appear in this crate's public API
pub use kisscore::address::Address;
pub use kisscore::ax25::Ax25Header;
pub use kisscore::kiss::KissFrame;
