#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod address;
pub mod ax25;
pub mod crc;
pub mod kiss;
