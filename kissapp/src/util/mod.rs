pub mod hexdump;
pub mod payload;
