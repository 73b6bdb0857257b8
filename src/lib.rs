pub mod config;
pub mod z16;
