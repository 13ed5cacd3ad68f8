pub mod adventure;
pub mod config;
pub mod error;
pub mod time;
