//! CLI command implementations.

pub mod common;
pub mod floors;
pub mod init;
pub mod scrape;
