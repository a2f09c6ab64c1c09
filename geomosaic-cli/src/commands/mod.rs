//! CLI subcommands.

pub mod boundary;
pub mod common;
pub mod config;
pub mod export;
pub mod init;
pub mod layer;
pub mod roads;
pub mod search;
pub mod settlements;
