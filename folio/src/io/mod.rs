//! I/O helpers for folio commands.

pub mod config;
pub mod init;
pub mod newsletter;
pub mod store;
pub mod subjects;
