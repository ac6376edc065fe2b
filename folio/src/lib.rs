//! Guided portfolio chat and newsletter client.
//!
//! The chat walks an ordered list of projects, asking for a fixed set of fields
//! per project while accepting free-form interruptions. The architecture keeps
//! a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (commands, title matching, the
//!   walk engine). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config, snapshot storage, subject
//!   loading, the newsletter endpoint). Isolated behind traits where tests need
//!   fakes.
//!
//! Orchestration modules ([`session`], [`chat`]) coordinate core logic with I/O
//! to implement CLI commands.

pub mod chat;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
