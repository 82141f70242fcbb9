//! Domain layer: pure types and logic with no IO.

pub mod access;
pub mod conversation;
pub mod foundation;
pub mod session;
