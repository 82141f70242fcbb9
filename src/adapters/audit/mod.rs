//! Audit log adapters.

mod file;

pub use file::{FileAuditLog, NoopAuditLog};
