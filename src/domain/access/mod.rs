//! Role-based access policy for stored conversations.

mod policy;

pub use policy::{AccessPolicy, Decision, Operation, Role};
