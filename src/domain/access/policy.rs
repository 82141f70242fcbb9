//! Access policy evaluator.
//!
//! A pure function over an immutable allow-list of roles, loaded once at
//! process start. Fail-secure: an empty allow-list, or a caller with no
//! allow-listed role, denies everything.
//!
//! Denied results must not leak whether a conversation exists, so callers
//! map both `Denied` and not-found to the same externally observable
//! `Forbidden` error.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::ConversationId;

/// A caller role name checked against the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// Creates a role, trimming surrounding whitespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operation being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Read,
    Write,
}

/// Result of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
}

impl Decision {
    /// Returns true if access is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Immutable allow-list of roles permitted to read and write conversations.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    allowed_roles: Vec<Role>,
}

impl AccessPolicy {
    /// Creates a policy from an ordered allow-list of roles.
    pub fn new(allowed_roles: Vec<Role>) -> Self {
        Self { allowed_roles }
    }

    /// Creates a policy from plain role names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(Role::new).collect())
    }

    /// The configured allow-list, in configuration order.
    pub fn allowed_roles(&self) -> &[Role] {
        &self.allowed_roles
    }

    /// Decides whether a caller with `roles` may perform `operation`.
    ///
    /// Pure and side-effect free. The conversation id participates only in
    /// callers' audit records; the rule set itself is not per-conversation.
    pub fn authorize(
        &self,
        roles: &[Role],
        _operation: Operation,
        _conversation_id: Option<&ConversationId>,
    ) -> Decision {
        if self.allowed_roles.is_empty() {
            return Decision::Denied;
        }
        if roles.iter().any(|r| self.allowed_roles.contains(r)) {
            Decision::Allowed
        } else {
            Decision::Denied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AccessPolicy {
        AccessPolicy::from_names(["superuser", "globaldesigner"])
    }

    #[test]
    fn allow_listed_role_is_allowed_for_read_and_write() {
        let roles = vec![Role::new("superuser")];
        assert!(policy().authorize(&roles, Operation::Read, None).is_allowed());
        assert!(policy()
            .authorize(&roles, Operation::Write, None)
            .is_allowed());
    }

    #[test]
    fn unlisted_role_is_denied() {
        let roles = vec![Role::new("observer")];
        assert_eq!(
            policy().authorize(&roles, Operation::Read, None),
            Decision::Denied
        );
    }

    #[test]
    fn caller_with_no_roles_is_denied() {
        assert_eq!(
            policy().authorize(&[], Operation::Write, None),
            Decision::Denied
        );
    }

    #[test]
    fn empty_allow_list_denies_everything() {
        let empty = AccessPolicy::new(vec![]);
        let roles = vec![Role::new("superuser")];
        assert_eq!(
            empty.authorize(&roles, Operation::Read, None),
            Decision::Denied
        );
    }

    #[test]
    fn any_single_matching_role_suffices() {
        let roles = vec![Role::new("observer"), Role::new("globaldesigner")];
        assert!(policy()
            .authorize(&roles, Operation::Write, None)
            .is_allowed());
    }

    #[test]
    fn role_names_are_trimmed() {
        let p = AccessPolicy::from_names(["  superuser  "]);
        let roles = vec![Role::new("superuser")];
        assert!(p.authorize(&roles, Operation::Read, None).is_allowed());
    }
}
