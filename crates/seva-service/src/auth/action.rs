//! Actions named in authorization policies.

use std::fmt;

/// An operation checked against a [`super::Resource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read the caller's own data, or shared catalogs.
    Read,
    /// Read any user's data.
    ReadAny,
    /// Create or modify.
    Write,
    /// Settle a workflow step (bonus decisions, redemption verification).
    Approve,
}

impl Action {
    /// Returns the Casbin action string for this action.
    #[must_use]
    pub const fn as_casbin_action(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::ReadAny => "read_any",
            Self::Write => "write",
            Self::Approve => "approve",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_casbin_action())
    }
}
