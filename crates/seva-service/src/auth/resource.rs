//! Resource kinds for authorization.
//!
//! Policies are coarse: a role is allowed an action on a whole resource kind.
//! Ownership checks ("own profile", "own orders") happen in handlers.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Profile,
    User,
    Department,
    Schedule,
    Attendance,
    Points,
    Badge,
    Reward,
    Redemption,
    Quota,
    Bonus,
    Engagement,
    Audit,
}

impl Resource {
    /// Returns the Casbin object string for this resource.
    #[must_use]
    pub const fn as_casbin_object(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::User => "user",
            Self::Department => "department",
            Self::Schedule => "schedule",
            Self::Attendance => "attendance",
            Self::Points => "points",
            Self::Badge => "badge",
            Self::Reward => "reward",
            Self::Redemption => "redemption",
            Self::Quota => "quota",
            Self::Bonus => "bonus",
            Self::Engagement => "engagement",
            Self::Audit => "audit",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_casbin_object())
    }
}
