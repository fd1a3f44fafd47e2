//! Domain enums shared by every layer, free of database dependencies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Staff role, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Volunteer,
    Leader,
    Manager,
    Admin,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Self; 5] = [
        Self::Volunteer,
        Self::Leader,
        Self::Manager,
        Self::Admin,
        Self::SuperAdmin,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Volunteer => "volunteer",
            Self::Leader => "leader",
            Self::Manager => "manager",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// The role directly below this one in the hierarchy.
    #[must_use]
    pub const fn inherits(self) -> Option<Self> {
        match self {
            Self::Volunteer => None,
            Self::Leader => Some(Self::Volunteer),
            Self::Manager => Some(Self::Leader),
            Self::Admin => Some(Self::Manager),
            Self::SuperAdmin => Some(Self::Admin),
        }
    }

    /// Whether this role is at least as privileged as `required`.
    #[must_use]
    pub fn at_least(self, required: Self) -> bool {
        self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| CoreError::InvalidInput(format!("unknown role '{s}'")))
    }
}

/// Kind of service relationship a user holds with a department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementType {
    VolunteerShortterm,
    TempleWorker,
}

impl EngagementType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VolunteerShortterm => "volunteer_shortterm",
            Self::TempleWorker => "temple_worker",
        }
    }
}

impl fmt::Display for EngagementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bonus request workflow state.
///
/// `ManagerApproved` is reserved: no transition reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusStatus {
    Pending,
    ManagerApproved,
    AdminApproved,
    Rejected,
}

/// Administrative decision on a pending bonus request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusDecision {
    Approve,
    Reject,
}

impl BonusStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ManagerApproved => "manager_approved",
            Self::AdminApproved => "admin_approved",
            Self::Rejected => "rejected",
        }
    }

    /// ## Summary
    /// Applies an administrative decision.
    ///
    /// Returns `None` when the request is not `Pending`; only
    /// `pending -> admin_approved` and `pending -> rejected` exist.
    #[must_use]
    pub const fn decide(self, decision: BonusDecision) -> Option<Self> {
        match (self, decision) {
            (Self::Pending, BonusDecision::Approve) => Some(Self::AdminApproved),
            (Self::Pending, BonusDecision::Reject) => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for BonusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Redemption order state.
///
/// `Canceled` and `Expired` are reserved: no transition reaches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedeemStatus {
    Pending,
    Used,
    Canceled,
    Expired,
}

impl RedeemStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Used => "used",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
        }
    }

    /// Verification moves a pending order to `Used`; every other state is final.
    #[must_use]
    pub const fn verify(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Used),
            Self::Used | Self::Canceled | Self::Expired => None,
        }
    }
}

impl fmt::Display for RedeemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_hierarchy_is_ordered() {
        assert!(Role::SuperAdmin.at_least(Role::Admin));
        assert!(Role::Admin.at_least(Role::Admin));
        assert!(Role::Leader.at_least(Role::Volunteer));
        assert!(!Role::Leader.at_least(Role::Manager));
        assert!(!Role::Volunteer.at_least(Role::Leader));
    }

    #[test]
    fn role_inheritance_chain_reaches_volunteer() {
        let mut role = Role::SuperAdmin;
        let mut steps = 0;
        while let Some(lower) = role.inherits() {
            assert!(role > lower);
            role = lower;
            steps += 1;
        }
        assert_eq!(role, Role::Volunteer);
        assert_eq!(steps, 4);
    }

    #[test]
    fn role_parses_from_storage_string() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().ok(), Some(role));
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn bonus_only_pending_requests_can_be_decided() {
        assert_eq!(
            BonusStatus::Pending.decide(BonusDecision::Approve),
            Some(BonusStatus::AdminApproved)
        );
        assert_eq!(
            BonusStatus::Pending.decide(BonusDecision::Reject),
            Some(BonusStatus::Rejected)
        );
        for status in [
            BonusStatus::ManagerApproved,
            BonusStatus::AdminApproved,
            BonusStatus::Rejected,
        ] {
            assert_eq!(status.decide(BonusDecision::Approve), None);
            assert_eq!(status.decide(BonusDecision::Reject), None);
        }
    }

    #[test]
    fn redeem_verification_is_single_use() {
        assert_eq!(RedeemStatus::Pending.verify(), Some(RedeemStatus::Used));
        assert_eq!(RedeemStatus::Used.verify(), None);
        assert_eq!(RedeemStatus::Canceled.verify(), None);
        assert_eq!(RedeemStatus::Expired.verify(), None);
    }

    #[test]
    fn serde_uses_storage_strings() {
        let json = serde_json::to_string(&EngagementType::TempleWorker).unwrap_or_default();
        assert_eq!(json, "\"temple_worker\"");
        let role: Role = serde_json::from_str("\"super_admin\"").unwrap_or(Role::Volunteer);
        assert_eq!(role, Role::SuperAdmin);
    }
}
