//! Database enum types with Diesel serialization.
//!
//! Each enum maps to a `TEXT` column guarded by a CHECK constraint and
//! implements `ToSql`/`FromSql` so rows round-trip without stringly-typed
//! fields. Enums that also exist in `seva_core::types` convert both ways.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use seva_core::error::CoreError;

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            AsExpression,
            FromSqlRow,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Returns the database string representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = bytes.as_bytes();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().as_bytes() == raw)
                    .ok_or_else(|| "Unrecognized enum variant".into())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| {
                        CoreError::InvalidInput(format!(
                            concat!("unknown ", stringify!($name), " '{}'"),
                            s
                        ))
                    })
            }
        }
    };
}

macro_rules! mirror_core_enum {
    ($db:ident <=> $($core:ident)::+ { $($variant:ident => $core_variant:ident),+ $(,)? }) => {
        impl From<$db> for $($core)::+ {
            fn from(value: $db) -> Self {
                match value {
                    $($db::$variant => Self::$core_variant,)+
                }
            }
        }

        impl From<$($core)::+> for $db {
            fn from(value: $($core)::+) -> Self {
                type Core = $($core)::+;
                match value {
                    $(Core::$core_variant => Self::$variant,)+
                }
            }
        }
    };
}

text_enum! {
    /// Maps to `app_user.role`.
    UserRole {
        Volunteer => "volunteer",
        Leader => "leader",
        Manager => "manager",
        Admin => "admin",
        SuperAdmin => "super_admin",
    }
}

text_enum! {
    /// Maps to `app_user.status`. Only `Active` users may sign in.
    UserStatus {
        Active => "active",
        Inactive => "inactive",
        Banned => "banned",
    }
}

text_enum! {
    /// Maps to `engagement.engagement_type`.
    EngagementType {
        VolunteerShortterm => "volunteer_shortterm",
        TempleWorker => "temple_worker",
    }
}

text_enum! {
    /// Maps to `attendance_daily.status`.
    AttendanceStatus {
        Present => "present",
        Late => "late",
        Absent => "absent",
        Leave => "leave",
        Exception => "exception",
    }
}

impl AttendanceStatus {
    /// Whether this status settles worked time into the ledgers.
    #[must_use]
    pub const fn earns_credit(self) -> bool {
        matches!(self, Self::Present | Self::Late)
    }
}

text_enum! {
    /// Maps to `hours_ledger.reason`.
    HoursReason {
        Attendance => "attendance",
        ManualAdjust => "manual_adjust",
        AppealResolve => "appeal_resolve",
    }
}

text_enum! {
    /// Maps to `point_ledger.reason`. `Redeem` rows are always negative.
    PointReason {
        AttendanceEval => "attendance_eval",
        Redeem => "redeem",
        DeptBonus => "dept_bonus",
        ManualAdjust => "manual_adjust",
        AppealResolve => "appeal_resolve",
    }
}

text_enum! {
    /// Maps to `badge.category`.
    BadgeCategory {
        ServiceHours => "service_hours",
        EngagementDuration => "engagement_duration",
        Special => "special",
    }
}

text_enum! {
    /// Maps to `dept_bonus_request.status`.
    BonusStatus {
        Pending => "pending",
        ManagerApproved => "manager_approved",
        AdminApproved => "admin_approved",
        Rejected => "rejected",
    }
}

text_enum! {
    /// Maps to `reward.status`.
    RewardStatus {
        Active => "active",
        Inactive => "inactive",
    }
}

text_enum! {
    /// Maps to `redeem_order.status`.
    RedeemStatus {
        Pending => "pending",
        Used => "used",
        Canceled => "canceled",
        Expired => "expired",
    }
}

mirror_core_enum!(UserRole <=> seva_core::types::Role {
    Volunteer => Volunteer,
    Leader => Leader,
    Manager => Manager,
    Admin => Admin,
    SuperAdmin => SuperAdmin,
});

mirror_core_enum!(EngagementType <=> seva_core::types::EngagementType {
    VolunteerShortterm => VolunteerShortterm,
    TempleWorker => TempleWorker,
});

mirror_core_enum!(BadgeCategory <=> seva_core::badge_rule::BadgeCategory {
    ServiceHours => ServiceHours,
    EngagementDuration => EngagementDuration,
    Special => Special,
});

mirror_core_enum!(BonusStatus <=> seva_core::types::BonusStatus {
    Pending => Pending,
    ManagerApproved => ManagerApproved,
    AdminApproved => AdminApproved,
    Rejected => Rejected,
});

mirror_core_enum!(RedeemStatus <=> seva_core::types::RedeemStatus {
    Pending => Pending,
    Used => Used,
    Canceled => Canceled,
    Expired => Expired,
});
