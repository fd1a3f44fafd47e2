use chrono::{DateTime, Utc};
use diesel::{pg::Pg, prelude::*};
use serde::Serialize;

use crate::db::enums::EngagementType;
use crate::db::schema;

/// One period of a user's engagement history.
///
/// Rows are closed by setting `effective_until`, never edited otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::engagement)]
#[diesel(check_for_backend(Pg))]
pub struct Engagement {
    pub id: i64,
    pub user_id: i64,
    pub engagement_type: EngagementType,
    pub department_id: i64,
    pub title: Option<String>,
    pub effective_from: DateTime<Utc>,
    pub effective_until: Option<DateTime<Utc>>,
    pub replaced_by: Option<i64>,
    pub change_reason: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Engagement {
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.effective_until.is_none()
    }

    #[must_use]
    pub fn span(&self) -> seva_core::badge_rule::EngagementSpan {
        seva_core::badge_rule::EngagementSpan {
            engagement_type: self.engagement_type.into(),
            effective_from: self.effective_from,
            effective_until: self.effective_until,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::engagement)]
pub struct NewEngagement<'a> {
    pub user_id: i64,
    pub engagement_type: EngagementType,
    pub department_id: i64,
    pub title: Option<&'a str>,
    pub effective_from: DateTime<Utc>,
    pub change_reason: Option<&'a str>,
    pub created_by: Option<i64>,
}
