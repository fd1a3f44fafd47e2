//! Declarative badge auto-grant rules.
//!
//! Rules are stored as JSON on the badge catalog and decoded once, when the
//! catalog is loaded, into [`AutoGrantRule`]. Evaluation is a pure function
//! of a user's minute total and engagement history.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DAYS_PER_MONTH;
use crate::error::{CoreError, CoreResult};
use crate::types::EngagementType;

const SECONDS_PER_MONTH: i64 = DAYS_PER_MONTH * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCategory {
    ServiceHours,
    EngagementDuration,
    Special,
}

impl BadgeCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ServiceHours => "service_hours",
            Self::EngagementDuration => "engagement_duration",
            Self::Special => "special",
        }
    }
}

impl fmt::Display for BadgeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of auto-grant rule kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AutoGrantRule {
    /// Cumulative service time of at least `threshold_hours`.
    #[serde(rename_all = "camelCase")]
    ServiceHours { threshold_hours: i64 },
    /// Summed engagement time of one type, in 30-day months.
    #[serde(rename_all = "camelCase")]
    EngagementDuration {
        engagement_type: EngagementType,
        duration_months: i64,
    },
}

/// One engagement row, reduced to what duration rules need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementSpan {
    pub engagement_type: EngagementType,
    pub effective_from: DateTime<Utc>,
    pub effective_until: Option<DateTime<Utc>>,
}

impl EngagementSpan {
    /// Seconds covered by this span; an open span runs until `now`.
    #[must_use]
    pub fn seconds(&self, now: DateTime<Utc>) -> i64 {
        let end = self.effective_until.unwrap_or(now);
        (end - self.effective_from).num_seconds().max(0)
    }
}

/// Inputs a rule is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub total_minutes: i64,
    pub engagements: &'a [EngagementSpan],
    pub now: DateTime<Utc>,
}

impl AutoGrantRule {
    /// ## Summary
    /// Decodes and validates a stored rule.
    ///
    /// ## Errors
    /// Returns `CoreError::ValidationError` when the JSON does not describe a
    /// known rule kind or carries a non-positive threshold.
    pub fn decode(raw: &serde_json::Value) -> CoreResult<Self> {
        let rule = Self::deserialize(raw)
            .map_err(|e| CoreError::ValidationError(format!("invalid auto-grant rule: {e}")))?;
        rule.validate()?;
        Ok(rule)
    }

    /// ## Errors
    /// Returns `CoreError::ValidationError` for non-positive thresholds.
    pub fn validate(&self) -> CoreResult<()> {
        match self {
            Self::ServiceHours { threshold_hours } if *threshold_hours <= 0 => Err(
                CoreError::ValidationError("thresholdHours must be positive".to_string()),
            ),
            Self::EngagementDuration {
                duration_months, ..
            } if *duration_months <= 0 => Err(CoreError::ValidationError(
                "durationMonths must be positive".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Category a badge carrying this rule belongs to.
    #[must_use]
    pub const fn category(&self) -> BadgeCategory {
        match self {
            Self::ServiceHours { .. } => BadgeCategory::ServiceHours,
            Self::EngagementDuration { .. } => BadgeCategory::EngagementDuration,
        }
    }

    #[must_use]
    pub fn is_satisfied(&self, ctx: &RuleContext<'_>) -> bool {
        match self {
            Self::ServiceHours { threshold_hours } => {
                ctx.total_minutes >= threshold_hours.saturating_mul(60)
            }
            Self::EngagementDuration {
                engagement_type,
                duration_months,
            } => {
                let served: i64 = ctx
                    .engagements
                    .iter()
                    .filter(|span| span.engagement_type == *engagement_type)
                    .map(|span| span.seconds(ctx.now))
                    .sum();
                served >= duration_months.saturating_mul(SECONDS_PER_MONTH)
            }
        }
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    fn ctx(total_minutes: i64, engagements: &[EngagementSpan]) -> RuleContext<'_> {
        RuleContext {
            total_minutes,
            engagements,
            now: now(),
        }
    }

    fn temple_worker_year() -> AutoGrantRule {
        AutoGrantRule::EngagementDuration {
            engagement_type: EngagementType::TempleWorker,
            duration_months: 12,
        }
    }

    #[test_log::test]
    fn decodes_stored_json() {
        let rule = AutoGrantRule::decode(&json!({"type": "service_hours", "thresholdHours": 70})).unwrap();
        assert_eq!(rule, AutoGrantRule::ServiceHours { threshold_hours: 70 });
        assert_eq!(rule.category(), BadgeCategory::ServiceHours);

        let rule = AutoGrantRule::decode(&json!({
            "type": "engagement_duration",
            "engagementType": "temple_worker",
            "durationMonths": 12
        }))
        .unwrap();
        assert_eq!(rule, temple_worker_year());
        assert_eq!(AutoGrantRule::decode(&rule.to_json()).unwrap(), rule);
    }

    #[test_log::test]
    fn rejects_unknown_or_invalid_rules() {
        for raw in [
            json!({"type": "lunar_phase"}),
            json!({"type": "service_hours"}),
            json!({"type": "service_hours", "thresholdHours": 0}),
            json!({"type": "engagement_duration", "engagementType": "pilgrim", "durationMonths": 3}),
            json!({"type": "engagement_duration", "engagementType": "temple_worker", "durationMonths": -1}),
            json!("service_hours"),
        ] {
            assert!(
                matches!(AutoGrantRule::decode(&raw), Err(CoreError::ValidationError(_))),
                "accepted {raw}"
            );
        }
    }

    #[test_log::test]
    fn service_hours_threshold_is_inclusive() {
        let rule = AutoGrantRule::ServiceHours { threshold_hours: 100 };
        assert!(!rule.is_satisfied(&ctx(5999, &[])));
        assert!(rule.is_satisfied(&ctx(6000, &[])));
    }

    #[test_log::test]
    fn engagement_duration_sums_closed_and_open_spans() {
        let spans = [
            EngagementSpan {
                engagement_type: EngagementType::TempleWorker,
                effective_from: now() - Duration::days(400),
                effective_until: Some(now() - Duration::days(250)),
            },
            EngagementSpan {
                engagement_type: EngagementType::VolunteerShortterm,
                effective_from: now() - Duration::days(250),
                effective_until: Some(now() - Duration::days(220)),
            },
            EngagementSpan {
                engagement_type: EngagementType::TempleWorker,
                effective_from: now() - Duration::days(220),
                effective_until: None,
            },
        ];
        // 150 + 220 = 370 days >= 360
        assert!(temple_worker_year().is_satisfied(&ctx(0, &spans)));
        // 150 + 200 = 350 days < 360
        let short = RuleContext {
            now: now() - Duration::days(20),
            ..ctx(0, &spans)
        };
        assert!(!temple_worker_year().is_satisfied(&short));
    }

    #[test_log::test]
    fn engagement_duration_ignores_other_types() {
        let spans = [EngagementSpan {
            engagement_type: EngagementType::VolunteerShortterm,
            effective_from: now() - Duration::days(1000),
            effective_until: None,
        }];
        assert!(!temple_worker_year().is_satisfied(&ctx(0, &spans)));
    }

    #[test_log::test]
    fn twelve_months_means_360_days() {
        let exactly = [EngagementSpan {
            engagement_type: EngagementType::TempleWorker,
            effective_from: now() - Duration::days(360),
            effective_until: None,
        }];
        assert!(temple_worker_year().is_satisfied(&ctx(0, &exactly)));
        let almost = [EngagementSpan {
            effective_from: now() - Duration::days(360) + Duration::seconds(1),
            ..exactly[0]
        }];
        assert!(!temple_worker_year().is_satisfied(&ctx(0, &almost)));
    }
}
