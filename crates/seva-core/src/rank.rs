//! Seven-tier rank table and snapshot recomputation.
//!
//! The snapshot is a cache over the ledgers: every field is rebuilt from the
//! ledger totals except the join badge, which only ever moves from `false` to
//! `true`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::JOIN_BADGE_THRESHOLD_MINUTES;

/// One row of the rank table. `max` of `None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelRule {
    pub level: i32,
    pub name: &'static str,
    pub name_en: &'static str,
    pub min: i64,
    pub max: Option<i64>,
}

impl LevelRule {
    /// Half-open `[min, max)` membership.
    #[must_use]
    pub fn contains(&self, points: i64) -> bool {
        points >= self.min && self.max.is_none_or(|max| points < max)
    }
}

pub const LEVEL_RULES: [LevelRule; 7] = [
    LevelRule { level: 1, name: "欢喜地", name_en: "Joyful Ground", min: 0, max: Some(100) },
    LevelRule { level: 2, name: "离垢地", name_en: "Stainless Ground", min: 100, max: Some(200) },
    LevelRule { level: 3, name: "发光地", name_en: "Luminous Ground", min: 200, max: Some(1000) },
    LevelRule { level: 4, name: "焰慧地", name_en: "Radiant Ground", min: 1000, max: Some(2000) },
    LevelRule { level: 5, name: "难胜地", name_en: "Invincible Ground", min: 2000, max: Some(6000) },
    LevelRule { level: 6, name: "现前地", name_en: "Manifest Ground", min: 6000, max: Some(10000) },
    LevelRule { level: 7, name: "远行地", name_en: "Far-Reaching Ground", min: 10000, max: None },
];

pub const MIN_LEVEL: i32 = 1;
pub const MAX_LEVEL: i32 = 7;

/// ## Summary
/// Maps cumulative points to a rank level. Negative totals fall back to level 1.
#[must_use]
pub fn rank_level(total_points: i64) -> i32 {
    LEVEL_RULES
        .iter()
        .find(|rule| rule.contains(total_points))
        .map_or(MIN_LEVEL, |rule| rule.level)
}

/// Table row for `level`, or the first row when out of range.
#[must_use]
pub fn level_info(level: i32) -> &'static LevelRule {
    LEVEL_RULES
        .iter()
        .find(|rule| rule.level == level)
        .unwrap_or(&LEVEL_RULES[0])
}

/// Ledger aggregates for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    pub total_minutes: i64,
    pub total_points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankSnapshot {
    pub total_minutes: i64,
    pub total_points: i64,
    pub rank_level: i32,
    pub join_badge: bool,
    pub join_badge_granted_at: Option<DateTime<Utc>>,
}

impl Default for RankSnapshot {
    fn default() -> Self {
        Self {
            total_minutes: 0,
            total_points: 0,
            rank_level: MIN_LEVEL,
            join_badge: false,
            join_badge_granted_at: None,
        }
    }
}

/// Result of a recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recomputed {
    pub snapshot: RankSnapshot,
    pub join_badge_newly_granted: bool,
}

impl RankSnapshot {
    /// ## Summary
    /// Rebuilds a snapshot from ledger totals.
    ///
    /// The join badge is carried over from `previous` when already held.
    /// Otherwise it is granted, stamped with `now`, when the minute total
    /// reaches the threshold. Repeated calls with unchanged totals are stable.
    #[must_use]
    pub fn recompute(
        previous: Option<&RankSnapshot>,
        totals: LedgerTotals,
        now: DateTime<Utc>,
    ) -> Recomputed {
        let held = previous.filter(|p| p.join_badge);
        let newly_granted =
            held.is_none() && totals.total_minutes >= JOIN_BADGE_THRESHOLD_MINUTES;

        let (join_badge, join_badge_granted_at) = match held {
            Some(p) => (true, p.join_badge_granted_at),
            None if newly_granted => (true, Some(now)),
            None => (false, None),
        };

        Recomputed {
            snapshot: RankSnapshot {
                total_minutes: totals.total_minutes,
                total_points: totals.total_points,
                rank_level: rank_level(totals.total_points),
                join_badge,
                join_badge_granted_at,
            },
            join_badge_newly_granted: newly_granted,
        }
    }

    #[must_use]
    pub fn level_info(&self) -> &'static LevelRule {
        level_info(self.rank_level)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    fn totals(total_minutes: i64, total_points: i64) -> LedgerTotals {
        LedgerTotals {
            total_minutes,
            total_points,
        }
    }

    #[test_log::test]
    fn level_boundaries_are_half_open() {
        let cases = [
            (-50, 1),
            (0, 1),
            (99, 1),
            (100, 2),
            (199, 2),
            (200, 3),
            (999, 3),
            (1000, 4),
            (1999, 4),
            (2000, 5),
            (5999, 5),
            (6000, 6),
            (9999, 6),
            (10000, 7),
            (i64::MAX, 7),
        ];
        for (points, level) in cases {
            assert_eq!(rank_level(points), level, "points = {points}");
        }
    }

    #[test_log::test]
    fn level_table_is_contiguous() {
        for pair in LEVEL_RULES.windows(2) {
            assert_eq!(pair[0].max, Some(pair[1].min));
            assert_eq!(pair[0].level + 1, pair[1].level);
        }
        assert_eq!(LEVEL_RULES[0].min, 0);
        assert_eq!(LEVEL_RULES[6].level, MAX_LEVEL);
    }

    #[test_log::test]
    fn level_info_falls_back_to_first_row() {
        assert_eq!(level_info(5).name_en, "Invincible Ground");
        assert_eq!(level_info(0).level, 1);
        assert_eq!(level_info(42).level, 1);
    }

    #[test_log::test]
    fn recompute_from_nothing_matches_totals() {
        let out = RankSnapshot::recompute(None, totals(360, 60), at(9));
        assert_eq!(out.snapshot.total_minutes, 360);
        assert_eq!(out.snapshot.total_points, 60);
        assert_eq!(out.snapshot.rank_level, 1);
        assert!(!out.snapshot.join_badge);
        assert!(!out.join_badge_newly_granted);
    }

    #[test_log::test]
    fn join_badge_granted_once_at_threshold() {
        let before = RankSnapshot::recompute(None, totals(4199, 0), at(9));
        assert!(!before.snapshot.join_badge);

        let crossed = RankSnapshot::recompute(Some(&before.snapshot), totals(4200, 0), at(10));
        assert!(crossed.join_badge_newly_granted);
        assert_eq!(crossed.snapshot.join_badge_granted_at, Some(at(10)));

        let again = RankSnapshot::recompute(Some(&crossed.snapshot), totals(4200, 0), at(11));
        assert!(!again.join_badge_newly_granted);
        assert_eq!(again.snapshot, crossed.snapshot);
    }

    #[test_log::test]
    fn join_badge_survives_negative_adjustment() {
        let granted = RankSnapshot::recompute(None, totals(4320, 720), at(9));
        assert!(granted.snapshot.join_badge);

        let adjusted = RankSnapshot::recompute(Some(&granted.snapshot), totals(4120, 720), at(12));
        assert!(adjusted.snapshot.join_badge);
        assert!(!adjusted.join_badge_newly_granted);
        assert_eq!(adjusted.snapshot.join_badge_granted_at, Some(at(9)));
        assert_eq!(adjusted.snapshot.total_minutes, 4120);
    }

    #[test_log::test]
    fn twelve_six_hour_shifts_earn_join_badge() {
        let mut snapshot: Option<RankSnapshot> = None;
        let mut now = at(8);
        let mut grants = 0;
        for shift in 1..=12_i64 {
            let out = RankSnapshot::recompute(snapshot.as_ref(), totals(360 * shift, 60 * shift), now);
            if out.join_badge_newly_granted {
                grants += 1;
                assert_eq!(shift, 12);
            }
            snapshot = Some(out.snapshot);
            now += Duration::days(1);
        }
        let snapshot = snapshot.unwrap();
        assert_eq!(grants, 1);
        assert_eq!(snapshot.total_minutes, 4320);
        assert_eq!(snapshot.total_points, 720);
        assert_eq!(snapshot.rank_level, 3);
        assert!(snapshot.join_badge);

        let later = RankSnapshot::recompute(Some(&snapshot), totals(4320 - 100, 720), now);
        assert!(later.snapshot.join_badge);
    }

    #[test_log::test]
    fn rank_level_drops_with_points() {
        let high = RankSnapshot::recompute(None, totals(0, 1500), at(9));
        assert_eq!(high.snapshot.rank_level, 4);
        let low = RankSnapshot::recompute(Some(&high.snapshot), totals(0, 150), at(10));
        assert_eq!(low.snapshot.rank_level, 2);
        assert_eq!(low.snapshot.level_info().name_en, "Stainless Ground");
    }
}
