/// Route component constants shared across crates
pub const API_ROUTE_COMPONENT: &str = "api";
pub const API_ROUTE_PREFIX: &str = const_str::concat!("/", API_ROUTE_COMPONENT);

pub const APP_ROUTE_COMPONENT: &str = "app";
pub const APP_ROUTE_PREFIX: &str = const_str::concat!(API_ROUTE_PREFIX, "/", APP_ROUTE_COMPONENT);

/// Cumulative service time that earns the join badge (70 hours, in minutes).
pub const JOIN_BADGE_THRESHOLD_MINUTES: i64 = 70 * 60;

/// Points awarded per full hour of attended service.
pub const POINTS_PER_HOUR: i64 = 10;

/// Length of a "month" when engagement durations are converted from days.
pub const DAYS_PER_MONTH: i64 = 30;

/// Shift bounds used when a schedule day leaves its shift times blank.
pub const DEFAULT_SHIFT_START: &str = "09:00";
pub const DEFAULT_SHIFT_END: &str = "17:00";

/// Upper bound on ledger listings returned in one page.
pub const MAX_LEDGER_PAGE: i64 = 200;
