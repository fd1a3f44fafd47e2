// Mirrors migrations/2026-01-05-000000_create_settlement_tables.

diesel::table! {
    app_user (id) {
        id -> Int8,
        name -> Text,
        email -> Text,
        phone -> Nullable<Text>,
        password_hash -> Nullable<Text>,
        volunteer_code -> Nullable<Text>,
        role -> Text,
        status -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    department (id) {
        id -> Int8,
        name -> Text,
        parent_id -> Nullable<Int8>,
        display_order -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    engagement (id) {
        id -> Int8,
        user_id -> Int8,
        engagement_type -> Text,
        department_id -> Int8,
        title -> Nullable<Text>,
        effective_from -> Timestamptz,
        effective_until -> Nullable<Timestamptz>,
        replaced_by -> Nullable<Int8>,
        change_reason -> Nullable<Text>,
        created_by -> Nullable<Int8>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    schedule_day (id) {
        id -> Int8,
        department_id -> Int8,
        service_date -> Date,
        shift_start -> Nullable<Text>,
        shift_end -> Nullable<Text>,
        required_count -> Int4,
        note -> Nullable<Text>,
        created_by -> Nullable<Int8>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    schedule_assignment (id) {
        id -> Int8,
        schedule_day_id -> Int8,
        user_id -> Int8,
        created_by -> Nullable<Int8>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    attendance_daily (id) {
        id -> Int8,
        schedule_day_id -> Int8,
        user_id -> Int8,
        status -> Text,
        minutes_worked -> Int8,
        points_awarded -> Int8,
        comment -> Nullable<Text>,
        confirmed_by -> Int8,
        confirmed_at -> Timestamptz,
    }
}

diesel::table! {
    hours_ledger (id) {
        id -> Int8,
        user_id -> Int8,
        service_date -> Date,
        minutes_delta -> Int8,
        reason -> Text,
        ref_id -> Nullable<Int8>,
        note -> Nullable<Text>,
        created_by -> Nullable<Int8>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    point_ledger (id) {
        id -> Int8,
        user_id -> Int8,
        points_delta -> Int8,
        reason -> Text,
        ref_id -> Nullable<Int8>,
        department_id -> Nullable<Int8>,
        note -> Nullable<Text>,
        created_by -> Nullable<Int8>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    user_rank_snapshot (user_id) {
        user_id -> Int8,
        total_minutes -> Int8,
        total_points -> Int8,
        rank_level -> Int4,
        join_badge -> Bool,
        join_badge_granted_at -> Nullable<Timestamptz>,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    badge (id) {
        id -> Int8,
        code -> Text,
        name -> Text,
        description -> Nullable<Text>,
        category -> Text,
        auto_grant_rule -> Nullable<Jsonb>,
        display_order -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    user_badge (id) {
        id -> Int8,
        user_id -> Int8,
        badge_id -> Int8,
        granted_at -> Timestamptz,
        granted_by -> Nullable<Int8>,
        metadata -> Nullable<Jsonb>,
        revoked_at -> Nullable<Timestamptz>,
        revoked_by -> Nullable<Int8>,
        revoke_reason -> Nullable<Text>,
    }
}

diesel::table! {
    dept_month_quota (id) {
        id -> Int8,
        department_id -> Int8,
        year_month -> Text,
        quota_points -> Int8,
        updated_by -> Nullable<Int8>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    dept_bonus_request (id) {
        id -> Int8,
        department_id -> Int8,
        year_month -> Text,
        user_id -> Int8,
        points -> Int8,
        reason_text -> Nullable<Text>,
        status -> Text,
        created_by -> Int8,
        updated_by -> Nullable<Int8>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    reward (id) {
        id -> Int8,
        title -> Text,
        description -> Nullable<Text>,
        points_cost -> Int8,
        min_level -> Int4,
        require_join_badge -> Bool,
        required_badges -> Array<Text>,
        stock -> Nullable<Int4>,
        status -> Text,
        created_by -> Nullable<Int8>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    redeem_order (id) {
        id -> Int8,
        user_id -> Int8,
        reward_id -> Int8,
        points_cost -> Int8,
        code_payload -> Text,
        code_signature -> Text,
        expires_at -> Nullable<Timestamptz>,
        status -> Text,
        used_by -> Nullable<Int8>,
        used_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    audit_log (id) {
        id -> Int8,
        actor_user_id -> Nullable<Int8>,
        action -> Text,
        target_table -> Nullable<Text>,
        target_id -> Nullable<Int8>,
        detail -> Nullable<Jsonb>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(user_badge -> badge (badge_id));
diesel::joinable!(schedule_assignment -> schedule_day (schedule_day_id));
diesel::joinable!(attendance_daily -> schedule_day (schedule_day_id));
diesel::joinable!(redeem_order -> reward (reward_id));
diesel::joinable!(user_rank_snapshot -> app_user (user_id));
diesel::joinable!(schedule_day -> department (department_id));
diesel::joinable!(dept_month_quota -> department (department_id));

diesel::allow_tables_to_appear_in_same_query!(
    app_user,
    attendance_daily,
    audit_log,
    badge,
    department,
    dept_bonus_request,
    dept_month_quota,
    engagement,
    hours_ledger,
    point_ledger,
    redeem_order,
    reward,
    schedule_assignment,
    schedule_day,
    user_badge,
    user_rank_snapshot,
);
