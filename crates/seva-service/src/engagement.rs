//! Engagement history. An update never rewrites a row: the current one is
//! closed and a successor is linked to it.

use chrono::{DateTime, Utc};
use diesel_async::AsyncConnection;
use diesel_async::scoped_futures::ScopedFutureExt;
use serde::Serialize;
use seva_db::db::connection::DbConnection;
use seva_db::db::enums::EngagementType;
use seva_db::db::query;
use seva_db::model::engagement::{Engagement, NewEngagement};

use crate::audit::{self, AuditAction, AuditEvent};
use crate::badge;
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone)]
pub struct EngagementChange {
    pub engagement_type: EngagementType,
    pub department_id: i64,
    pub title: Option<String>,
    pub change_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngagementUpdate {
    pub previous: Option<Engagement>,
    pub current: Engagement,
    pub badges_granted: Vec<String>,
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn current(conn: &mut DbConnection<'_>, user_id: i64) -> ServiceResult<Option<Engagement>> {
    Ok(query::engagement::current(conn, user_id).await?)
}

/// Newest first.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn history(conn: &mut DbConnection<'_>, user_id: i64) -> ServiceResult<Vec<Engagement>> {
    Ok(query::engagement::history(conn, user_id).await?)
}

/// ## Summary
/// Starts a new engagement period for a user at `now`.
///
/// The current row, if any, is locked and closed at `now`, the successor is
/// inserted carrying `change_reason`, and the closed row's `replaced_by`
/// points at it. A duration badge check runs after commit.
///
/// ## Errors
/// `NotFound` for an unknown user or department; `Conflict` if another
/// update opened a current row concurrently.
#[tracing::instrument(skip(conn, change))]
pub async fn update(
    conn: &mut DbConnection<'_>,
    actor_id: i64,
    user_id: i64,
    change: EngagementChange,
    now: DateTime<Utc>,
) -> ServiceResult<EngagementUpdate> {
    if query::user::find(conn, user_id).await?.is_none() {
        return Err(ServiceError::not_found(format!("user {user_id}")));
    }
    if query::department::find(conn, change.department_id).await?.is_none() {
        return Err(ServiceError::not_found(format!("department {}", change.department_id)));
    }

    let audit_change = change.clone();
    let (previous, current) = conn
        .transaction::<_, ServiceError, _>(move |tx| {
            async move {
                let previous = match query::engagement::current_for_update(tx, user_id).await? {
                    Some(open) => Some(query::engagement::close(tx, open.id, now).await?),
                    None => None,
                };

                let current = query::engagement::insert(
                    tx,
                    &NewEngagement {
                        user_id,
                        engagement_type: change.engagement_type,
                        department_id: change.department_id,
                        title: change.title.as_deref(),
                        effective_from: now,
                        change_reason: change.change_reason.as_deref(),
                        created_by: Some(actor_id),
                    },
                )
                .await
                .map_err(|e| crate::error::conflict_on_unique(e, "engagement", "already current"))?;

                let previous = match previous {
                    Some(mut closed) => {
                        query::engagement::link_successor(tx, closed.id, current.id).await?;
                        closed.replaced_by = Some(current.id);
                        Some(closed)
                    }
                    None => None,
                };
                Ok((previous, current))
            }
            .scope_boxed()
        })
        .await?;

    let badges_granted = badge::check_and_grant_best_effort(conn, user_id, now).await;

    audit::record(
        conn,
        AuditEvent::new(actor_id, AuditAction::EngagementUpdate)
            .target("engagement", current.id)
            .detail(serde_json::json!({
                "userId": user_id,
                "previousId": previous.as_ref().map(|p| p.id),
                "engagementType": audit_change.engagement_type,
                "departmentId": audit_change.department_id,
                "changeReason": audit_change.change_reason,
            })),
    )
    .await;

    Ok(EngagementUpdate {
        previous,
        current,
        badges_granted,
    })
}
