//! Reward redemption and staff verification of signed codes.
//!
//! Issuing a code debits points, reserves stock and stores the order in one
//! transaction. Verification trusts nothing in the code beyond what the
//! signature covers: the order row must still be `pending` and carry the
//! same signature, and the flip to `used` is a single compare-and-set.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use diesel_async::AsyncConnection;
use diesel_async::scoped_futures::ScopedFutureExt;
use serde::Serialize;
use seva_core::config::RedemptionConfig;
use seva_core::rank::RankSnapshot;
use seva_core::redemption::{ParsedCode, RedemptionSigner};
use seva_db::db::connection::DbConnection;
use seva_db::db::enums::{PointReason, RedeemStatus};
use seva_db::db::query;
use seva_db::model::ledger::NewPointLedgerEntry;
use seva_db::model::reward::{NewRedeemOrder, RedeemOrder};

use crate::audit::{self, AuditAction, AuditEvent};
use crate::error::{ServiceError, ServiceResult};
use crate::{ledger, rank, reward};

const ORDER: &str = "redemption order";

/// Signing key plus code lifetime, built once at startup.
#[derive(Debug, Clone)]
pub struct RedemptionPolicy {
    signer: RedemptionSigner,
    code_ttl: Option<Duration>,
}

impl RedemptionPolicy {
    #[must_use]
    pub const fn new(signer: RedemptionSigner, code_ttl: Option<Duration>) -> Self {
        Self { signer, code_ttl }
    }

    /// ## Errors
    /// Returns `InvalidConfiguration` for an empty secret.
    pub fn from_config(config: &RedemptionConfig) -> ServiceResult<Self> {
        let signer = RedemptionSigner::new(&config.hmac_secret)
            .map_err(|e| ServiceError::InvalidConfiguration(e.to_string()))?;
        let code_ttl = config.code_ttl_hours.map(|h| Duration::hours(i64::from(h)));
        Ok(Self::new(signer, code_ttl))
    }

    #[must_use]
    pub const fn signer(&self) -> &RedemptionSigner {
        &self.signer
    }

    /// Expiry for a code issued at `now`, truncated to whole seconds so the
    /// stored value matches the one inside the code.
    #[must_use]
    pub fn expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let ttl = self.code_ttl?;
        DateTime::from_timestamp((now + ttl).timestamp(), 0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RedeemOutcome {
    pub order: RedeemOrder,
    pub code: String,
    pub snapshot: RankSnapshot,
}

/// ## Summary
/// Redeems a reward for a user and issues the signed code.
///
/// The reward row is locked, the user's snapshot is resynced under its own
/// row lock, and eligibility is checked against those fresh values. The
/// order, the negative `redeem` ledger row and the stock decrement then
/// commit together. Free rewards write no ledger row.
///
/// ## Errors
/// - `NotFound` for an unknown reward
/// - `Conflict` when the reward is inactive or out of stock
/// - `Validation` naming the first unmet requirement otherwise
#[tracing::instrument(skip(conn, policy))]
pub async fn redeem(
    conn: &mut DbConnection<'_>,
    policy: &RedemptionPolicy,
    user_id: i64,
    reward_id: i64,
    now: DateTime<Utc>,
) -> ServiceResult<RedeemOutcome> {
    let expires_at = policy.expiry(now);
    let signer = policy.signer().clone();

    let outcome = conn
        .transaction::<_, ServiceError, _>(move |tx| {
            async move {
                let reward = query::reward::find_for_update(tx, reward_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found(format!("reward {reward_id}")))?;

                let current = rank::resync(tx, user_id, now).await?;
                let held: HashSet<String> = query::badge::held_badge_codes(tx, user_id)
                    .await?
                    .into_iter()
                    .collect();
                let eligibility = reward::eligibility(&reward, &current.snapshot, &held);
                if let Some(reason) = eligibility.reason {
                    tracing::debug!(?reason, missing = ?eligibility.missing_badges, "Redemption refused");
                    return Err(reason.into());
                }

                let order_id = query::reward::next_order_id(tx).await?;
                let issued = signer.issue(order_id, user_id, expires_at);
                let order = query::reward::insert_order(
                    tx,
                    &NewRedeemOrder {
                        id: order_id,
                        user_id,
                        reward_id,
                        points_cost: reward.points_cost,
                        code_payload: &issued.payload,
                        code_signature: &issued.signature,
                        expires_at,
                        status: RedeemStatus::Pending,
                    },
                )
                .await?;

                if reward.points_cost > 0 {
                    ledger::append_points(
                        tx,
                        &NewPointLedgerEntry {
                            user_id,
                            points_delta: -reward.points_cost,
                            reason: PointReason::Redeem,
                            ref_id: Some(order.id),
                            department_id: None,
                            note: Some(reward.title.as_str()),
                            created_by: Some(user_id),
                        },
                    )
                    .await?;
                }

                if reward.stock.is_some()
                    && query::reward::decrement_stock(tx, reward_id, now).await? == 0
                {
                    return Err(ServiceError::conflict("reward", "out of stock"));
                }

                let settled = rank::resync(tx, user_id, now).await?;
                Ok(RedeemOutcome {
                    order,
                    code: issued.full_code,
                    snapshot: settled.snapshot,
                })
            }
            .scope_boxed()
        })
        .await?;

    tracing::info!(order_id = outcome.order.id, user_id, reward_id, "Reward redeemed");
    audit::record(
        conn,
        AuditEvent::new(user_id, AuditAction::RedemptionCreate)
            .target("redeem_order", outcome.order.id)
            .detail(serde_json::json!({
                "rewardId": reward_id,
                "pointsCost": outcome.order.points_cost,
            })),
    )
    .await;

    Ok(outcome)
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyOutcome {
    pub order: RedeemOrder,
    pub newly_used: bool,
}

/// ## Summary
/// Checks a presented code and marks its order used.
///
/// ## Errors
/// - `InvalidCode` for a malformed or forged code, or one whose user does
///   not own the order
/// - `Expired` for an authentic code past its expiry
/// - `NotFound` when the order no longer exists
/// - `Conflict` naming the order status when it is not `pending`
#[tracing::instrument(skip(conn, policy, code))]
pub async fn verify(
    conn: &mut DbConnection<'_>,
    policy: &RedemptionPolicy,
    code: &str,
    verifier_id: i64,
    now: DateTime<Utc>,
) -> ServiceResult<VerifyOutcome> {
    let claims = match policy.signer().parse(code, now) {
        ParsedCode::Invalid => return Err(ServiceError::InvalidCode),
        ParsedCode::Valid(claims) if claims.expired => return Err(ServiceError::Expired),
        ParsedCode::Valid(claims) => claims,
    };
    // parse() accepted the code, so its last field is the signature.
    let signature = code
        .trim()
        .rsplit('|')
        .next()
        .ok_or(ServiceError::InvalidCode)?
        .to_owned();

    let order = conn
        .transaction::<_, ServiceError, _>(move |tx| {
            async move {
                let order = query::reward::find_order(tx, claims.order_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found(format!("{ORDER} {}", claims.order_id)))?;
                if order.user_id != claims.user_id {
                    return Err(ServiceError::InvalidCode);
                }

                match query::reward::mark_used(tx, order.id, &signature, verifier_id, now).await? {
                    Some(used) => Ok(used),
                    None if order.status != RedeemStatus::Pending => {
                        Err(ServiceError::conflict(ORDER, order.status))
                    }
                    None => {
                        // Still pending but not updated: either a concurrent
                        // verifier won, or the stored signature differs.
                        let latest = query::reward::find_order(tx, order.id).await?;
                        match latest {
                            Some(o) if o.status != RedeemStatus::Pending => {
                                Err(ServiceError::conflict(ORDER, o.status))
                            }
                            _ => Err(ServiceError::InvalidCode),
                        }
                    }
                }
            }
            .scope_boxed()
        })
        .await?;

    tracing::info!(order_id = order.id, verifier_id, "Redemption code verified");
    audit::record(
        conn,
        AuditEvent::new(verifier_id, AuditAction::RedemptionVerify).target("redeem_order", order.id),
    )
    .await;

    Ok(VerifyOutcome {
        order,
        newly_used: true,
    })
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_orders(conn: &mut DbConnection<'_>, user_id: i64) -> ServiceResult<Vec<RedeemOrder>> {
    Ok(query::reward::list_orders_for_user(conn, user_id).await?)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn config(ttl: Option<u32>) -> RedemptionConfig {
        RedemptionConfig {
            hmac_secret: "test-secret".to_string(),
            code_ttl_hours: ttl,
        }
    }

    #[test_log::test]
    fn expiry_follows_configured_ttl() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()
            + Duration::milliseconds(750);
        let policy = RedemptionPolicy::from_config(&config(Some(24))).unwrap();
        let expiry = policy.expiry(now).unwrap();
        assert_eq!(expiry, Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap());

        let forever = RedemptionPolicy::from_config(&config(None)).unwrap();
        assert_eq!(forever.expiry(now), None);
    }

    #[test_log::test]
    fn empty_secret_is_a_configuration_error() {
        let bad = RedemptionConfig {
            hmac_secret: String::new(),
            code_ttl_hours: None,
        };
        assert!(matches!(
            RedemptionPolicy::from_config(&bad),
            Err(ServiceError::InvalidConfiguration(_))
        ));
    }

    #[test_log::test]
    fn stored_expiry_matches_code() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap() + Duration::milliseconds(1);
        let policy = RedemptionPolicy::from_config(&config(Some(1))).unwrap();
        let expiry = policy.expiry(now);
        let issued = policy.signer().issue(7, 3, expiry);
        assert_eq!(expiry.map(|e| e.timestamp()), Some(issued.expires_at));
    }
}
