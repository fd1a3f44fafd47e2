//! Accounts: registration, login and administration of users.

use chrono::Utc;
use diesel_async::AsyncConnection;
use diesel_async::scoped_futures::ScopedFutureExt;
use seva_core::rank::RankSnapshot;
use seva_core::types::Role;
use seva_db::db::connection::DbConnection;
use seva_db::db::enums::{UserRole, UserStatus};
use seva_db::db::query;
use seva_db::model::rank::RankSnapshotRow;
use seva_db::model::user::{NewUser, User, UserProfileChanges};

use crate::audit::{self, AuditAction, AuditEvent};
use crate::auth::authenticate::check_credentials;
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::error::{ServiceError, ServiceResult, conflict_on_unique};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_NAME_LEN: usize = 64;

/// Volunteer codes are `V` followed by the zero-padded user id.
#[must_use]
pub fn volunteer_code(user_id: i64) -> String {
    format!("V{user_id:06}")
}

/// Everything needed to create an account row.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub role: UserRole,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

impl Registration {
    /// ## Errors
    /// Returns `Validation` for a blank or overlong name, an email without
    /// `@`, or a short password.
    pub fn validate(&self) -> ServiceResult<()> {
        let name = self.name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(ServiceError::Validation(format!(
                "name must be 1 to {MAX_NAME_LEN} characters"
            )));
        }
        if !self.email.trim().contains('@') {
            return Err(ServiceError::Validation("email is not valid".to_string()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// ## Summary
/// Creates an active user with a volunteer code and a zeroed rank snapshot.
///
/// ## Side Effects
/// One transaction inserting into `app_user` and `user_rank_snapshot`.
///
/// ## Errors
/// Returns `Conflict` if the email is taken, or a database error.
#[tracing::instrument(skip(conn, account), fields(email = %account.email, role = %account.role))]
pub async fn provision(conn: &mut DbConnection<'_>, account: NewAccount) -> ServiceResult<User> {
    let now = Utc::now();

    conn.transaction::<_, ServiceError, _>(move |tx| {
        async move {
            let new_user = NewUser {
                name: &account.name,
                email: &account.email,
                phone: account.phone.as_deref(),
                password_hash: account.password_hash.as_deref(),
                role: account.role,
                status: UserStatus::Active,
            };
            let user = query::user::insert(tx, &new_user)
                .await
                .map_err(|e| conflict_on_unique(e, "email", "already registered"))?;

            let user = query::user::set_volunteer_code(tx, user.id, &volunteer_code(user.id)).await?;

            let snapshot = RankSnapshotRow::new(user.id, &RankSnapshot::default(), now);
            query::rank::insert_initial(tx, &snapshot).await?;

            Ok(user)
        }
        .scope_boxed()
    })
    .await
}

/// ## Summary
/// Self-service registration as a volunteer.
///
/// ## Errors
/// Returns `Validation` for bad input, `Conflict` for a duplicate email.
#[tracing::instrument(skip(conn, registration), fields(email = %registration.email))]
pub async fn register(conn: &mut DbConnection<'_>, registration: Registration) -> ServiceResult<User> {
    registration.validate()?;
    let email = normalize_email(&registration.email);

    if query::user::find_by_email(conn, &email).await?.is_some() {
        return Err(ServiceError::conflict("email", "already registered"));
    }

    let password_hash = hash_password_blocking(registration.password).await?;
    let user = provision(
        conn,
        NewAccount {
            name: registration.name.trim().to_string(),
            email,
            phone: registration.phone.filter(|p| !p.trim().is_empty()),
            password_hash: Some(password_hash),
            role: UserRole::Volunteer,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, "User registered");
    audit::record(
        conn,
        AuditEvent::new(user.id, AuditAction::UserRegister).target("app_user", user.id),
    )
    .await;

    Ok(user)
}

/// ## Summary
/// Password login by email or volunteer code.
///
/// ## Errors
/// Returns `NotAuthenticated` for any credential or status failure.
#[tracing::instrument(skip(conn, password))]
pub async fn login(
    conn: &mut DbConnection<'_>,
    identifier: &str,
    password: &str,
) -> ServiceResult<User> {
    let user = check_credentials(conn, identifier, password).await?;
    audit::record(conn, AuditEvent::new(user.id, AuditAction::UserLogin)).await;
    Ok(user)
}

/// ## Errors
/// Returns `NotAuthenticated` if the current password is wrong, `Validation`
/// if the new one is too short.
#[tracing::instrument(skip(conn, current, new_password))]
pub async fn change_password(
    conn: &mut DbConnection<'_>,
    user_id: i64,
    current: Option<String>,
    new_password: String,
) -> ServiceResult<()> {
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let user = get(conn, user_id).await?;
    if let Some(existing) = user.password_hash {
        let current = current.ok_or(ServiceError::NotAuthenticated)?;
        verify_password_blocking(current, existing).await?;
    }

    let hash = hash_password_blocking(new_password).await?;
    query::user::set_password_hash(conn, user_id, &hash, Utc::now()).await?;

    audit::record(
        conn,
        AuditEvent::new(user_id, AuditAction::PasswordChange).target("app_user", user_id),
    )
    .await;
    Ok(())
}

/// ## Errors
/// Returns `NotFound` if the user does not exist.
pub async fn get(conn: &mut DbConnection<'_>, user_id: i64) -> ServiceResult<User> {
    query::user::find(conn, user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("user {user_id}")))
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn list(conn: &mut DbConnection<'_>) -> ServiceResult<Vec<User>> {
    Ok(query::user::list(conn).await?)
}

/// ## Errors
/// Returns `NotFound` if the user does not exist, `Validation` for a blank name.
#[tracing::instrument(skip(conn))]
pub async fn update_profile(
    conn: &mut DbConnection<'_>,
    user_id: i64,
    name: Option<&str>,
    phone: Option<&str>,
) -> ServiceResult<User> {
    let name = name.map(str::trim);
    if name.is_some_and(|n| n.is_empty() || n.chars().count() > MAX_NAME_LEN) {
        return Err(ServiceError::Validation(format!(
            "name must be 1 to {MAX_NAME_LEN} characters"
        )));
    }
    if name.is_none() && phone.is_none() {
        return get(conn, user_id).await;
    }

    let changes = UserProfileChanges { name, phone };
    query::user::update_profile(conn, user_id, &changes, Utc::now())
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("user {user_id}")))
}

/// ## Summary
/// Changes another user's role.
///
/// An actor may not change their own role, may not touch a user ranked above
/// them, and may not grant a role above their own.
///
/// ## Errors
/// Returns `Forbidden` for the cases above and `NotFound` for unknown users.
#[tracing::instrument(skip(conn, actor), fields(actor_id = actor.id))]
pub async fn update_role(
    conn: &mut DbConnection<'_>,
    actor: &User,
    target_id: i64,
    role: Role,
) -> ServiceResult<User> {
    if actor.id == target_id {
        return Err(ServiceError::Forbidden("cannot change your own role".to_string()));
    }
    let actor_role: Role = actor.role.into();
    let target = get(conn, target_id).await?;
    let old_role: Role = target.role.into();
    if old_role > actor_role || role > actor_role {
        return Err(ServiceError::Forbidden(format!(
            "{actor_role} cannot change {old_role} to {role}"
        )));
    }

    let updated = query::user::set_role(conn, target_id, role.into(), Utc::now())
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("user {target_id}")))?;

    tracing::info!(target_id, old_role = %old_role, new_role = %role, "User role changed");
    audit::record(
        conn,
        AuditEvent::new(actor.id, AuditAction::UserRoleChange)
            .target("app_user", target_id)
            .detail(serde_json::json!({ "oldRole": old_role, "newRole": role })),
    )
    .await;

    Ok(updated)
}

/// ## Errors
/// Returns `Forbidden` when targeting oneself or a higher-ranked user,
/// `NotFound` for unknown users.
#[tracing::instrument(skip(conn, actor), fields(actor_id = actor.id))]
pub async fn update_status(
    conn: &mut DbConnection<'_>,
    actor: &User,
    target_id: i64,
    status: UserStatus,
) -> ServiceResult<User> {
    if actor.id == target_id {
        return Err(ServiceError::Forbidden("cannot change your own status".to_string()));
    }
    let target = get(conn, target_id).await?;
    if Role::from(target.role) > Role::from(actor.role) {
        return Err(ServiceError::Forbidden(
            "cannot change the status of a higher-ranked user".to_string(),
        ));
    }

    let updated = query::user::set_status(conn, target_id, status, Utc::now())
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("user {target_id}")))?;

    audit::record(
        conn,
        AuditEvent::new(actor.id, AuditAction::UserStatusChange)
            .target("app_user", target_id)
            .detail(serde_json::json!({ "oldStatus": target.status, "newStatus": status })),
    )
    .await;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            name: "Ananda".to_string(),
            email: "ananda@example.org".to_string(),
            password: "lotus-pond".to_string(),
            phone: None,
        }
    }

    #[test_log::test]
    fn volunteer_code_is_zero_padded() {
        assert_eq!(volunteer_code(42), "V000042");
        assert_eq!(volunteer_code(1_234_567), "V1234567");
    }

    #[test_log::test]
    fn registration_validation() {
        assert!(registration().validate().is_ok());

        let blank = Registration {
            name: "   ".to_string(),
            ..registration()
        };
        assert!(matches!(blank.validate(), Err(ServiceError::Validation(_))));

        let bad_email = Registration {
            email: "nobody".to_string(),
            ..registration()
        };
        assert!(matches!(bad_email.validate(), Err(ServiceError::Validation(_))));

        let short = Registration {
            password: "12345".to_string(),
            ..registration()
        };
        assert!(matches!(short.validate(), Err(ServiceError::Validation(_))));
    }

    #[test_log::test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ananda@Example.ORG "), "ananda@example.org");
    }
}
