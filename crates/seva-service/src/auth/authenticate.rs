use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use salvo::http::header::AUTHORIZATION;

use crate::error::{ServiceError, ServiceResult};
use crate::user::{self, NewAccount};
use seva_core::config::{AuthMethod, Settings};
use seva_db::db::connection::DbConnection;
use seva_db::db::enums::{UserRole, UserStatus};
use seva_db::db::query;
use seva_db::model::user::User;

use super::password::verify_password_blocking;

const DEFAULT_PROXY_HEADER: &str = "X-Remote-Email";

/// Get the user configured in settings for single user authentication.
///
/// If it doesn't exist, insert it into the database as a super admin.
///
/// ## Errors
///
/// Returns an error if the user cannot be created or retrieved from the database.
#[tracing::instrument(skip(conn, config))]
async fn authenticate_single_user(
    conn: &mut DbConnection<'_>,
    config: &Settings,
) -> ServiceResult<User> {
    tracing::debug!("Authenticating single user");

    let single_user_config =
        config
            .auth
            .single_user
            .as_ref()
            .ok_or(ServiceError::InvalidConfiguration(
                "Single user config is missing".to_string(),
            ))?;

    if let Some(user) = query::user::find_by_email(conn, &single_user_config.email).await? {
        tracing::debug!(user_email = %user.email, "Single user already exists");
        return Ok(user);
    }

    tracing::debug!(email = %single_user_config.email, "Creating single user");
    let user = user::provision(
        conn,
        NewAccount {
            name: single_user_config.name.clone(),
            email: single_user_config.email.clone(),
            phone: None,
            password_hash: None,
            role: UserRole::SuperAdmin,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, user_email = %user.email, "Single user created");
    Ok(user)
}

/// ## Summary
/// Decodes an `Authorization: Basic` header value into `(identifier, password)`.
#[must_use]
pub fn parse_basic_credentials(header: &str) -> Option<(String, String)> {
    let encoded = header
        .strip_prefix("Basic ")
        .or_else(|| header.strip_prefix("basic "))?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (identifier, password) = decoded.split_once(':')?;
    if identifier.is_empty() {
        return None;
    }
    Some((identifier.to_string(), password.to_string()))
}

/// ## Summary
/// Resolves an email or volunteer code and checks the password.
///
/// ## Errors
/// Returns `NotAuthenticated` for unknown identifiers, users without a
/// password, non-active users and wrong passwords alike.
#[tracing::instrument(skip(conn, password))]
pub async fn check_credentials(
    conn: &mut DbConnection<'_>,
    identifier: &str,
    password: &str,
) -> ServiceResult<User> {
    let identifier = identifier.trim();
    // Emails are stored lowercased; volunteer codes are matched as typed.
    let identifier = if identifier.contains('@') {
        identifier.to_lowercase()
    } else {
        identifier.to_string()
    };
    let user = query::user::find_by_login_identifier(conn, &identifier)
        .await?
        .ok_or(ServiceError::NotAuthenticated)?;

    if user.status != UserStatus::Active {
        tracing::debug!(user_id = user.id, status = %user.status, "Inactive user attempted login");
        return Err(ServiceError::NotAuthenticated);
    }

    let hash = user
        .password_hash
        .clone()
        .ok_or(ServiceError::NotAuthenticated)?;
    verify_password_blocking(password.to_string(), hash).await?;

    Ok(user)
}

#[tracing::instrument(skip(req, conn))]
async fn authenticate_basic(
    req: &salvo::Request,
    conn: &mut DbConnection<'_>,
) -> ServiceResult<User> {
    let (identifier, password) = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_basic_credentials)
        .ok_or(ServiceError::NotAuthenticated)?;

    check_credentials(conn, &identifier, &password).await
}

#[tracing::instrument(skip(req, conn, config))]
async fn authenticate_proxy(
    req: &salvo::Request,
    conn: &mut DbConnection<'_>,
    config: &Settings,
) -> ServiceResult<User> {
    let header = config
        .auth
        .proxy
        .as_ref()
        .map_or(DEFAULT_PROXY_HEADER, |proxy| proxy.header.as_str());

    let email = req
        .headers()
        .get(header)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ServiceError::NotAuthenticated)?;

    let user = query::user::find_by_email(conn, email)
        .await?
        .ok_or(ServiceError::NotAuthenticated)?;

    if user.status != UserStatus::Active {
        return Err(ServiceError::NotAuthenticated);
    }
    Ok(user)
}

/// ## Summary
/// Authenticate a user based on the configured authentication method.
///
/// ## Errors
/// Returns `NotAuthenticated` when the request carries no usable identity.
#[tracing::instrument(skip(req, conn, config))]
pub async fn authenticate(
    req: &salvo::Request,
    conn: &mut DbConnection<'_>,
    config: &Settings,
) -> ServiceResult<User> {
    tracing::trace!(auth_method = ?config.auth.method, "Authenticating request");

    match config.auth.method {
        AuthMethod::SingleUser => authenticate_single_user(conn, config).await,
        AuthMethod::BasicAuth => authenticate_basic(req, conn).await,
        AuthMethod::Proxy => authenticate_proxy(req, conn, config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn parses_basic_header() {
        // "alice@example.org:s3cret:with:colons"
        let header = format!("Basic {}", STANDARD.encode("alice@example.org:s3cret:with:colons"));
        assert_eq!(
            parse_basic_credentials(&header),
            Some(("alice@example.org".to_string(), "s3cret:with:colons".to_string()))
        );
    }

    #[test_log::test]
    fn volunteer_code_works_as_identifier() {
        let header = format!("Basic {}", STANDARD.encode("V000042:pw"));
        assert_eq!(
            parse_basic_credentials(&header).map(|(id, _)| id),
            Some("V000042".to_string())
        );
    }

    #[test_log::test]
    fn rejects_malformed_headers() {
        assert_eq!(parse_basic_credentials("Bearer abc"), None);
        assert_eq!(parse_basic_credentials("Basic !!!"), None);
        assert_eq!(
            parse_basic_credentials(&format!("Basic {}", STANDARD.encode("no-colon"))),
            None
        );
        assert_eq!(
            parse_basic_credentials(&format!("Basic {}", STANDARD.encode(":pw"))),
            None
        );
    }
}
