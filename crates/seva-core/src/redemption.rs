//! Tamper-evident redemption codes.
//!
//! A code is `order_id|user_id|expiry|signature`, where `expiry` is a unix
//! timestamp in seconds (`0` never expires) and `signature` is the lowercase
//! hex HMAC-SHA256 of the first three fields.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use crate::error::{CoreError, CoreResult};

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: char = '|';
const SIGNATURE_HEX_LEN: usize = 64;

/// Output of [`RedemptionSigner::issue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedCode {
    pub payload: String,
    pub signature: String,
    pub full_code: String,
    /// Unix seconds, `0` for no expiry.
    pub expires_at: i64,
}

/// Fields recovered from an authentic code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeClaims {
    pub order_id: i64,
    pub user_id: i64,
    pub expires_at: i64,
    pub expired: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedCode {
    /// Malformed, or the signature does not match.
    Invalid,
    /// Authentic. Callers must still check `expired`.
    Valid(CodeClaims),
}

impl ParsedCode {
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Signs and verifies codes with a server-held secret.
#[derive(Clone)]
pub struct RedemptionSigner {
    mac: HmacSha256,
}

impl std::fmt::Debug for RedemptionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedemptionSigner").finish_non_exhaustive()
    }
}

impl RedemptionSigner {
    /// ## Errors
    /// Returns `CoreError::ConfigError` when the secret is empty.
    pub fn new(secret: &str) -> CoreResult<Self> {
        if secret.is_empty() {
            return Err(CoreError::ConfigError(
                "redemption secret must not be empty".to_string(),
            ));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| CoreError::ConfigError(format!("invalid redemption secret: {e}")))?;
        Ok(Self { mac })
    }

    fn payload(order_id: i64, user_id: i64, expires_at: i64) -> String {
        format!("{order_id}{SEPARATOR}{user_id}{SEPARATOR}{expires_at}")
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// ## Summary
    /// Builds a signed code for an order. `None` never expires.
    #[must_use]
    pub fn issue(
        &self,
        order_id: i64,
        user_id: i64,
        expires_at: Option<DateTime<Utc>>,
    ) -> IssuedCode {
        let expires_at = expires_at.map_or(0, |at| at.timestamp());
        let payload = Self::payload(order_id, user_id, expires_at);
        let signature = self.sign(&payload);
        let full_code = format!("{payload}{SEPARATOR}{signature}");
        IssuedCode {
            payload,
            signature,
            full_code,
            expires_at,
        }
    }

    /// ## Summary
    /// Splits a code, recomputes its signature and compares in constant time.
    ///
    /// Any malformed input is `Invalid`. An authentic code whose non-zero
    /// expiry is before `now` is `Valid` with `expired` set.
    #[must_use]
    pub fn parse(&self, code: &str, now: DateTime<Utc>) -> ParsedCode {
        self.claims(code.trim(), now)
            .map_or(ParsedCode::Invalid, ParsedCode::Valid)
    }

    fn claims(&self, code: &str, now: DateTime<Utc>) -> Option<CodeClaims> {
        let mut fields = code.split(SEPARATOR);
        let (order, user, expiry, signature) =
            (fields.next()?, fields.next()?, fields.next()?, fields.next()?);
        if fields.next().is_some() {
            return None;
        }

        let order_id = parse_decimal(order)?;
        let user_id = parse_decimal(user)?;
        let expires_at = parse_decimal(expiry)?;

        // Lowercase only, so case flips count as tampering.
        if signature.len() != SIGNATURE_HEX_LEN
            || !signature.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return None;
        }
        let expected = hex::decode(signature).ok()?;

        let mut mac = self.mac.clone();
        mac.update(Self::payload(order_id, user_id, expires_at).as_bytes());
        mac.verify_slice(&expected).ok()?;

        Some(CodeClaims {
            order_id,
            user_id,
            expires_at,
            expired: expires_at > 0 && now.timestamp() > expires_at,
        })
    }
}

/// Plain non-negative decimal; rejects signs, whitespace and empty input.
fn parse_decimal(field: &str) -> Option<i64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}
