//! Signed session cookies and password checks.
//!
//! Cookie format: `{userId}-{expiresEpochSeconds}-{signature}` where the
//! signature is `sha1(userId "-" storedPasswordHash "-" expires "-" secret)`.
//! Every failure mode (malformed cookie, expiry in the past, unknown user,
//! signature mismatch) degrades to "no authenticated user", never an error.

use crate::error::ApiError;
use crate::models::USER;
use crate::orm::{Db, Record, SqlArg};
use serde_json::json;
use sha1::{Digest, Sha1};

pub const PASSWD_MASK: &str = "******";

pub fn sha1_hex(input: &str) -> String {
    hex::encode(Sha1::digest(input.as_bytes()))
}

/// Stored password hash scheme: `sha1(uid ":" passwd)`.
pub fn hash_passwd(uid: &str, passwd: &str) -> String {
    sha1_hex(&format!("{}:{}", uid, passwd))
}

fn signature(uid: &str, passwd: &str, expires: i64, secret: &str) -> String {
    sha1_hex(&format!("{}-{}-{}-{}", uid, passwd, expires, secret))
}

/// Build the session cookie for a user; `None` when the record is missing
/// id or passwd.
pub fn user2cookie(user: &Record, max_age_secs: i64, secret: &str) -> Option<String> {
    let uid = user.str("id")?;
    let passwd = user.str("passwd")?;
    let expires = chrono::Utc::now().timestamp() + max_age_secs;
    let sig = signature(uid, passwd, expires, secret);
    Some(format!("{}-{}-{}", uid, expires, sig))
}

/// Split a cookie into (uid, expires, signature). The uid never contains `-`
/// so the first and last segments are unambiguous.
fn parse_cookie(cookie: &str) -> Option<(&str, i64, &str)> {
    let mut parts = cookie.splitn(3, '-');
    let uid = parts.next()?;
    let expires = parts.next()?.parse::<i64>().ok()?;
    let sig = parts.next()?;
    if uid.is_empty() || sig.is_empty() {
        return None;
    }
    Some((uid, expires, sig))
}

/// Verify a cookie against a loaded user record at time `now`.
pub fn verify_cookie(user: &Record, cookie: &str, secret: &str, now: i64) -> bool {
    let Some((uid, expires, sig)) = parse_cookie(cookie) else {
        return false;
    };
    if expires < now {
        return false;
    }
    let (Some(id), Some(passwd)) = (user.str("id"), user.str("passwd")) else {
        return false;
    };
    id == uid && signature(uid, passwd, expires, secret) == sig
}

/// Resolve the authenticated user from a session cookie. The returned
/// record's passwd is masked.
pub async fn cookie2user(db: &Db, cookie: &str, secret: &str) -> Option<Record> {
    let (uid, expires, _) = parse_cookie(cookie)?;
    let now = chrono::Utc::now().timestamp();
    if expires < now {
        return None;
    }
    let found = match USER.find(db, &SqlArg::text(uid)).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(error = %e, "cookie lookup failed");
            return None;
        }
    };
    let mut user = found?;
    if !verify_cookie(&user, cookie, secret, now) {
        tracing::debug!("invalid session signature");
        return None;
    }
    user.set("passwd", json!(PASSWD_MASK));
    Some(user)
}

/// Compare a stored hash with the submitted (pre-hashed) password.
pub fn check_passwd(user: &Record, submitted_passwd: &str) -> Result<(), ApiError> {
    let uid = user
        .str("id")
        .ok_or_else(|| ApiError::invalid_value("passwd", "Invalid password."))?;
    let stored = user.str("passwd").unwrap_or_default();
    if hash_passwd(uid, submitted_passwd) == stored {
        Ok(())
    } else {
        Err(ApiError::invalid_value("passwd", "Invalid password."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn user() -> Record {
        let mut u = Record::new();
        let uid = "0015000000000000aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa000";
        u.set("id", json!(uid));
        u.set("passwd", json!(hash_passwd(uid, "1234567890abcdef1234")));
        u
    }

    #[test]
    fn cookie_round_trip() {
        let u = user();
        let cookie = user2cookie(&u, 86400, SECRET).unwrap();
        let now = chrono::Utc::now().timestamp();
        assert!(verify_cookie(&u, &cookie, SECRET, now));
    }

    #[test]
    fn tampered_segments_fail() {
        let u = user();
        let cookie = user2cookie(&u, 86400, SECRET).unwrap();
        let now = chrono::Utc::now().timestamp();
        let (uid, expires, sig) = {
            let mut it = cookie.splitn(3, '-');
            (
                it.next().unwrap().to_string(),
                it.next().unwrap().to_string(),
                it.next().unwrap().to_string(),
            )
        };
        // Different user id.
        let other = format!("0015000000000000bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb000-{}-{}", expires, sig);
        assert!(!verify_cookie(&u, &other, SECRET, now));
        // Pushed-out expiry invalidates the signature.
        let later: i64 = expires.parse::<i64>().unwrap() + 1000;
        let stretched = format!("{}-{}-{}", uid, later, sig);
        assert!(!verify_cookie(&u, &stretched, SECRET, now));
        // Flipped signature byte.
        let mut bad_sig = sig.clone();
        let flipped = if bad_sig.ends_with('0') { '1' } else { '0' };
        bad_sig.pop();
        bad_sig.push(flipped);
        let forged = format!("{}-{}-{}", uid, expires, bad_sig);
        assert!(!verify_cookie(&u, &forged, SECRET, now));
        // Wrong secret.
        assert!(!verify_cookie(&u, &cookie, "other-secret", now));
    }

    #[test]
    fn expired_cookie_fails() {
        let u = user();
        let cookie = user2cookie(&u, -10, SECRET).unwrap();
        let now = chrono::Utc::now().timestamp();
        assert!(!verify_cookie(&u, &cookie, SECRET, now));
    }

    #[test]
    fn malformed_cookies_fail() {
        let u = user();
        let now = chrono::Utc::now().timestamp();
        assert!(!verify_cookie(&u, "", SECRET, now));
        assert!(!verify_cookie(&u, "only-two", SECRET, now));
        assert!(!verify_cookie(&u, "a-notanumber-sig", SECRET, now));
    }

    #[test]
    fn password_check() {
        let u = user();
        assert!(check_passwd(&u, "1234567890abcdef1234").is_ok());
        assert!(check_passwd(&u, "wrong").is_err());
    }
}
