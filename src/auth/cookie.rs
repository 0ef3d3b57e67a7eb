use anyhow::Context;
use axum::http::{header::COOKIE, HeaderMap, HeaderValue};
use time::{macros::format_description, Duration, OffsetDateTime, UtcOffset};

pub const SESSION_COOKIE: &str = "jwt";

/// IMF-fixdate, the only date format browsers are required to accept.
fn http_date(at: OffsetDateTime) -> anyhow::Result<String> {
    let fmt = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    at.to_offset(UtcOffset::UTC)
        .format(fmt)
        .context("format cookie expiry")
}

/// `Set-Cookie` value carrying a session token.
pub fn session_cookie(
    token: &str,
    expires_at: OffsetDateTime,
    max_age: Duration,
    secure: bool,
) -> anyhow::Result<HeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; Expires={}; Max-Age={}; HttpOnly; SameSite=Lax",
        http_date(expires_at)?,
        max_age.whole_seconds()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).context("session cookie is not a valid header value")
}

/// `Set-Cookie` value that empties the session cookie and expires it at once.
pub fn cleared_cookie(secure: bool) -> anyhow::Result<HeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE}=; Path=/; Expires={}; Max-Age=0; HttpOnly; SameSite=Lax",
        http_date(OffsetDateTime::UNIX_EPOCH)?
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).context("cleared cookie is not a valid header value")
}

/// Session token from the request's `Cookie` headers. An empty value counts as
/// no token. A value may arrive wrapped in double quotes (RFC 6265 section 4.1.1).
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| name.trim() == SESSION_COOKIE)
        .map(|(_, value)| unquote(value.trim()))
        .filter(|value| !value.is_empty())
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
