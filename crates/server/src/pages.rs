//! HTML pages rendered by the callback handler (Askama).

use crate::provider::TokenResponse;
use askama::Template;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Page shown after a successful code exchange.
///
/// The refresh token is never part of this page, only the fact that one
/// was issued.
#[derive(Template)]
#[template(path = "callback_success.html")]
pub struct SuccessPage<'a> {
    /// `None` unless `debug.expose_access_token` is set.
    pub access_token: Option<&'a str>,
    pub expires_in: u64,
    pub expires_at: Option<String>,
    pub open_id: &'a str,
    pub scope: &'a str,
    pub scopes: Vec<&'a str>,
    pub refresh_token_received: bool,
    pub refresh_expires_in: Option<u64>,
}

impl<'a> SuccessPage<'a> {
    pub fn new(token: &'a TokenResponse, expose_access_token: bool) -> Self {
        Self {
            access_token: expose_access_token.then_some(token.access_token.as_str()),
            expires_in: token.expires_in,
            expires_at: expiry_instant(OffsetDateTime::now_utc(), token.expires_in),
            open_id: &token.open_id,
            scope: &token.scope,
            scopes: split_scopes(&token.scope),
            refresh_token_received: token
                .refresh_token
                .as_deref()
                .is_some_and(|t| !t.is_empty()),
            refresh_expires_in: token.refresh_expires_in,
        }
    }
}

/// Page shown when the exchange fails. `diagnostic` is the provider payload
/// or transport error, HTML-escaped. Token values are already redacted.
#[derive(Template)]
#[template(path = "callback_error.html")]
pub struct ErrorPage<'a> {
    pub diagnostic: &'a str,
}

/// Providers disagree on the delimiter: TikTok uses commas, RFC 6749 spaces.
pub fn split_scopes(scope: &str) -> Vec<&str> {
    scope
        .split([',', ' '])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn expiry_instant(now: OffsetDateTime, expires_in: u64) -> Option<String> {
    if expires_in == 0 {
        return None;
    }
    let secs = i64::try_from(expires_in).ok()?;
    now.checked_add(time::Duration::seconds(secs))?
        .format(&Rfc3339)
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn token() -> TokenResponse {
        TokenResponse {
            access_token: "act.example-access".into(),
            refresh_token: Some("rft.example-refresh".into()),
            expires_in: 86400,
            refresh_expires_in: Some(31536000),
            open_id: "open-id-1".into(),
            scope: "user.info.basic,video.list".into(),
            token_type: Some("Bearer".into()),
        }
    }

    #[test]
    fn scopes_split_on_commas_and_spaces() {
        assert_eq!(
            split_scopes("user.info.basic,video.list"),
            vec!["user.info.basic", "video.list"]
        );
        assert_eq!(split_scopes("openid  profile"), vec!["openid", "profile"]);
        assert!(split_scopes("").is_empty());
    }

    #[test]
    fn expiry_is_relative_to_now() {
        let now = datetime!(2026-01-01 00:00:00 UTC);
        assert_eq!(
            expiry_instant(now, 3600).as_deref(),
            Some("2026-01-01T01:00:00Z")
        );
        assert_eq!(expiry_instant(now, 0), None);
        assert_eq!(expiry_instant(now, u64::MAX), None);
    }

    #[test]
    fn success_page_hides_token_by_default() {
        let token = token();
        let html = SuccessPage::new(&token, false).render().unwrap();
        assert!(!html.contains("act.example-access"));
        assert!(!html.contains("rft.example-refresh"));
        assert!(html.contains("open-id-1"));
        assert!(html.contains("86400"));
        assert!(html.contains("31536000"));
    }

    #[test]
    fn success_page_shows_token_when_exposed() {
        let token = token();
        let html = SuccessPage::new(&token, true).render().unwrap();
        assert!(html.contains("act.example-access"));
        assert!(!html.contains("rft.example-refresh"));
        assert!(html.contains("debug.expose_access_token"));
    }

    #[test]
    fn error_page_escapes_markup() {
        let html = ErrorPage {
            diagnostic: "<script>alert(1)</script> invalid_grant",
        }
        .render()
        .unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("invalid_grant"));
    }
}
