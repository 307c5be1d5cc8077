//! Cookie header parsing and `Set-Cookie` formatting.

use chrono::{DateTime, Utc};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

/// Find the value of cookie `name` in a `Cookie` request header.
pub fn find<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k.trim() == name).then(|| v.trim().trim_matches('"'))
    })
}

/// IMF-fixdate, as required for the `Expires` attribute.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Build a `Set-Cookie` value scoped to the whole site.
pub fn set_cookie(name: &str, value: &str, expires: DateTime<Utc>) -> String {
    format!("{name}={value}; Path=/; Expires={}", http_date(expires))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use chrono::TimeZone;

    #[test]
    fn finds_cookie_among_others() {
        let h = "theme=dark; session=ABCDEFGHIJKLMNOPQRST; lang=en";
        assert_eq!(find(h, "session"), Some("ABCDEFGHIJKLMNOPQRST"));
        assert_eq!(find(h, "lang"), Some("en"));
        assert_eq!(find(h, "missing"), None);
    }

    #[test]
    fn ignores_malformed_pairs() {
        assert_eq!(find("garbage; session=X", "session"), Some("X"));
        assert_eq!(find("", "session"), None);
    }

    #[test]
    fn set_cookie_has_path_and_expiry() {
        let at = Utc
            .with_ymd_and_hms(1994, 11, 6, 8, 49, 37)
            .single()
            .expect("valid date");
        assert_eq!(
            set_cookie("session", "TOKEN", at),
            "session=TOKEN; Path=/; Expires=Sun, 06 Nov 1994 08:49:37 GMT"
        );
    }
}
