use std::fmt;

use reqwest::header::{HeaderMap, SET_COOKIE};

/// Cookies handed out by the login endpoint.
///
/// A session is only good for one cookie-to-JWT exchange: it is neither
/// `Clone` nor `Copy`, and the exchange takes it by value.
pub struct Session {
    cookies: Vec<(String, String)>,
}

impl Session {
    /// Collect every `Set-Cookie` header of a login response.
    /// Attributes (`Path`, `HttpOnly`, ...) are dropped; a repeated cookie
    /// name keeps its last value.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies: Vec<(String, String)> = Vec::new();

        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            let Some((name, value)) = parse_set_cookie(raw) else {
                continue;
            };
            match cookies.iter_mut().find(|(n, _)| *n == name) {
                Some(existing) => existing.1 = value,
                None => cookies.push((name, value)),
            }
        }

        Self { cookies }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Value for a `Cookie` request header
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.cookies.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("Session").field("cookies", &names).finish()
    }
}

fn parse_set_cookie(raw: &str) -> Option<(String, String)> {
    let pair = raw.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(values: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for v in values {
            map.append(SET_COOKIE, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn test_collects_cookies_without_attributes() {
        let session = Session::from_headers(&headers(&[
            "ed_session=abc123; Path=/; HttpOnly; Secure",
            "csrf=xyz; Path=/",
        ]));
        assert_eq!(session.len(), 2);
        assert_eq!(session.cookie_header(), "ed_session=abc123; csrf=xyz");
    }

    #[test]
    fn test_repeated_cookie_keeps_last_value() {
        let session = Session::from_headers(&headers(&["a=1", "a=2; Path=/"]));
        assert_eq!(session.cookie_header(), "a=2");
    }

    #[test]
    fn test_ignores_malformed_cookies() {
        let session = Session::from_headers(&headers(&["novalue", "=orphan", ""]));
        assert!(session.is_empty());
    }

    #[test]
    fn test_debug_hides_cookie_values() {
        let session = Session::from_headers(&headers(&["ed_session=supersecret"]));
        let printed = format!("{:?}", session);
        assert!(printed.contains("ed_session"));
        assert!(!printed.contains("supersecret"));
    }
}
