//! Page cookie access.

/// Source of the page's `name=value; ...` cookie string.
pub trait CookieSource: Send + Sync {
    fn cookie_string(&self) -> String;

    fn cookie(&self, name: &str) -> Option<String> {
        parse_cookie(&self.cookie_string(), name)
    }
}

/// Extracts the value of `name` from a cookie string. Empty values are absent.
pub fn parse_cookie(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

impl CookieSource for String {
    fn cookie_string(&self) -> String {
        self.clone()
    }
}
