//! Credential capture.

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::RwLock;
use tracing::debug;

/// Authorization plus anti-forgery token.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub authorization: String,
    pub csrf_token: String,
}

impl CredentialPair {
    pub fn new(authorization: impl Into<String>, csrf_token: impl Into<String>) -> Self {
        Self {
            authorization: authorization.into(),
            csrf_token: csrf_token.into(),
        }
    }

    pub fn with_csrf(&self, csrf_token: impl Into<String>) -> Self {
        Self {
            authorization: self.authorization.clone(),
            csrf_token: csrf_token.into(),
        }
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("authorization", &"<redacted>")
            .field("csrf_token", &"<redacted>")
            .finish()
    }
}

/// The most recently observed credential pair.
///
/// Written by the interception hooks, read by the executor at call time.
pub struct CredentialStore {
    api_prefix: String,
    captured: RwLock<Option<CredentialPair>>,
}

impl CredentialStore {
    pub fn new(api_prefix: impl Into<String>) -> Self {
        Self {
            api_prefix: api_prefix.into(),
            captured: RwLock::new(None),
        }
    }

    /// Inspects an outgoing page request. Header names must be lowercase.
    ///
    /// Captures when the URL targets the private API and both
    /// `authorization` and `x-csrf-token` are present.
    pub fn observe(&self, url: &str, headers: &BTreeMap<String, String>) -> bool {
        if !url.contains(&self.api_prefix) {
            return false;
        }
        let (Some(authorization), Some(csrf)) =
            (headers.get("authorization"), headers.get("x-csrf-token"))
        else {
            return false;
        };
        *self.captured.write() = Some(CredentialPair::new(authorization, csrf));
        debug!("Captured credential pair from page traffic");
        true
    }

    pub fn captured(&self) -> Option<CredentialPair> {
        self.captured.read().clone()
    }

    pub fn replace(&self, pair: CredentialPair) {
        *self.captured.write() = Some(pair);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_captures_private_api_traffic() {
        let store = CredentialStore::new("/i/api/");
        let captured = store.observe(
            "https://x.com/i/api/graphql/abc/HomeTimeline",
            &headers(&[("authorization", "Bearer t"), ("x-csrf-token", "c1")]),
        );
        assert!(captured);
        assert_eq!(store.captured(), Some(CredentialPair::new("Bearer t", "c1")));
    }

    #[test]
    fn test_ignores_other_urls_and_partial_headers() {
        let store = CredentialStore::new("/i/api/");
        assert!(!store.observe(
            "https://x.com/home",
            &headers(&[("authorization", "Bearer t"), ("x-csrf-token", "c1")]),
        ));
        assert!(!store.observe(
            "https://x.com/i/api/1.1/foo.json",
            &headers(&[("authorization", "Bearer t")]),
        ));
        assert_eq!(store.captured(), None);
    }

    #[test]
    fn test_newest_pair_wins() {
        let store = CredentialStore::new("/i/api/");
        let url = "https://x.com/i/api/x";
        store.observe(url, &headers(&[("authorization", "a"), ("x-csrf-token", "1")]));
        store.observe(url, &headers(&[("authorization", "b"), ("x-csrf-token", "2")]));
        assert_eq!(store.captured(), Some(CredentialPair::new("b", "2")));
    }

    #[test]
    fn test_debug_redacts() {
        let pair = CredentialPair::new("Bearer secret", "csrf-secret");
        let debug = format!("{:?}", pair);
        assert!(!debug.contains("secret"));
    }
}
